//! Errors generated by the compiler.

/// Convience wrapper to represent success or meaningul compiler error.
pub type HlsResult<T> = std::result::Result<T, Error>;

/// Errors generated by the compiler
pub struct Error {
    kind: Box<ErrorKind>,
    post_msg: Option<String>,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(post) = &self.post_msg {
            write!(f, "\n{post}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Attach an additional message that is printed after the main error.
    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::InvalidFile(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn write_error<S: ToString>(msg: S) -> Self {
        Self {
            kind: Box::new(ErrorKind::WriteError(msg.to_string())),
            post_msg: None,
        }
    }

    pub fn pass_assumption<S: ToString, M: ToString>(pass: S, msg: M) -> Self {
        Self {
            kind: Box::new(ErrorKind::PassAssumption(
                pass.to_string(),
                msg.to_string(),
            )),
            post_msg: None,
        }
    }
}

/// Standard error type for compiler errors.
#[derive(thiserror::Error, Debug)]
enum ErrorKind {
    /// The input file is invalid (does not exist or cannot be decoded).
    #[error("Invalid file: {0}")]
    InvalidFile(String),
    /// Failed to write the output
    #[error("Failed to write output: {0}")]
    WriteError(String),

    /// An internal invariant of a pass was violated.
    #[error("Pass `{0}` assumption violated: {1}")]
    PassAssumption(String, String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::write_error(format!("IO Error: {e}"))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(e: std::fmt::Error) -> Self {
        Error::write_error(format!("Formatting Error: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::invalid_file(format!("JSON Error: {e}"))
    }
}
