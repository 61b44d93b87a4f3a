use hls_utils::Error;
use thiserror::Error;

/// Result of the fallible range analysis operations.
pub type RangeResult<T> = Result<T, RangeError>;

/// Problems found while building or solving the constraint graph.
#[derive(Error, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// A recognized statement does not have the structure it must have.
    #[error("malformed `{stmt}`: {reason}")]
    IrShapeViolation { stmt: String, reason: String },

    /// A transfer function produced a range wider than the value.
    #[error(
        "range of `{value}` has {width} bits but the value is declared with {declared}"
    )]
    RangeBitwidthOverflow {
        value: String,
        width: u32,
        declared: u32,
    },

    /// No recognizer handles the statement; its value is unconstrained.
    #[error("no range rule for `{stmt}`, assuming any value")]
    UnsupportedOperation { stmt: String },

    /// An initializer element does not fit the element type and is ignored.
    #[error(
        "initializer of `{object}` has a {width}-bit element in a {elem_width}-bit array, ignoring it"
    )]
    MalformedInitializer {
        object: String,
        width: u32,
        elem_width: u32,
    },
}

impl RangeError {
    /// Fatal errors abort the analysis. The others lose precision only.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RangeError::IrShapeViolation { .. }
                | RangeError::RangeBitwidthOverflow { .. }
        )
    }

    pub(super) fn shape<S: ToString, R: ToString>(stmt: S, reason: R) -> Self {
        RangeError::IrShapeViolation {
            stmt: stmt.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Debug for RangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self, f)
    }
}

impl From<RangeError> for Error {
    fn from(e: RangeError) -> Self {
        Error::pass_assumption("range-analysis", e)
    }
}
