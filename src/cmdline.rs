//! Command line parsing for the range analysis driver.
use argh::FromArgs;
use hls_utils::{Error, HlsResult, OutputFile};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

/// A known range of a value: `name=lo..hi`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assumption {
    pub value: String,
    pub lo: i128,
    pub hi: i128,
}

impl FromStr for Assumption {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || format!("expected `name=lo..hi`, found `{s}`");
        let (value, range) = s.split_once('=').ok_or_else(err)?;
        let (lo, hi) = range.split_once("..").ok_or_else(err)?;
        let lo = lo.trim().parse::<i128>().map_err(|e| e.to_string())?;
        let hi = hi.trim().parse::<i128>().map_err(|e| e.to_string())?;
        if value.is_empty() || lo > hi {
            return Err(err());
        }
        Ok(Assumption {
            value: value.to_string(),
            lo,
            hi,
        })
    }
}

#[derive(FromArgs, Debug)]
/// Integer range analysis of HLS functions.
pub struct Opts {
    /// input file with a function or a list of functions in JSON form.
    /// Reads from stdin when missing.
    #[argh(positional, from_str_fn(read_path))]
    pub file: Option<PathBuf>,

    /// output file, default is stdout
    #[argh(option, short = 'o', default = "OutputFile::Stdout")]
    pub output: OutputFile,

    /// print the ranges as JSON
    #[argh(switch)]
    pub json: bool,

    /// write the solved constraint graph in dot format
    #[argh(option)]
    pub dump_graph: Option<OutputFile>,

    /// extra options passed to the analysis, e.g. `range-analysis:no-narrowing`
    #[argh(option, short = 'x', long = "extra-opt")]
    pub extra_opts: Vec<String>,

    /// known range of a parameter: `name=lo..hi`
    #[argh(option, short = 'a', long = "assume")]
    pub assumptions: Vec<Assumption>,

    /// print the functions before their ranges
    #[argh(switch)]
    pub print_ir: bool,

    /// list the options of the analysis
    #[argh(switch)]
    pub list_opts: bool,

    /// logging level
    #[argh(option, default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,
}

fn read_path(path: &str) -> Result<PathBuf, String> {
    Ok(Path::new(path).into())
}

impl Opts {
    /// Read the command line options. Fails when the input file is
    /// missing.
    pub fn get_opts() -> HlsResult<Self> {
        let opts: Opts = argh::from_env();
        if let Some(file) = &opts.file
            && !file.exists()
        {
            return Err(Error::invalid_file(format!(
                "input file `{}` does not exist",
                file.display()
            )));
        }
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assumptions() {
        assert_eq!(
            "x=-3..200".parse::<Assumption>(),
            Ok(Assumption {
                value: "x".to_string(),
                lo: -3,
                hi: 200
            })
        );
        assert!("x=3".parse::<Assumption>().is_err());
        assert!("=1..2".parse::<Assumption>().is_err());
        assert!("x=5..1".parse::<Assumption>().is_err());
        assert!("x=a..1".parse::<Assumption>().is_err());
    }
}
