//! Helpers for configuring analyses from the command line.
mod construct;

pub use construct::{Named, ParseVal, PassOpt, describe, get_opts};
