//! # hls-range
//!
//! Command-line interface for the integer range analysis of HLS functions.
//! Reads functions in their JSON form, solves their range constraints and
//! prints the range of every integer value.
//! Depend on [`hls_opt`] and [`hls_ir`] to use the analysis from a compiler.
pub mod cmdline;
pub mod driver;
