//! Shared utilities for the HLS analysis crates.
mod errors;
mod id;
mod math;
mod out_file;

pub use errors::{Error, HlsResult};
pub use id::{GetName, Id};
pub use math::{signed_bits_for, unsigned_bits_for};
pub use out_file::OutputFile;
