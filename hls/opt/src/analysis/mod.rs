//! Analyses of the HLS IR.
pub mod range_analysis;

pub use range_analysis::{Interval, NodeContainer, RangeAnalysisConfig};
