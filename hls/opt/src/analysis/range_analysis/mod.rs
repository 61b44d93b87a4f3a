//! Sparse interval analysis of the integer values of a function.
//!
//! The function is turned into a bipartite constraint graph: a [VarNode]
//! per SSA value, memory object and literal, and an [OpNode] per
//! recognized statement. The [NodeContainer] owns the graph and solves it
//! with a widening and a narrowing phase. The result is a sound
//! over-approximation of the values each integer may take, used to shrink
//! the bit-width of the hardware that computes it.
mod cache;
mod config;
mod container;
mod dot;
mod errors;
mod interval;
mod op_node;
mod oracle;
mod recognizer;
mod solver;
mod var_node;

pub use cache::RangeAnalysisCache;
pub use config::{RangeAnalysis, RangeAnalysisConfig};
pub use container::{NodeContainer, Phase, SolveStats, SolverState};
pub use errors::{RangeError, RangeResult};
pub use interval::{Interval, MAX_REGULAR_WIDTH};
pub use op_node::{Op, OpIdx, OpKind, OpNode, SigmaBound};
pub use oracle::{
    AliasOracle, DeclaredTypeOracle, PointsToOracle, TypeRangeOracle,
};
pub use recognizer::{
    BuildEnv, GraphBuilder, OpBuilder, Recognizer, Recognizers,
};
pub use var_node::{ValueKey, VarIdx, VarNode};
