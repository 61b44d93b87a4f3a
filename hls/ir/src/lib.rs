//! Statement-level intermediate representation consumed by the analyses.
//!
//! The representation is a flattened, SSA-form view of a C function body:
//! every integer temporary has exactly one defining [`Statement`], control
//! flow merges are explicit [`Statement::Phi`] nodes, and branch conditions
//! are materialized as [`Statement::Sigma`] copies (extended SSA) on the
//! edges they guard. Memory is modeled as a set of [`MemoryObject`]s that
//! are read and written monolithically.

mod builder;
mod function;
mod memory;
mod printer;
mod statement;
mod types;

pub use builder::FunctionBuilder;
pub use function::Function;
pub use hls_utils::{GetName, Id};
pub use memory::{Initializer, MemoryObject, Scope};
pub use printer::Printer;
pub use statement::{
    Address, BinOp, Constant, Operand, Predicate, Statement, UnOp,
};
pub use types::{Sign, Type};
