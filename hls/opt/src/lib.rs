pub mod analysis;
pub mod traversal;
