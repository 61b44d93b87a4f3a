//! Dense arenas addressed by typed integer indices.
mod index_trait;
mod indexed_map;
mod macros;

pub mod maps {
    pub use super::indexed_map::{IndexedMap, SecondaryMap};
}

pub use index_trait::IndexRef;
