//! Index structures for fast lookup. One independent index per dimension,
//! rebuilt whenever the record store is replaced.

pub mod dimension_index;

pub use dimension_index::{DimensionIndex, IndexedDimension};
