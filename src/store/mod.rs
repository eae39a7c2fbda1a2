//! Record storage: the immutable working set the engine filters.

pub mod record_store;

pub use record_store::RecordStore;
