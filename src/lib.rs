//! crossfacet: incremental faceted filtering and aggregation.
//!
//! Loads a flat set of records, indexes each configured dimension into bucket
//! bitmaps, and after every filter change publishes an immutable snapshot with
//! the filtered count, per-dimension leave-one-out histograms, and the
//! dimensions too degenerate to be worth showing.

pub mod cli;
pub mod engine;
pub mod format;
pub mod index;
pub mod store;
pub mod types;

// Re-export commonly used types at the crate root
pub use engine::{
    AggregationEngine, Batch, DimensionSelection, FacetController, FilterState,
    MembershipPredicate, Selection,
};
pub use format::{read_config, RecordFormat, RecordReader, SnapshotWriter};
pub use index::{DimensionIndex, IndexedDimension};
pub use store::RecordStore;
pub use types::{
    AggregateState, BucketCount, BucketValue, DimensionConfig, DimensionCounts, FacetConfig,
    FacetError, FacetResult, FieldValue, Record, RecordId, DEFAULT_ID_FIELD,
    DEFAULT_MIN_NONZERO_BUCKETS,
};
