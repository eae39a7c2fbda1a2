//! All data types for the crossfacet library.

pub mod config;
pub mod error;
pub mod record;
pub mod state;
pub mod value;

pub use config::{DimensionConfig, FacetConfig};
pub use error::{FacetError, FacetResult};
pub use record::{Record, RecordId};
pub use state::{AggregateState, BucketCount, DimensionCounts};
pub use value::{BucketValue, FieldValue};

/// Default record field holding the identifier.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Default minimum number of non-zero buckets for a dimension to be useful.
pub const DEFAULT_MIN_NONZERO_BUCKETS: usize = 2;

/// Largest record set a store accepts (positions are 32-bit bitmap members).
pub const MAX_RECORDS: usize = u32::MAX as usize;
