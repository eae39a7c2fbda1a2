//! Published aggregate snapshots.

use std::collections::BTreeMap;

use serde::Serialize;

use super::value::BucketValue;

/// Count of records for one bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketCount {
    pub value: BucketValue,
    pub count: u64,
}

/// Leave-one-out histogram of one dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DimensionCounts {
    /// Counts for every bucket, in the dimension's value order.
    pub buckets: Vec<BucketCount>,
    /// Records whose value is not a bucket of the dimension.
    pub unrecognized: u64,
}

impl DimensionCounts {
    /// Count for a single bucket. Numeric text finds the integer bucket.
    pub fn get(&self, value: &BucketValue) -> Option<u64> {
        let value = value.normalized();
        self.buckets
            .iter()
            .find(|b| b.value == value)
            .map(|b| b.count)
    }

    /// Number of buckets with a non-zero count.
    pub fn nonzero_buckets(&self) -> usize {
        self.buckets.iter().filter(|b| b.count > 0).count()
    }

    /// Sum of all bucket counts (array dimensions may count a record more than once).
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// Immutable result of one recomputation; the only state readers consume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateState {
    /// Incremented each time a record set is loaded or replaced.
    pub data_version: u64,
    /// Records in the store.
    pub total_count: u64,
    /// Records matching every active dimension filter.
    pub filtered_count: u64,
    /// Per-dimension histograms computed without the dimension's own filter.
    pub dimension_counts: BTreeMap<String, DimensionCounts>,
    /// At least one dimension has a selection.
    pub has_filters: bool,
    /// Dimensions without enough non-zero buckets to be useful, in configuration order.
    pub empty_dimensions: Vec<String>,
}

impl AggregateState {
    /// Histogram for a dimension.
    pub fn counts(&self, dimension: &str) -> Option<&DimensionCounts> {
        self.dimension_counts.get(dimension)
    }

    /// Leave-one-out count of one bucket.
    pub fn count(&self, dimension: &str, value: &BucketValue) -> Option<u64> {
        self.counts(dimension).and_then(|c| c.get(value))
    }

    /// Whether the dimension is listed as empty.
    pub fn is_empty_dimension(&self, dimension: &str) -> bool {
        self.empty_dimensions.iter().any(|d| d == dimension)
    }
}
