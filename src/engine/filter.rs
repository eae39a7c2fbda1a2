//! Filter state (selected bucket ordinals per dimension) and the read-only
//! selection view handed to external filter builders.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::index::DimensionIndex;
use crate::types::BucketValue;

/// Selected bucket ordinals, one set per dimension (positional, matching the
/// dimension index). An empty set means no restriction from that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    selected: Vec<BTreeSet<u32>>,
}

impl FilterState {
    /// Create an empty filter over `dimension_count` dimensions.
    pub fn new(dimension_count: usize) -> Self {
        Self {
            selected: vec![BTreeSet::new(); dimension_count],
        }
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.selected.len()
    }

    /// Whether the filter covers no dimensions.
    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Add the bucket if absent, remove it if present.
    /// Returns whether the bucket is selected afterwards.
    pub fn toggle(&mut self, dimension: usize, ordinal: u32) -> bool {
        let set = &mut self.selected[dimension];
        if set.remove(&ordinal) {
            false
        } else {
            set.insert(ordinal);
            true
        }
    }

    /// Replace a dimension's selection. Returns whether it changed.
    pub fn set(&mut self, dimension: usize, ordinals: BTreeSet<u32>) -> bool {
        let changed = self.selected[dimension] != ordinals;
        self.selected[dimension] = ordinals;
        changed
    }

    /// Clear one dimension. Returns whether it had a selection.
    pub fn clear(&mut self, dimension: usize) -> bool {
        let had = !self.selected[dimension].is_empty();
        self.selected[dimension].clear();
        had
    }

    /// Clear every dimension.
    pub fn reset(&mut self) {
        for set in &mut self.selected {
            set.clear();
        }
    }

    /// Selected ordinals of a dimension.
    pub fn selected(&self, dimension: usize) -> &BTreeSet<u32> {
        &self.selected[dimension]
    }

    /// Whether the dimension restricts the result.
    pub fn is_active(&self, dimension: usize) -> bool {
        !self.selected[dimension].is_empty()
    }

    /// Whether any dimension restricts the result.
    pub fn has_filters(&self) -> bool {
        self.selected.iter().any(|s| !s.is_empty())
    }

    /// Positions of restricting dimensions, ascending.
    pub fn active_dimensions(&self) -> Vec<usize> {
        (0..self.selected.len())
            .filter(|&d| self.is_active(d))
            .collect()
    }

    /// Test a record's buckets against every active dimension.
    pub fn matches(&self, index: &DimensionIndex, position: u32) -> bool {
        index
            .dimensions()
            .iter()
            .zip(&self.selected)
            .filter(|(_, selected)| !selected.is_empty())
            .all(|(dim, selected)| {
                dim.record_buckets(position)
                    .iter()
                    .any(|ordinal| selected.contains(ordinal))
            })
    }

    /// Carry a selection over to a rebuilt index with the same dimensions.
    /// Values no longer present in the new index are dropped.
    pub fn remap(&self, from: &DimensionIndex, to: &DimensionIndex) -> Self {
        let mut next = Self::new(to.len());
        for (d, selected) in self.selected.iter().enumerate() {
            let (Some(old), Some(new)) = (from.get(d), to.get(d)) else {
                continue;
            };
            next.selected[d] = selected
                .iter()
                .filter_map(|&ordinal| old.value(ordinal))
                .filter_map(|value| new.ordinal(value))
                .collect();
        }
        next
    }

    /// Build the public view of this filter.
    pub fn selection(&self, index: &DimensionIndex) -> Selection {
        let dimensions = index
            .dimensions()
            .iter()
            .zip(&self.selected)
            .map(|(dim, selected)| DimensionSelection {
                dimension: dim.name().to_string(),
                field: dim.field().to_string(),
                is_array: dim.is_array(),
                values: selected
                    .iter()
                    .filter_map(|&ordinal| dim.value(ordinal).cloned())
                    .collect(),
            })
            .collect();
        Selection { dimensions }
    }
}

/// Selected values of one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionSelection {
    pub dimension: String,
    pub field: String,
    pub is_array: bool,
    /// Selected values, in the dimension's value order.
    pub values: Vec<BucketValue>,
}

/// A membership test on one record field: the field's value (or, for array
/// fields, any of its values) must be one of `values`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipPredicate {
    pub field: String,
    pub values: Vec<BucketValue>,
    /// The field holds several values; match when any of them is in `values`.
    pub any_of: bool,
}

/// Read-only view of the current filter selection, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub dimensions: Vec<DimensionSelection>,
}

impl Selection {
    /// Whether no dimension has a selection.
    pub fn is_empty(&self) -> bool {
        self.dimensions.iter().all(|d| d.values.is_empty())
    }

    /// Selected values of a dimension.
    pub fn values(&self, dimension: &str) -> &[BucketValue] {
        self.dimensions
            .iter()
            .find(|d| d.dimension == dimension)
            .map(|d| d.values.as_slice())
            .unwrap_or(&[])
    }

    /// Whether a value is selected in a dimension.
    pub fn contains(&self, dimension: &str, value: &BucketValue) -> bool {
        self.values(dimension).contains(&value.normalized())
    }

    /// Membership predicates for every restricting dimension, to be combined
    /// with AND. Records bucketed through a missing-value default are not
    /// matched by their (null) field and need the caller's own null handling.
    pub fn predicates(&self) -> Vec<MembershipPredicate> {
        self.dimensions
            .iter()
            .filter(|d| !d.values.is_empty())
            .map(|d| MembershipPredicate {
                field: d.field.clone(),
                values: d.values.clone(),
                any_of: d.is_array,
            })
            .collect()
    }
}
