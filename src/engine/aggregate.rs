//! Aggregation engine: filtered count and leave-one-out histograms over
//! bucket bitmaps.
//!
//! Each dimension's constraint mask (the union of its selected buckets) is
//! cached and only rebuilt for dimensions whose selection changed. For the
//! `k` restricting dimensions, prefix and suffix intersections are built in
//! `2k` bitmap intersections. The leave-one-out base of restricting
//! dimension `i` is `prefix[i] & suffix[i + 1]`; every other dimension uses
//! the fully filtered set. Counting is one `intersection_len` per bucket.
//!
//! A dimension's base only depends on the *other* dimensions' masks, so when
//! a single dimension changed its own histogram is reused as is.

use std::collections::BTreeMap;

use roaring::RoaringBitmap;

use super::filter::FilterState;
use crate::index::{DimensionIndex, IndexedDimension};
use crate::types::{AggregateState, BucketCount, DimensionCounts};

/// Last computed histogram of one dimension, by bucket ordinal.
#[derive(Debug, Clone, Default)]
struct Tally {
    counts: Vec<u64>,
    unrecognized: u64,
}

/// Incremental aggregation over a dimension index.
#[derive(Debug, Default)]
pub struct AggregationEngine {
    /// Union of selected bucket bitmaps per dimension; `None` = unconstrained.
    masks: Vec<Option<RoaringBitmap>>,
    /// Dimensions whose mask must be rebuilt before the next computation.
    stale: Vec<bool>,
    tallies: Vec<Tally>,
    /// Records matching every constraint; `None` = all records.
    filtered: Option<RoaringBitmap>,
    /// Whether `tallies` reflect a previous computation.
    primed: bool,
}

impl AggregationEngine {
    /// Create an engine for `dimension_count` dimensions.
    pub fn new(dimension_count: usize) -> Self {
        Self {
            masks: vec![None; dimension_count],
            stale: vec![true; dimension_count],
            tallies: vec![Tally::default(); dimension_count],
            filtered: None,
            primed: false,
        }
    }

    /// Mark one dimension's selection as changed.
    pub fn invalidate(&mut self, dimension: usize) {
        if let Some(flag) = self.stale.get_mut(dimension) {
            *flag = true;
        }
    }

    /// Drop all cached results.
    pub fn invalidate_all(&mut self) {
        self.stale.iter_mut().for_each(|flag| *flag = true);
        self.primed = false;
    }

    /// Whether any dimension is waiting to be recomputed.
    pub fn is_stale(&self) -> bool {
        !self.primed || self.stale.iter().any(|&s| s)
    }

    /// Recompute the aggregate for the current filter.
    pub fn compute(
        &mut self,
        index: &DimensionIndex,
        filter: &FilterState,
        min_nonzero_buckets: usize,
        data_version: u64,
    ) -> AggregateState {
        let n = index.len();
        if self.masks.len() != n {
            *self = Self::new(n);
        }

        // Rebuild stale masks and note which actually changed.
        let mut changed = vec![false; n];
        for (d, dim) in index.dimensions().iter().enumerate() {
            if !self.stale[d] && self.primed {
                continue;
            }
            let mask = union_mask(dim, filter, d);
            changed[d] = mask != self.masks[d];
            self.masks[d] = mask;
            self.stale[d] = false;
        }

        let active: Vec<usize> = (0..n).filter(|&d| self.masks[d].is_some()).collect();
        let k = active.len();

        let mut prefix: Vec<Option<RoaringBitmap>> = Vec::with_capacity(k + 1);
        prefix.push(None);
        for (i, &d) in active.iter().enumerate() {
            let next = intersect(prefix[i].as_ref(), self.masks[d].as_ref());
            prefix.push(next);
        }
        let mut suffix: Vec<Option<RoaringBitmap>> = vec![None; k + 1];
        for i in (0..k).rev() {
            suffix[i] = intersect(suffix[i + 1].as_ref(), self.masks[active[i]].as_ref());
        }
        self.filtered = prefix.pop().flatten();

        let changed_count = changed.iter().filter(|&&c| c).count();
        let mut recounted = 0;
        for (d, dim) in index.dimensions().iter().enumerate() {
            // Only another dimension's change moves this dimension's base.
            if self.primed && changed_count == usize::from(changed[d]) {
                continue;
            }
            let owned;
            let base = match active.iter().position(|&a| a == d) {
                Some(i) => {
                    owned = intersect(prefix[i].as_ref(), suffix[i + 1].as_ref());
                    owned.as_ref()
                }
                None => self.filtered.as_ref(),
            };
            self.tallies[d] = tally(dim, base);
            recounted += 1;
        }
        self.primed = true;
        log::debug!(
            "aggregate: {} restricting dimension(s), {} of {} histogram(s) recounted",
            k,
            recounted,
            n
        );

        self.snapshot(index, filter, min_nonzero_buckets, data_version)
    }

    fn snapshot(
        &self,
        index: &DimensionIndex,
        filter: &FilterState,
        min_nonzero_buckets: usize,
        data_version: u64,
    ) -> AggregateState {
        let total_count = index.record_count() as u64;
        // A dimension with no non-zero bucket is never useful.
        let threshold = min_nonzero_buckets.max(1);

        let mut dimension_counts = BTreeMap::new();
        let mut empty_dimensions = Vec::new();
        for (dim, tally) in index.dimensions().iter().zip(&self.tallies) {
            let counts = DimensionCounts {
                buckets: dim
                    .values()
                    .iter()
                    .zip(&tally.counts)
                    .map(|(value, &count)| BucketCount {
                        value: value.clone(),
                        count,
                    })
                    .collect(),
                unrecognized: tally.unrecognized,
            };
            if counts.nonzero_buckets() < threshold {
                empty_dimensions.push(dim.name().to_string());
            }
            dimension_counts.insert(dim.name().to_string(), counts);
        }

        AggregateState {
            data_version,
            total_count,
            filtered_count: self
                .filtered
                .as_ref()
                .map_or(total_count, |bitmap| bitmap.len()),
            dimension_counts,
            has_filters: filter.has_filters(),
            empty_dimensions,
        }
    }

    /// Records matching every constraint as of the last computation;
    /// `None` means no constraint is active.
    pub fn filtered(&self) -> Option<&RoaringBitmap> {
        self.filtered.as_ref()
    }

    /// Positions matching every constraint as of the last computation.
    pub fn filtered_positions(&self, record_count: u32) -> Vec<u32> {
        match &self.filtered {
            Some(bitmap) => bitmap.iter().collect(),
            None => (0..record_count).collect(),
        }
    }
}

/// Union of a dimension's selected bucket bitmaps, or `None` when unselected.
fn union_mask(dim: &IndexedDimension, filter: &FilterState, d: usize) -> Option<RoaringBitmap> {
    let selected = filter.selected(d);
    if selected.is_empty() {
        return None;
    }
    let mut mask = RoaringBitmap::new();
    for &ordinal in selected {
        mask |= dim.bucket(ordinal);
    }
    Some(mask)
}

/// Intersection where `None` stands for the universe.
fn intersect(a: Option<&RoaringBitmap>, b: Option<&RoaringBitmap>) -> Option<RoaringBitmap> {
    match (a, b) {
        (None, None) => None,
        (Some(x), None) | (None, Some(x)) => Some(x.clone()),
        (Some(x), Some(y)) => Some(x & y),
    }
}

fn tally(dim: &IndexedDimension, base: Option<&RoaringBitmap>) -> Tally {
    let count = |bucket: &RoaringBitmap| match base {
        Some(base) => base.intersection_len(bucket),
        None => bucket.len(),
    };
    Tally {
        counts: dim.buckets().iter().map(count).collect(),
        unrecognized: count(dim.unrecognized()),
    }
}
