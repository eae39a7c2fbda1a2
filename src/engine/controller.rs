//! Facet controller: the public façade owning the store, index, filter and
//! aggregation engine for one working set.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::aggregate::AggregationEngine;
use super::filter::{FilterState, Selection};
use crate::index::DimensionIndex;
use crate::store::RecordStore;
use crate::types::{
    AggregateState, BucketValue, DimensionConfig, FacetConfig, FacetError, FacetResult, Record,
    RecordId, DEFAULT_MIN_NONZERO_BUCKETS,
};

/// Owns one record set and its filter selection, and publishes immutable
/// aggregate snapshots after every mutation.
///
/// Mutations either publish immediately (`toggle`, `reset`, ...) or are
/// staged (`stage_*`, [`FacetController::batch`]) and published together by
/// [`FacetController::flush`].
pub struct FacetController {
    config: Option<FacetConfig>,
    store: RecordStore,
    index: DimensionIndex,
    filter: FilterState,
    engine: AggregationEngine,
    state: Arc<AggregateState>,
    /// Staged mutations not yet published.
    pending: usize,
    data_version: u64,
}

impl FacetController {
    /// Create a controller with no data loaded.
    pub fn new() -> Self {
        Self {
            config: None,
            store: RecordStore::new(),
            index: DimensionIndex::new(),
            filter: FilterState::new(0),
            engine: AggregationEngine::new(0),
            state: Arc::new(AggregateState::default()),
            pending: 0,
            data_version: 0,
        }
    }

    /// Load a record set with its dimension configuration.
    ///
    /// The configuration is validated first; on error the previously loaded
    /// data, selection and snapshot are left untouched. A successful load
    /// clears the selection and discards staged mutations.
    pub fn load(
        &mut self,
        records: Vec<Record>,
        config: FacetConfig,
    ) -> FacetResult<Arc<AggregateState>> {
        config.validate()?;
        let store = RecordStore::from_records(records)?;
        let index = DimensionIndex::build(&store, &config.dimensions);
        log::info!(
            "loaded {} record(s) with {} dimension(s)",
            store.len(),
            index.len()
        );

        if self.pending > 0 {
            log::debug!("discarding {} staged mutation(s)", self.pending);
        }
        self.filter = FilterState::new(index.len());
        self.engine = AggregationEngine::new(index.len());
        self.store = store;
        self.index = index;
        self.config = Some(config);
        Ok(self.install_data())
    }

    /// Replace the records while keeping the configuration and selection.
    ///
    /// Selected values missing from the rebuilt index (possible for dynamic
    /// dimensions) are dropped. Staged mutations are part of the carried
    /// selection and are published with the new data.
    pub fn replace_data(&mut self, records: Vec<Record>) -> FacetResult<Arc<AggregateState>> {
        let config = self.config.as_ref().ok_or(FacetError::NotLoaded)?;
        let store = RecordStore::from_records(records)?;
        let index = DimensionIndex::build(&store, &config.dimensions);
        log::info!("replaced data with {} record(s)", store.len());
        if self.pending > 0 {
            log::debug!(
                "publishing {} staged mutation(s) with the new data",
                self.pending
            );
        }

        self.filter = self.filter.remap(&self.index, &index);
        self.engine = AggregationEngine::new(index.len());
        self.store = store;
        self.index = index;
        Ok(self.install_data())
    }

    fn install_data(&mut self) -> Arc<AggregateState> {
        self.data_version += 1;
        self.pending = 0;
        self.publish()
    }

    /// Toggle a bucket of a dimension and publish.
    pub fn toggle(
        &mut self,
        dimension: &str,
        value: impl Into<BucketValue>,
    ) -> FacetResult<Arc<AggregateState>> {
        self.stage_toggle(dimension, value)?;
        Ok(self.flush())
    }

    /// Replace a dimension's selection and publish.
    pub fn set_selection(
        &mut self,
        dimension: &str,
        values: &[BucketValue],
    ) -> FacetResult<Arc<AggregateState>> {
        self.stage_selection(dimension, values)?;
        Ok(self.flush())
    }

    /// Clear one dimension's selection and publish.
    pub fn clear_dimension(&mut self, dimension: &str) -> FacetResult<Arc<AggregateState>> {
        self.stage_clear(dimension)?;
        Ok(self.flush())
    }

    /// Clear every selection and publish. Always recomputes, even when
    /// nothing was selected.
    pub fn reset(&mut self) -> Arc<AggregateState> {
        self.stage_reset();
        self.flush()
    }

    /// Toggle without publishing.
    pub fn stage_toggle(
        &mut self,
        dimension: &str,
        value: impl Into<BucketValue>,
    ) -> FacetResult<()> {
        let (d, ordinal) = self.index.resolve(dimension, &value.into())?;
        self.filter.toggle(d, ordinal);
        self.engine.invalidate(d);
        self.pending += 1;
        Ok(())
    }

    /// Replace a dimension's selection without publishing. Every value is
    /// validated before anything changes.
    pub fn stage_selection(&mut self, dimension: &str, values: &[BucketValue]) -> FacetResult<()> {
        let d = self.dimension_position(dimension)?;
        let mut ordinals = BTreeSet::new();
        for value in values {
            ordinals.insert(self.index.resolve(dimension, value)?.1);
        }
        self.filter.set(d, ordinals);
        self.engine.invalidate(d);
        self.pending += 1;
        Ok(())
    }

    /// Clear one dimension without publishing.
    pub fn stage_clear(&mut self, dimension: &str) -> FacetResult<()> {
        let d = self.dimension_position(dimension)?;
        self.filter.clear(d);
        self.engine.invalidate(d);
        self.pending += 1;
        Ok(())
    }

    /// Clear every selection without publishing.
    pub fn stage_reset(&mut self) {
        self.filter.reset();
        for d in 0..self.index.len() {
            self.engine.invalidate(d);
        }
        self.pending += 1;
    }

    /// Publish one recomputation covering every staged mutation. Returns the
    /// current snapshot unchanged when nothing is staged.
    pub fn flush(&mut self) -> Arc<AggregateState> {
        if self.pending == 0 {
            return Arc::clone(&self.state);
        }
        log::debug!("publishing {} coalesced mutation(s)", self.pending);
        self.pending = 0;
        self.publish()
    }

    /// Stage the closure's mutations and publish them as one recomputation.
    ///
    /// If the closure fails, the selection is restored to what it was before
    /// the batch and the error is returned; nothing is published.
    pub fn batch<F>(&mut self, f: F) -> FacetResult<Arc<AggregateState>>
    where
        F: FnOnce(&mut Batch<'_>) -> FacetResult<()>,
    {
        let saved_filter = self.filter.clone();
        let saved_pending = self.pending;
        let result = f(&mut Batch { controller: self });
        match result {
            Ok(()) => Ok(self.flush()),
            Err(e) => {
                self.filter = saved_filter;
                self.pending = saved_pending;
                // Masks may have been rebuilt for the abandoned selection.
                self.engine.invalidate_all();
                Err(e)
            }
        }
    }

    fn publish(&mut self) -> Arc<AggregateState> {
        let min_nonzero = self
            .config
            .as_ref()
            .map_or(DEFAULT_MIN_NONZERO_BUCKETS, |c| c.min_nonzero_buckets);
        let state = self
            .engine
            .compute(&self.index, &self.filter, min_nonzero, self.data_version);
        self.state = Arc::new(state);
        Arc::clone(&self.state)
    }

    fn dimension_position(&self, dimension: &str) -> FacetResult<usize> {
        self.index
            .position(dimension)
            .ok_or_else(|| FacetError::UnknownDimension(dimension.to_string()))
    }

    /// Last published snapshot. Never recomputes.
    pub fn get_state(&self) -> Arc<AggregateState> {
        Arc::clone(&self.state)
    }

    /// Current selection, including staged mutations.
    pub fn get_selection(&self) -> Selection {
        self.filter.selection(&self.index)
    }

    /// Whether staged mutations await [`FacetController::flush`].
    pub fn has_pending(&self) -> bool {
        self.pending > 0
    }

    /// Ids of records matching the published filter, in load order.
    pub fn filtered_ids(&self) -> Vec<RecordId> {
        self.engine
            .filtered_positions(self.index.record_count())
            .into_iter()
            .filter_map(|pos| self.store.get(pos).map(|r| r.id.clone()))
            .collect()
    }

    /// Whether a record matches the current selection. `None` if the id is unknown.
    pub fn is_selected(&self, id: &RecordId) -> Option<bool> {
        let position = self.store.position(id)?;
        Some(self.filter.matches(&self.index, position))
    }

    /// Loaded configuration.
    pub fn config(&self) -> Option<&FacetConfig> {
        self.config.as_ref()
    }

    /// Configured dimensions.
    pub fn dimensions(&self) -> &[DimensionConfig] {
        self.config
            .as_ref()
            .map(|c| c.dimensions.as_slice())
            .unwrap_or(&[])
    }

    /// Bucket values of a dimension, including discovered ones.
    pub fn values(&self, dimension: &str) -> FacetResult<&[BucketValue]> {
        let d = self.dimension_position(dimension)?;
        Ok(self.index.dimensions()[d].values())
    }

    /// The record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The dimension index.
    pub fn index(&self) -> &DimensionIndex {
        &self.index
    }
}

impl Default for FacetController {
    fn default() -> Self {
        Self::new()
    }
}

/// Staging handle passed to [`FacetController::batch`].
pub struct Batch<'a> {
    controller: &'a mut FacetController,
}

impl Batch<'_> {
    pub fn toggle(&mut self, dimension: &str, value: impl Into<BucketValue>) -> FacetResult<()> {
        self.controller.stage_toggle(dimension, value)
    }

    pub fn set_selection(&mut self, dimension: &str, values: &[BucketValue]) -> FacetResult<()> {
        self.controller.stage_selection(dimension, values)
    }

    pub fn clear_dimension(&mut self, dimension: &str) -> FacetResult<()> {
        self.controller.stage_clear(dimension)
    }

    pub fn reset(&mut self) {
        self.controller.stage_reset();
    }

    /// Selection including mutations staged so far.
    pub fn selection(&self) -> Selection {
        self.controller.get_selection()
    }
}
