//! Dimension index: per dimension, bucket -> bitmap of record positions,
//! and record position -> buckets.

use std::collections::{BTreeSet, HashMap};

use roaring::RoaringBitmap;

use crate::store::RecordStore;
use crate::types::{BucketValue, DimensionConfig, FacetError, FacetResult, FieldValue, Record};

/// How one record's field resolved against a dimension.
enum Resolved {
    /// Matched buckets (ordinals into the dimension's values).
    Buckets(Vec<u32>),
    /// No usable value and no missing-value bucket configured.
    Missing,
}

/// Index of a single dimension.
#[derive(Debug)]
pub struct IndexedDimension {
    name: String,
    field: String,
    is_array: bool,
    is_dynamic: bool,
    /// Legal bucket values, in order. Ordinals index into this.
    values: Vec<BucketValue>,
    lookup: HashMap<BucketValue, u32>,
    /// ordinal -> records in that bucket.
    buckets: Vec<RoaringBitmap>,
    /// Records with a value outside `values` (or a missing scalar value).
    unrecognized: RoaringBitmap,
    /// CSR layout of record -> bucket ordinals: buckets of record `p` are
    /// `entries[offsets[p]..offsets[p + 1]]`.
    offsets: Vec<u32>,
    entries: Vec<u32>,
}

impl IndexedDimension {
    /// Build the index of one dimension over all records.
    pub fn build(config: &DimensionConfig, records: &[Record]) -> Self {
        let values = bucket_values(config, records);
        let lookup: HashMap<BucketValue, u32> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i as u32))
            .collect();
        let missing = config
            .missing
            .as_ref()
            .and_then(|m| lookup.get(&m.normalized()).copied());

        let mut dim = Self {
            name: config.name.clone(),
            field: config.field.clone(),
            is_array: config.array,
            is_dynamic: config.dynamic,
            buckets: vec![RoaringBitmap::new(); values.len()],
            values,
            lookup,
            unrecognized: RoaringBitmap::new(),
            offsets: Vec::with_capacity(records.len() + 1),
            entries: Vec::with_capacity(records.len()),
        };
        dim.offsets.push(0);

        let mut unrecognized_values = 0usize;
        for (pos, record) in records.iter().enumerate() {
            let pos = pos as u32;
            let (resolved, foreign) = dim.resolve(record);
            unrecognized_values += foreign;

            let ordinals = match resolved {
                Resolved::Buckets(ordinals) => ordinals,
                Resolved::Missing => missing.map(|ordinal| vec![ordinal]).unwrap_or_default(),
            };

            if foreign > 0 || (ordinals.is_empty() && !dim.is_array) {
                dim.unrecognized.insert(pos);
            }
            for &ordinal in &ordinals {
                dim.buckets[ordinal as usize].insert(pos);
            }
            dim.entries.extend_from_slice(&ordinals);
            dim.offsets.push(dim.entries.len() as u32);
        }

        if unrecognized_values > 0 {
            log::warn!(
                "dimension {}: {} value(s) in field {} are not declared buckets",
                dim.name,
                unrecognized_values,
                dim.field
            );
        }
        log::debug!(
            "dimension {}: {} buckets, {} unrecognized record(s)",
            dim.name,
            dim.values.len(),
            dim.unrecognized.len()
        );
        dim
    }

    /// Resolve a record's field to bucket ordinals.
    /// Also returns the number of values that matched no bucket.
    fn resolve(&self, record: &Record) -> (Resolved, usize) {
        let Some(value) = record.get(&self.field) else {
            return (Resolved::Missing, 0);
        };

        if self.is_array {
            let mut ordinals = Vec::new();
            let mut foreign = 0;
            for bucket in value.to_buckets() {
                match self.lookup.get(&bucket) {
                    Some(&ordinal) => ordinals.push(ordinal),
                    None => foreign += 1,
                }
            }
            ordinals.sort_unstable();
            ordinals.dedup();
            if ordinals.is_empty() && foreign == 0 {
                return (Resolved::Missing, 0);
            }
            return (Resolved::Buckets(ordinals), foreign);
        }

        match value.to_bucket() {
            Some(bucket) => match self.lookup.get(&bucket) {
                Some(&ordinal) => (Resolved::Buckets(vec![ordinal]), 0),
                None => (Resolved::Buckets(Vec::new()), 1),
            },
            // Lists in a scalar dimension are malformed.
            None if matches!(value, FieldValue::List(_)) => {
                (Resolved::Buckets(Vec::new()), 1)
            }
            None => (Resolved::Missing, 0),
        }
    }

    /// Dimension name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record field the dimension reads.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Whether a record may belong to several buckets.
    pub fn is_array(&self) -> bool {
        self.is_array
    }

    /// Whether values were discovered from data.
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Legal bucket values in order.
    pub fn values(&self) -> &[BucketValue] {
        &self.values
    }

    /// Number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.values.len()
    }

    /// Ordinal of a bucket value. Numeric text finds the integer bucket.
    pub fn ordinal(&self, value: &BucketValue) -> Option<u32> {
        self.lookup
            .get(value)
            .or_else(|| self.lookup.get(&value.normalized()))
            .copied()
    }

    /// Value of a bucket ordinal.
    pub fn value(&self, ordinal: u32) -> Option<&BucketValue> {
        self.values.get(ordinal as usize)
    }

    /// Records in a bucket.
    pub fn bucket(&self, ordinal: u32) -> &RoaringBitmap {
        &self.buckets[ordinal as usize]
    }

    /// All bucket bitmaps, by ordinal.
    pub fn buckets(&self) -> &[RoaringBitmap] {
        &self.buckets
    }

    /// Records whose value is not a bucket of this dimension.
    pub fn unrecognized(&self) -> &RoaringBitmap {
        &self.unrecognized
    }

    /// Bucket ordinals of the record at `position`, sorted.
    pub fn record_buckets(&self, position: u32) -> &[u32] {
        let p = position as usize;
        if p + 1 >= self.offsets.len() {
            return &[];
        }
        let start = self.offsets[p] as usize;
        let end = self.offsets[p + 1] as usize;
        &self.entries[start..end]
    }
}

/// Declared values, extended with discovered values for dynamic dimensions.
fn bucket_values(config: &DimensionConfig, records: &[Record]) -> Vec<BucketValue> {
    let mut values: Vec<BucketValue> = config
        .values
        .iter()
        .map(BucketValue::normalized)
        .collect();
    if !config.dynamic {
        return values;
    }

    let mut discovered = BTreeSet::new();
    for record in records {
        let Some(value) = record.get(&config.field) else {
            continue;
        };
        if config.array {
            discovered.extend(value.to_buckets());
        } else if let Some(bucket) = value.to_bucket() {
            discovered.insert(bucket);
        }
    }
    if let Some(missing) = &config.missing {
        discovered.insert(missing.normalized());
    }

    for value in discovered {
        if !values.contains(&value) {
            values.push(value);
        }
    }
    values
}

/// Indexes of every configured dimension over one record store.
#[derive(Debug, Default)]
pub struct DimensionIndex {
    dimensions: Vec<IndexedDimension>,
    record_count: u32,
}

impl DimensionIndex {
    /// Create an index with no dimensions and no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every dimension's index from the store.
    pub fn build(store: &RecordStore, dimensions: &[DimensionConfig]) -> Self {
        let records = store.records();
        let dimensions: Vec<IndexedDimension> = dimensions
            .iter()
            .map(|config| IndexedDimension::build(config, records))
            .collect();
        log::debug!(
            "indexed {} record(s) across {} dimension(s)",
            records.len(),
            dimensions.len()
        );
        Self {
            dimensions,
            record_count: records.len() as u32,
        }
    }

    /// Number of indexed records.
    pub fn record_count(&self) -> u32 {
        self.record_count
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Whether there are no dimensions.
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Dimension by position.
    pub fn get(&self, dimension: usize) -> Option<&IndexedDimension> {
        self.dimensions.get(dimension)
    }

    /// All dimensions in configuration order.
    pub fn dimensions(&self) -> &[IndexedDimension] {
        &self.dimensions
    }

    /// Position of a dimension by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    /// Resolve a dimension name and bucket value to (dimension, ordinal).
    pub fn resolve(&self, name: &str, value: &BucketValue) -> FacetResult<(usize, u32)> {
        let dimension = self
            .position(name)
            .ok_or_else(|| FacetError::UnknownDimension(name.to_string()))?;
        let ordinal = self.dimensions[dimension].ordinal(value).ok_or_else(|| {
            FacetError::UnknownBucket {
                dimension: name.to_string(),
                value: value.to_string(),
            }
        })?;
        Ok((dimension, ordinal))
    }
}
