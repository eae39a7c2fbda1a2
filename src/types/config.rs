//! Dimension configuration: a closed, validated description of every facet.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::{FacetError, FacetResult};
use super::value::BucketValue;
use super::{DEFAULT_ID_FIELD, DEFAULT_MIN_NONZERO_BUCKETS};

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

fn default_min_nonzero_buckets() -> usize {
    DEFAULT_MIN_NONZERO_BUCKETS
}

/// Complete engine configuration.
///
/// ```toml
/// id_field = "id"
/// min_nonzero_buckets = 2
///
/// [[dimensions]]
/// name = "height"
/// field = "HeightClass"
/// values = [0, 1, 2, 3]
/// missing = 0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FacetConfig {
    /// Record field holding the stable identifier.
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Dimensions with fewer non-zero buckets than this are reported empty.
    #[serde(default = "default_min_nonzero_buckets")]
    pub min_nonzero_buckets: usize,

    /// Facets, in display order.
    #[serde(default)]
    pub dimensions: Vec<DimensionConfig>,
}

/// One facet over the records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DimensionConfig {
    /// Unique dimension name.
    pub name: String,

    /// Record field the dimension reads.
    pub field: String,

    /// Ordered legal bucket values. Numeric text is treated as an integer
    /// and text is trimmed, the same way record values are read.
    #[serde(default)]
    pub values: Vec<BucketValue>,

    /// A record may belong to several buckets at once.
    #[serde(default)]
    pub array: bool,

    /// Values are discovered from data in addition to the declared ones.
    #[serde(default)]
    pub dynamic: bool,

    /// Bucket assigned to records whose field is absent or null.
    #[serde(default)]
    pub missing: Option<BucketValue>,

    /// Presentation hint: hide the dimension when it has no useful spread.
    #[serde(default)]
    pub hide_empty: bool,

    /// Presentation hint: sort buckets by count when rendering.
    #[serde(default)]
    pub sort: bool,

    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
}

impl DimensionConfig {
    /// Create a static, single-valued dimension.
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<BucketValue>>,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
            array: false,
            dynamic: false,
            missing: None,
            hide_empty: false,
            sort: false,
            label: None,
        }
    }

    /// Create a dynamic dimension whose values come from the data.
    pub fn discovered(name: impl Into<String>, field: impl Into<String>) -> Self {
        let mut dim = Self::new(name, field, Vec::<BucketValue>::new());
        dim.dynamic = true;
        dim
    }

    pub fn array(mut self, array: bool) -> Self {
        self.array = array;
        self
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn missing(mut self, bucket: impl Into<BucketValue>) -> Self {
        self.missing = Some(bucket.into());
        self
    }

    pub fn hide_empty(mut self, hide_empty: bool) -> Self {
        self.hide_empty = hide_empty;
        self
    }

    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Validate this dimension in isolation.
    pub fn validate(&self) -> FacetResult<()> {
        if self.name.trim().is_empty() {
            return Err(FacetError::EmptyDimensionName);
        }
        if self.field.trim().is_empty() {
            return Err(FacetError::MissingField(self.name.clone()));
        }
        if !self.dynamic && self.values.is_empty() {
            return Err(FacetError::NoValues(self.name.clone()));
        }
        let mut seen = HashSet::with_capacity(self.values.len());
        for value in &self.values {
            if !seen.insert(value.normalized()) {
                return Err(FacetError::DuplicateBucket {
                    dimension: self.name.clone(),
                    value: value.to_string(),
                });
            }
        }
        if let Some(missing) = &self.missing {
            if !self.dynamic && !seen.contains(&missing.normalized()) {
                return Err(FacetError::InvalidMissingBucket {
                    dimension: self.name.clone(),
                    value: missing.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl FacetConfig {
    /// Create a configuration with default id field and threshold.
    pub fn new(dimensions: Vec<DimensionConfig>) -> Self {
        Self {
            id_field: default_id_field(),
            min_nonzero_buckets: DEFAULT_MIN_NONZERO_BUCKETS,
            dimensions,
        }
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn min_nonzero_buckets(mut self, min: usize) -> Self {
        self.min_nonzero_buckets = min;
        self
    }

    /// Parse and validate a TOML configuration.
    pub fn from_toml_str(text: &str) -> FacetResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(text: &str) -> FacetResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every dimension and reject duplicate names.
    pub fn validate(&self) -> FacetResult<()> {
        let mut names = HashSet::with_capacity(self.dimensions.len());
        for dim in &self.dimensions {
            dim.validate()?;
            if !names.insert(dim.name.as_str()) {
                return Err(FacetError::DuplicateDimension(dim.name.clone()));
            }
        }
        Ok(())
    }

    /// Look up a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&DimensionConfig> {
        self.dimensions.iter().find(|d| d.name == name)
    }
}

impl Default for FacetConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
