//! Reads record sets (JSON, CSV) and dimension configurations (TOML, JSON)
//! from files.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::types::{FacetConfig, FacetError, FacetResult, FieldValue, Record, RecordId};

/// Supported record file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Top-level array of objects.
    Json,
    /// Header row plus one record per line.
    Csv,
}

impl RecordFormat {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> FacetResult<Self> {
        match extension(path).as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(FacetError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Reader for record files.
pub struct RecordReader {
    id_field: String,
}

impl RecordReader {
    /// Create a reader taking ids from `id_field`.
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
        }
    }

    /// Read a record file, dispatching on its extension.
    pub fn read_from_file(&self, path: &Path) -> FacetResult<Vec<Record>> {
        let format = RecordFormat::from_path(path)?;
        let file = std::fs::File::open(path)?;
        self.read_from(std::io::BufReader::new(file), format)
    }

    /// Read records in the given format from any reader.
    pub fn read_from(&self, reader: impl Read, format: RecordFormat) -> FacetResult<Vec<Record>> {
        let records = match format {
            RecordFormat::Json => self.read_json(reader)?,
            RecordFormat::Csv => self.read_csv(reader)?,
        };
        let positional = records.iter().filter(|r| r.id.is_positional()).count();
        if positional > 0 {
            log::warn!(
                "{} record(s) have no usable {:?} field; using their position as id",
                positional,
                self.id_field
            );
        }
        log::debug!("read {} record(s)", records.len());
        Ok(records)
    }

    /// Read a JSON array of objects.
    pub fn read_json(&self, reader: impl Read) -> FacetResult<Vec<Record>> {
        let root: serde_json::Value = serde_json::from_reader(reader)?;
        let serde_json::Value::Array(rows) = root else {
            return Err(FacetError::InvalidRecordSet(
                "expected a top-level JSON array".to_string(),
            ));
        };

        let mut records = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            let serde_json::Value::Object(object) = row else {
                return Err(FacetError::InvalidRecordSet(format!(
                    "row {} is not a JSON object",
                    i
                )));
            };
            let fields: HashMap<String, FieldValue> = object
                .into_iter()
                .map(|(key, value)| (key, FieldValue::from(value)))
                .collect();
            records.push(self.make_record(fields, i));
        }
        Ok(records)
    }

    /// Read CSV with a header row. Empty cells are null; numeric cells are numbers.
    pub fn read_csv(&self, reader: impl Read) -> FacetResult<Vec<Record>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();

        let mut records = Vec::new();
        for (i, row) in csv_reader.records().enumerate() {
            let row = row?;
            let fields: HashMap<String, FieldValue> = headers
                .iter()
                .zip(row.iter())
                .map(|(name, cell)| (name.to_string(), FieldValue::from_cell(cell)))
                .collect();
            records.push(self.make_record(fields, i));
        }
        Ok(records)
    }

    fn make_record(&self, fields: HashMap<String, FieldValue>, position: usize) -> Record {
        let id = RecordId::from_field(fields.get(&self.id_field), position as u32);
        Record { id, fields }
    }
}

/// Read and validate a configuration file (`.toml` or `.json`).
pub fn read_config(path: &Path) -> FacetResult<FacetConfig> {
    let text = std::fs::read_to_string(path)?;
    match extension(path).as_str() {
        "toml" => FacetConfig::from_toml_str(&text),
        "json" => FacetConfig::from_json_str(&text),
        other => Err(FacetError::UnsupportedFormat(format!(".{}", other))),
    }
}
