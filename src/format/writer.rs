//! Writes aggregate snapshots and selections as JSON.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::types::FacetResult;

/// JSON writer for snapshots, selections and other plain-data outputs.
pub struct SnapshotWriter {
    pretty: bool,
}

impl SnapshotWriter {
    /// Create a writer; `pretty` enables indented output.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Serialize a value to a string.
    pub fn render(&self, value: &impl Serialize) -> FacetResult<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(text)
    }

    /// Serialize a value to any writer, followed by a newline.
    pub fn write_to(&self, writer: &mut impl Write, value: &impl Serialize) -> FacetResult<()> {
        let text = self.render(value)?;
        writer.write_all(text.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    /// Serialize a value to a file, replacing its contents.
    pub fn write_to_file(&self, path: &Path, value: &impl Serialize) -> FacetResult<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_to(&mut file, value)?;
        file.flush()?;
        Ok(())
    }
}
