//! File I/O: record and configuration readers, snapshot writer.

pub mod reader;
pub mod writer;

pub use reader::{read_config, RecordFormat, RecordReader};
pub use writer::SnapshotWriter;
