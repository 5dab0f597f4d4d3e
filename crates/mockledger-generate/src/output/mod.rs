pub mod csv;

use std::path::PathBuf;

use chrono::{DateTime, Local};

use mockledger_core::EntityKind;

use crate::errors::GenerationError;
use crate::model::RunOutput;

pub use self::csv::CsvOutputWriter;

/// Destination for the tables of a finished run.
pub trait OutputSink {
    /// Persist every table of `output`, all or nothing; returns written paths.
    fn write_run(&self, output: &RunOutput) -> Result<Vec<PathBuf>, GenerationError>;
}

/// `<ENTITY>_DUMMY_DATA_<count>_<YYYY-MM-DD_HH-MM-SS>.csv`
pub fn output_file_name(kind: EntityKind, count: usize, timestamp: &DateTime<Local>) -> String {
    format!(
        "{}_DUMMY_DATA_{count}_{}.csv",
        kind.file_tag(),
        timestamp.format("%Y-%m-%d_%H-%M-%S")
    )
}
