use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{OutputSink, output_file_name};
use crate::errors::GenerationError;
use crate::model::RunOutput;
use crate::table::GeneratedTable;

/// Writes one CSV file per table into `out_dir`.
///
/// Every table goes to a temp file tagged with the run id first; the temps
/// are renamed only after all of them were written, and removed on any
/// failure.
#[derive(Debug, Clone)]
pub struct CsvOutputWriter {
    out_dir: PathBuf,
}

impl CsvOutputWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl OutputSink for CsvOutputWriter {
    fn write_run(&self, output: &RunOutput) -> Result<Vec<PathBuf>, GenerationError> {
        std::fs::create_dir_all(&self.out_dir).map_err(|source| GenerationError::OutputWrite {
            path: self.out_dir.display().to_string(),
            source,
        })?;

        let targets: Vec<(PathBuf, PathBuf)> = output
            .tables
            .iter()
            .map(|table| {
                let name = output_file_name(table.kind, table.record_count(), &output.started_at);
                (
                    self.out_dir.join(format!("{name}.{}.tmp", output.run_id)),
                    self.out_dir.join(name),
                )
            })
            .collect();

        let mut pending: Vec<&Path> = Vec::new();
        for (table, (tmp, path)) in output.tables.iter().zip(&targets) {
            pending.push(tmp);
            match write_table_csv(tmp, table) {
                Ok(bytes) => info!(
                    run_id = %output.run_id,
                    entity = %table.kind,
                    path = %path.display(),
                    bytes,
                    "table written"
                ),
                Err(err) => {
                    discard(&pending);
                    warn!(run_id = %output.run_id, error = %err, "output write failed");
                    return Err(write_error(path, err));
                }
            }
        }

        let mut renamed: Vec<&Path> = Vec::new();
        for (tmp, path) in &targets {
            if let Err(err) = std::fs::rename(tmp, path) {
                discard(&pending);
                discard(&renamed);
                return Err(GenerationError::OutputWrite {
                    path: path.display().to_string(),
                    source: err,
                });
            }
            renamed.push(path);
        }
        if let Err(source) = File::open(&self.out_dir).and_then(|dir| dir.sync_all()) {
            return Err(GenerationError::OutputWrite {
                path: self.out_dir.display().to_string(),
                source,
            });
        }

        Ok(targets.into_iter().map(|(_, path)| path).collect())
    }
}

/// Write a table as CSV with its header row; returns the file size.
pub fn write_table_csv(path: &Path, table: &GeneratedTable) -> Result<u64, csv::Error> {
    let file = File::create(path).map_err(csv::Error::from)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    writer.write_record(&table.columns)?;
    for row in table.rows() {
        writer.write_record(&row)?;
    }

    let file = writer
        .into_inner()
        .map_err(|err| err.into_error())?
        .into_inner()
        .map_err(|err| err.into_error())?;
    file.sync_all()?;
    Ok(file.metadata()?.len())
}

fn write_error(path: &Path, err: csv::Error) -> GenerationError {
    let source = match err.into_kind() {
        csv::ErrorKind::Io(source) => source,
        other => io::Error::other(format!("{other:?}")),
    };
    GenerationError::OutputWrite {
        path: path.display().to_string(),
        source,
    }
}

fn discard(paths: &[&Path]) {
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
}
