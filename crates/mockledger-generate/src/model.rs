use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use mockledger_core::EntityKind;

use crate::table::GeneratedTable;

/// Everything one run produced, before it reaches a sink.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: String,
    pub seed: u64,
    pub base_date: NaiveDate,
    pub started_at: DateTime<Local>,
    /// Tables in dependency order.
    pub tables: Vec<GeneratedTable>,
}

impl RunOutput {
    pub fn table(&self, kind: EntityKind) -> Option<&GeneratedTable> {
        self.tables.iter().find(|table| table.kind == kind)
    }
}

/// Summary of a generated table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableReport {
    pub entity: EntityKind,
    pub records: u64,
    /// Flat output rows after line-item and multi-invoice expansion.
    pub rows: u64,
    pub columns: u64,
}

impl TableReport {
    pub fn from_table(table: &GeneratedTable) -> Self {
        Self {
            entity: table.kind,
            records: table.record_count() as u64,
            rows: table.rows().len() as u64,
            columns: table.columns.len() as u64,
        }
    }
}

/// Report for a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub seed: u64,
    pub base_date: String,
    pub tables: Vec<TableReport>,
    pub files: Vec<PathBuf>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn records_for(&self, kind: EntityKind) -> Option<u64> {
        self.tables
            .iter()
            .find(|table| table.entity == kind)
            .map(|table| table.records)
    }
}

/// Result of one count in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CountOutcome {
    Succeeded { count: u64, report: RunReport },
    Failed { count: u64, error: String },
}

impl CountOutcome {
    pub fn count(&self) -> u64 {
        match self {
            CountOutcome::Succeeded { count, .. } | CountOutcome::Failed { count, .. } => *count,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CountOutcome::Succeeded { .. })
    }
}

/// Report for a batch: one outcome per requested count, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub outcomes: Vec<CountOutcome>,
    pub duration_ms: u64,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}
