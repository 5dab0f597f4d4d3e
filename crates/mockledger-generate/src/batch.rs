use std::collections::HashSet;
use std::time::Instant;

use rand::Rng;
use tracing::{info, warn};

use mockledger_config::ConfigurationModel;

use crate::engine::{GenerationEngine, hash_seed};
use crate::model::{BatchReport, CountOutcome};
use crate::output::OutputSink;

pub const DEFAULT_BATCH_COUNTS: [u64; 4] = [200, 300, 400, 500];

/// Runs the whole pipeline once per requested record count.
///
/// Each count gets its own seed and identifier namespace; a failing count
/// is recorded and the remaining counts still run. Repeated counts run once,
/// since their output files would share a name.
#[derive(Debug, Default)]
pub struct BatchController {
    engine: GenerationEngine,
    parallel: bool,
}

impl BatchController {
    pub fn new(engine: GenerationEngine) -> Self {
        Self {
            engine,
            parallel: false,
        }
    }

    /// Run counts on scoped threads instead of one after another.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn engine(&self) -> &GenerationEngine {
        &self.engine
    }

    pub fn run_batch<S>(
        &self,
        counts: &[u64],
        config: &ConfigurationModel,
        sink: &S,
    ) -> BatchReport
    where
        S: OutputSink + Sync + ?Sized,
    {
        let start = Instant::now();
        let requested = counts.len();
        let batch_id = uuid::Uuid::new_v4().to_string();
        let base_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut seen = HashSet::new();
        let counts: Vec<u64> = counts
            .iter()
            .copied()
            .filter(|count| seen.insert(*count))
            .collect();
        if seen.len() < requested {
            warn!(
                batch_id = %batch_id,
                skipped = requested - seen.len(),
                "duplicate batch counts skipped"
            );
        }
        info!(
            batch_id = %batch_id,
            counts = ?counts,
            parallel = self.parallel,
            "batch started"
        );

        let configs: Vec<(u64, ConfigurationModel)> = counts
            .iter()
            .map(|&count| {
                let mut run_config = config.with_record_count(count);
                run_config.seed = Some(hash_seed(base_seed, &format!("batch-{count}")));
                (count, run_config)
            })
            .collect();

        let outcomes = if self.parallel {
            std::thread::scope(|scope| {
                let handles: Vec<_> = configs
                    .iter()
                    .map(|(count, run_config)| {
                        scope.spawn(move || self.run_count(*count, run_config, sink))
                    })
                    .collect();
                handles
                    .into_iter()
                    .zip(&configs)
                    .map(|(handle, (count, _))| {
                        handle.join().unwrap_or_else(|_| CountOutcome::Failed {
                            count: *count,
                            error: "generation thread panicked".to_string(),
                        })
                    })
                    .collect()
            })
        } else {
            configs
                .iter()
                .map(|(count, run_config)| self.run_count(*count, run_config, sink))
                .collect()
        };

        let report = BatchReport {
            batch_id,
            outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            batch_id = %report.batch_id,
            succeeded = report.succeeded(),
            failed = report.failed(),
            duration_ms = report.duration_ms,
            "batch completed"
        );
        report
    }

    fn run_count<S>(&self, count: u64, config: &ConfigurationModel, sink: &S) -> CountOutcome
    where
        S: OutputSink + ?Sized,
    {
        match self.engine.run(config, sink) {
            Ok(report) => CountOutcome::Succeeded { count, report },
            Err(err) => {
                warn!(count, error = %err, "batch count failed");
                CountOutcome::Failed {
                    count,
                    error: err.to_string(),
                }
            }
        }
    }
}
