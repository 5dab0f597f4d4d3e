use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use chrono::{Local, NaiveDate};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use mockledger_config::{ConfigurationModel, parse_date};
use mockledger_core::EntityKind;

use crate::attributes::{AttributeContext, AttributeTypeRegistry};
use crate::entities::common::{attribute_columns, materialize_attributes};
use crate::entities::{RecordContext, generator_for};
use crate::errors::GenerationError;
use crate::ids::IdAllocator;
use crate::linker::ReferencePools;
use crate::model::{RunOutput, RunReport, TableReport};
use crate::output::OutputSink;
use crate::table::GeneratedTable;

/// Upper bound on records preallocated for one table.
const PREALLOCATED_RECORDS: u64 = 65_536;

/// Cooperative cancellation, checked between records.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Entry point for generating entity tables from a configuration.
#[derive(Debug, Default)]
pub struct GenerationEngine {
    registry: AttributeTypeRegistry,
    cancel: CancelFlag,
}

impl GenerationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: AttributeTypeRegistry) -> Self {
        Self {
            registry,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &AttributeTypeRegistry {
        &self.registry
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Generate exactly `count` records of `kind`.
    ///
    /// References are drawn from `pools`; identifiers come from `ids`, which
    /// keeps advancing across calls within a run.
    pub fn generate(
        &self,
        kind: EntityKind,
        count: u64,
        config: &ConfigurationModel,
        pools: &ReferencePools,
        ids: &mut IdAllocator,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedTable, GenerationError> {
        let attributes = AttributeContext {
            base_date: resolve_base_date(config)?,
        };
        let mut generator = generator_for(kind, config, pools, count, rng)?;

        let header_definitions = config.header_attributes(kind);
        let mut columns = generator.columns(config);
        columns.extend(attribute_columns(header_definitions, kind.attribute_prefix()));
        if let Some(prefix) = kind.line_item_attribute_prefix() {
            columns.extend(attribute_columns(config.line_item_attributes(kind), prefix));
        }

        let mut table = GeneratedTable::new(kind, columns);
        table.retained = generator.retained_columns();
        table.fan_out = generator.fan_out();
        table.records.reserve(count.min(PREALLOCATED_RECORDS) as usize);

        for index in 0..count {
            if self.cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            let references = generator.resolve_references(config, rng);
            let mut ctx = RecordContext {
                config,
                registry: &self.registry,
                attributes,
                pools,
                ids: &mut *ids,
                index,
            };
            let mut record = generator.generate_record(&mut ctx, references, rng)?;
            record.custom_attributes = materialize_attributes(
                &self.registry,
                header_definitions,
                kind.attribute_prefix(),
                &attributes,
                rng,
            )?;
            table.records.push(record);
        }
        Ok(table)
    }

    /// Validate `config` and generate every configured kind in dependency
    /// order, feeding each table into the pools of later kinds.
    pub fn generate_all(&self, config: &ConfigurationModel) -> Result<RunOutput, GenerationError> {
        let report = config.validate();
        if !report.is_ok() {
            return Err(GenerationError::Validation(report));
        }
        for kind in config.ordered_entities() {
            self.registry
                .check_definitions(config.header_attributes(kind))?;
            self.registry
                .check_definitions(config.line_item_attributes(kind))?;
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Local::now();
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let base_date = resolve_base_date(config)?;
        let mut resolved = config.clone();
        resolved.seed = Some(seed);
        resolved.base_date = Some(base_date.format("%Y-%m-%d").to_string());

        let entities = resolved.ordered_entities();
        info!(
            run_id = %run_id,
            seed,
            base_date = %base_date,
            entities = entities.len(),
            "generation started"
        );

        let mut ids = IdAllocator::new();
        let mut pools = ReferencePools::from_config(&resolved);
        let mut tables = Vec::with_capacity(entities.len());
        for kind in entities {
            let entity_start = Instant::now();
            let mut rng = ChaCha8Rng::seed_from_u64(hash_seed(seed, kind.as_str()));
            let count = resolved.count_for(kind);
            let table = self.generate(kind, count, &resolved, &pools, &mut ids, &mut rng)?;
            pools.ingest(&table);
            info!(
                run_id = %run_id,
                entity = %kind,
                rows = table.record_count() as u64,
                duration_ms = entity_start.elapsed().as_millis() as u64,
                "entity generated"
            );
            tables.push(table);
        }

        Ok(RunOutput {
            run_id,
            seed,
            base_date,
            started_at,
            tables,
        })
    }

    /// Generate and hand every table to `sink`. Nothing reaches the sink
    /// unless all kinds were generated.
    pub fn run<S>(&self, config: &ConfigurationModel, sink: &S) -> Result<RunReport, GenerationError>
    where
        S: OutputSink + ?Sized,
    {
        let start = Instant::now();
        let output = match self.generate_all(config) {
            Ok(output) => output,
            Err(err) => {
                warn!(error = %err, "generation failed");
                return Err(err);
            }
        };
        if self.cancel.is_cancelled() {
            warn!(run_id = %output.run_id, "generation cancelled before output");
            return Err(GenerationError::Cancelled);
        }

        let files = match sink.write_run(&output) {
            Ok(files) => files,
            Err(err) => {
                warn!(run_id = %output.run_id, error = %err, "generation failed");
                return Err(err);
            }
        };

        let report = RunReport {
            run_id: output.run_id.clone(),
            seed: output.seed,
            base_date: output.base_date.format("%Y-%m-%d").to_string(),
            tables: output.tables.iter().map(TableReport::from_table).collect(),
            files,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            run_id = %report.run_id,
            tables = report.tables.len(),
            files = report.files.len(),
            duration_ms = report.duration_ms,
            "generation completed"
        );
        Ok(report)
    }
}

/// Configured base date, or today.
pub fn resolve_base_date(config: &ConfigurationModel) -> Result<NaiveDate, GenerationError> {
    match config.base_date.as_deref() {
        Some(raw) => parse_date(raw).ok_or_else(|| {
            GenerationError::InvalidConfig(format!("base_date '{raw}' is not a YYYY-MM-DD date"))
        }),
        None => Ok(Local::now().date_naive()),
    }
}

/// FNV-1a over `key`, starting from `seed`.
pub fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_seeds_are_independent_and_stable() {
        let account = hash_seed(42, "account");
        assert_eq!(account, hash_seed(42, "account"));
        assert_ne!(account, hash_seed(42, "invoice"));
        assert_ne!(account, hash_seed(43, "account"));
    }

    #[test]
    fn cancelled_engine_stops_before_the_first_record() {
        let cancel = CancelFlag::new();
        let engine = GenerationEngine::new().with_cancel_flag(cancel.clone());
        cancel.cancel();
        let config = ConfigurationModel {
            record_count: 3,
            seed: Some(1),
            ..ConfigurationModel::default()
        };
        let err = engine.generate_all(&config).expect_err("cancelled");
        assert!(matches!(err, GenerationError::Cancelled));
    }

    #[test]
    fn huge_counts_do_not_preallocate_the_whole_table() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let engine = GenerationEngine::new().with_cancel_flag(cancel);
        let config = ConfigurationModel::default();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let err = engine
            .generate(
                EntityKind::Account,
                u64::MAX,
                &config,
                &ReferencePools::from_config(&config),
                &mut IdAllocator::new(),
                &mut rng,
            )
            .expect_err("cancelled before the first record");
        assert!(matches!(err, GenerationError::Cancelled));
    }
}
