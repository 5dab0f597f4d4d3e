use thiserror::Error;

use mockledger_config::{ConfigError, ValidationReport};
use mockledger_core::EntityKind;

use crate::linker::Relation;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid configuration: {0}")]
    Validation(ValidationReport),
    #[error("missing required reference: {entity} needs a {relation} but the pool is empty")]
    UnresolvedReference {
        entity: EntityKind,
        relation: Relation,
    },
    #[error(transparent)]
    UnknownAttributeType(#[from] mockledger_core::Error),
    #[error("output write failed for {path}: {source}")]
    OutputWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("generation cancelled")]
    Cancelled,
}

impl From<ConfigError> for GenerationError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation(report) => GenerationError::Validation(report),
            ConfigError::Catalog(err) => GenerationError::UnknownAttributeType(err),
            ConfigError::Io(err) => GenerationError::Io(err),
            ConfigError::Json(err) => GenerationError::Json(err),
            ConfigError::Schema(message) => GenerationError::InvalidConfig(message),
        }
    }
}
