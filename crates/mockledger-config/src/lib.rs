//! Configuration model, layered precedence and validation for mockledger runs.

pub mod errors;
pub mod io;
pub mod layer;
pub mod model;
pub mod schema;
pub mod validate;

pub use errors::{ConfigError, Result, ValidationIssue, ValidationReport};
pub use io::{LoadedLayer, load_partial, parse_partial, write_json_atomic};
pub use layer::{ConfigLayers, PartialConfig, ValidatedConfig};
pub use model::{
    AttributeSchema, ConfigurationModel, CustomFormConfig, DEFAULT_CURRENCY,
    DEFAULT_DISCOUNT_PROBABILITY, DEFAULT_MAX_ITEMS_PER_DOCUMENT, DEFAULT_RECORD_COUNT,
    GroupConfig, ItemConfig, MAX_SUB_RECORDS, OptionalColumns, PaymentConfig,
    PaymentMethodConfig, RelationshipPolicy, parse_id_list,
};
pub use schema::config_json_schema;
pub use validate::{DATE_FORMAT, parse_date, validate_config, validate_config_json};
