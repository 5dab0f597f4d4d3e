use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::layer::PartialConfig;

/// Emit the JSON Schema for configuration files.
///
/// Every field is optional; absent fields take the next layer or default.
pub fn config_json_schema() -> RootSchema {
    schema_for!(PartialConfig)
}
