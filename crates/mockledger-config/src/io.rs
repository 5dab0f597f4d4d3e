use std::collections::BTreeSet;
use std::fs::{File, create_dir_all};
use std::io::{self, Write};
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use mockledger_core::AttributeType;

use crate::errors::{ConfigError, Result, ValidationIssue};
use crate::layer::{PartialConfig, ValidatedConfig};
use crate::model::ConfigurationModel;
use crate::schema::config_json_schema;
use crate::validate::validate_config_json;

/// A configuration layer read from disk with the fields that were dropped.
#[derive(Debug, Clone, Default)]
pub struct LoadedLayer {
    pub layer: PartialConfig,
    pub warnings: Vec<ValidationIssue>,
}

/// Read a configuration file into a partial layer.
///
/// Malformed JSON yields an empty layer. Top-level fields that fail the JSON
/// Schema or cannot be decoded are dropped with a warning so the next layer
/// or the default applies. I/O failures and unknown attribute types abort.
pub fn load_partial(path: &Path) -> Result<LoadedLayer> {
    let contents = std::fs::read_to_string(path)?;
    parse_partial(&contents)
}

/// Parse configuration JSON text into a partial layer; see [`load_partial`].
pub fn parse_partial(contents: &str) -> Result<LoadedLayer> {
    let mut loaded = LoadedLayer::default();

    let value: Value = match serde_json::from_str(contents) {
        Ok(value) => value,
        Err(err) => {
            loaded.warnings.push(ValidationIssue::new(
                "malformed_json",
                "/",
                format!("configuration is not valid JSON ({err}); using defaults"),
            ));
            return Ok(loaded);
        }
    };
    let Value::Object(mut fields) = value else {
        loaded.warnings.push(ValidationIssue::new(
            "malformed_json",
            "/",
            "configuration root must be a JSON object; using defaults",
        ));
        return Ok(loaded);
    };

    normalize_attribute_types(&mut fields)?;
    drop_schema_violations(&mut fields, &mut loaded.warnings)?;

    loaded.layer = match serde_json::from_value(Value::Object(fields.clone())) {
        Ok(layer) => layer,
        Err(_) => decode_field_by_field(fields, &mut loaded.warnings),
    };
    Ok(loaded)
}

fn normalize_attribute_types(fields: &mut Map<String, Value>) -> Result<()> {
    for scope in ["custom_attributes", "line_item_custom_attributes"] {
        let Some(Value::Object(schemas)) = fields.get_mut(scope) else {
            continue;
        };
        for schema in schemas.values_mut() {
            let Some(Value::Array(definitions)) = schema.get_mut("definitions") else {
                continue;
            };
            for definition in definitions {
                if let Some(Value::String(name)) = definition.get_mut("type") {
                    let attr_type = AttributeType::from_str(name)?;
                    *name = attr_type.as_str().to_string();
                }
            }
        }
    }
    Ok(())
}

fn drop_schema_violations(
    fields: &mut Map<String, Value>,
    warnings: &mut Vec<ValidationIssue>,
) -> Result<()> {
    let schema = serde_json::to_value(config_json_schema())?;
    let report = validate_config_json(&Value::Object(fields.clone()), &schema)?;

    let mut rejected = BTreeSet::new();
    for issue in report.errors {
        let Some(key) = issue.field() else {
            continue;
        };
        if rejected.insert(key.clone()) {
            warnings.push(ValidationIssue::new(
                "field_dropped",
                issue.path,
                format!("ignoring '{key}': {}", issue.message),
            ));
        }
    }
    for key in rejected {
        fields.remove(&key);
    }
    Ok(())
}

fn decode_field_by_field(
    fields: Map<String, Value>,
    warnings: &mut Vec<ValidationIssue>,
) -> PartialConfig {
    let mut layer = PartialConfig::default();
    for (key, value) in fields {
        let mut single = Map::new();
        single.insert(key.clone(), value);
        match serde_json::from_value::<PartialConfig>(Value::Object(single)) {
            Ok(field) => layer = PartialConfig::merge(layer, field),
            Err(err) => warnings.push(ValidationIssue::new(
                "field_dropped",
                format!("/{key}"),
                format!("ignoring '{key}': {err}"),
            )),
        }
    }
    layer
}

impl ConfigurationModel {
    /// Load a configuration file and resolve it against the defaults.
    ///
    /// Degradation warnings from the load are returned with the
    /// validation warnings.
    pub fn from_file(path: &Path) -> Result<ValidatedConfig> {
        let loaded = load_partial(path)?;
        let mut validated = ConfigurationModel::from_partial(loaded.layer)?;
        let mut warnings = loaded.warnings;
        warnings.append(&mut validated.warnings);
        validated.warnings = warnings;
        Ok(validated)
    }

    /// Persist the configuration as pretty JSON, replacing `path` atomically.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)
    }
}

/// Serialise `value` as pretty JSON and swap it into place at `path`.
///
/// Readers see either the previous file or the complete new one. The JSON is
/// staged beside the target under a per-process name and removed if
/// anything fails before the rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(value)?;
    json.push(b'\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Some(name) = path.file_name() else {
        return Err(ConfigError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' does not name a file", path.display()),
        )));
    };
    create_dir_all(dir)?;
    let staged = dir.join(format!(
        ".{}.{}.partial",
        name.to_string_lossy(),
        std::process::id()
    ));

    let swapped = File::create(&staged)
        .and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        })
        .and_then(|()| std::fs::rename(&staged, path));
    if let Err(err) = swapped {
        let _ = std::fs::remove_file(&staged);
        return Err(err.into());
    }
    File::open(dir)?.sync_all()?;
    Ok(())
}
