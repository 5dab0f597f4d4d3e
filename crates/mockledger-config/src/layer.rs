use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use mockledger_core::EntityKind;

use crate::errors::{Result, ValidationIssue};
use crate::model::{
    AttributeSchema, ConfigurationModel, CustomFormConfig, GroupConfig, ItemConfig,
    OptionalColumns, PaymentConfig, PaymentMethodConfig, RelationshipPolicy,
};
use crate::validate::validate_config;

/// One configuration source with every field optional.
///
/// Absent fields fall through to lower-precedence layers. Nested structures
/// are replaced whole, never merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_counts: Option<BTreeMap<EntityKind, u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<EntityKind>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_lines: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contacts: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attributes: Option<BTreeMap<EntityKind, AttributeSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_item_custom_attributes: Option<BTreeMap<EntityKind, AttributeSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional_columns: Option<OptionalColumns>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_methods: Option<PaymentMethodConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<GroupConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_forms: Option<CustomFormConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_teams: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_uuids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<ItemConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_account_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_invoice_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_policy: Option<RelationshipPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payments: Option<PaymentConfig>,
}

macro_rules! merge_fields {
    ($base:ident, $over:ident, { $($field:ident),* $(,)? }) => {
        PartialConfig {
            $($field: $over.$field.or($base.$field),)*
        }
    };
}

macro_rules! fill_fields {
    ($partial:ident, $defaults:ident, { $($field:ident),* $(,)? }) => {
        ConfigurationModel {
            $($field: $partial.$field.unwrap_or($defaults.$field),)*
            seed: $partial.seed.or($defaults.seed),
            base_date: $partial.base_date.or($defaults.base_date),
        }
    };
}

impl PartialConfig {
    /// Layer `over` on top of `base`; every field present in `over` wins.
    pub fn merge(base: PartialConfig, over: PartialConfig) -> PartialConfig {
        merge_fields!(base, over, {
            config_version,
            record_count,
            record_counts,
            entities,
            seed,
            base_date,
            default_currency,
            address_lines,
            contacts,
            custom_attributes,
            line_item_custom_attributes,
            optional_columns,
            payment_methods,
            groups,
            custom_forms,
            user_teams,
            tax_uuids,
            items,
            account_ids,
            supplier_account_ids,
            invoice_ids,
            purchase_invoice_ids,
            relationship_policy,
            payments,
        })
    }

    /// Fill absent fields from the documented defaults without validating.
    pub fn into_model(self) -> ConfigurationModel {
        let partial = self;
        let defaults = ConfigurationModel::default();
        let mut model = fill_fields!(partial, defaults, {
            config_version,
            record_count,
            record_counts,
            entities,
            default_currency,
            address_lines,
            contacts,
            custom_attributes,
            line_item_custom_attributes,
            optional_columns,
            payment_methods,
            groups,
            custom_forms,
            user_teams,
            tax_uuids,
            items,
            account_ids,
            supplier_account_ids,
            invoice_ids,
            purchase_invoice_ids,
            relationship_policy,
            payments,
        });
        expand_default_schemas(&mut model.custom_attributes);
        expand_default_schemas(&mut model.line_item_custom_attributes);
        model
    }
}

impl From<ConfigurationModel> for PartialConfig {
    fn from(model: ConfigurationModel) -> Self {
        Self {
            config_version: Some(model.config_version),
            record_count: Some(model.record_count),
            record_counts: Some(model.record_counts),
            entities: Some(model.entities),
            seed: model.seed,
            base_date: model.base_date,
            default_currency: Some(model.default_currency),
            address_lines: Some(model.address_lines),
            contacts: Some(model.contacts),
            custom_attributes: Some(model.custom_attributes),
            line_item_custom_attributes: Some(model.line_item_custom_attributes),
            optional_columns: Some(model.optional_columns),
            payment_methods: Some(model.payment_methods),
            groups: Some(model.groups),
            custom_forms: Some(model.custom_forms),
            user_teams: Some(model.user_teams),
            tax_uuids: Some(model.tax_uuids),
            items: Some(model.items),
            account_ids: Some(model.account_ids),
            supplier_account_ids: Some(model.supplier_account_ids),
            invoice_ids: Some(model.invoice_ids),
            purchase_invoice_ids: Some(model.purchase_invoice_ids),
            relationship_policy: Some(model.relationship_policy),
            payments: Some(model.payments),
        }
    }
}

fn expand_default_schemas(schemas: &mut BTreeMap<EntityKind, AttributeSchema>) {
    for schema in schemas.values_mut() {
        if schema.use_defaults {
            schema.enabled = true;
            schema.definitions = mockledger_core::default_definitions();
        }
    }
}

/// Configuration sources for one run, highest precedence first.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    pub cli: PartialConfig,
    pub file: PartialConfig,
    pub interactive: PartialConfig,
}

impl ConfigLayers {
    /// Collapse the layers: CLI > file > interactive > defaults.
    pub fn merged(&self) -> PartialConfig {
        let merged = PartialConfig::merge(self.interactive.clone(), self.file.clone());
        PartialConfig::merge(merged, self.cli.clone())
    }

    pub fn resolve(&self) -> Result<ValidatedConfig> {
        ConfigurationModel::from_layers(self)
    }
}

/// A validated configuration with non-fatal warnings.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: ConfigurationModel,
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigurationModel {
    /// Resolve a partial configuration against the defaults and validate it.
    pub fn from_partial(partial: PartialConfig) -> Result<ValidatedConfig> {
        let config = partial.into_model();
        let warnings = validate_config(&config).into_warnings()?;
        Ok(ValidatedConfig { config, warnings })
    }

    /// Resolve all layers by precedence and validate the result.
    pub fn from_layers(layers: &ConfigLayers) -> Result<ValidatedConfig> {
        Self::from_partial(layers.merged())
    }

    /// Apply an override layer on top of a resolved configuration.
    pub fn merge(base: &ConfigurationModel, over: PartialConfig) -> Result<ValidatedConfig> {
        Self::from_partial(PartialConfig::merge(
            PartialConfig::from(base.clone()),
            over,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_beats_file_beats_interactive() {
        let layers = ConfigLayers {
            cli: PartialConfig {
                record_count: Some(10),
                ..PartialConfig::default()
            },
            file: PartialConfig {
                record_count: Some(20),
                contacts: Some(3),
                ..PartialConfig::default()
            },
            interactive: PartialConfig {
                record_count: Some(30),
                contacts: Some(4),
                address_lines: Some(2),
                ..PartialConfig::default()
            },
        };

        let config = ConfigurationModel::from_layers(&layers)
            .expect("valid layers")
            .config;
        assert_eq!(config.record_count, 10);
        assert_eq!(config.contacts, 3);
        assert_eq!(config.address_lines, 2);
        assert_eq!(config.default_currency, "AUD");
    }

    #[test]
    fn nested_structures_are_replaced_whole() {
        let base = PartialConfig {
            items: Some(ItemConfig {
                system_item_ids: vec!["ITEM-1".to_string()],
                max_items_per_document: 9,
                ..ItemConfig::default()
            }),
            ..PartialConfig::default()
        };
        let over = PartialConfig {
            items: Some(ItemConfig {
                max_items_per_document: 2,
                ..ItemConfig::default()
            }),
            ..PartialConfig::default()
        };

        let merged = PartialConfig::merge(base, over);
        let items = merged.items.expect("items present");
        assert_eq!(items.max_items_per_document, 2);
        assert!(items.system_item_ids.is_empty());
    }

    #[test]
    fn use_defaults_expands_demo_set() {
        let mut schemas = BTreeMap::new();
        schemas.insert(
            EntityKind::Account,
            AttributeSchema {
                enabled: true,
                use_defaults: true,
                definitions: Vec::new(),
            },
        );
        let partial = PartialConfig {
            custom_attributes: Some(schemas),
            ..PartialConfig::default()
        };

        let config = ConfigurationModel::from_partial(partial)
            .expect("valid config")
            .config;
        assert_eq!(config.header_attributes(EntityKind::Account).len(), 10);
    }

    #[test]
    fn merge_over_resolved_model_keeps_base_fields() {
        let base = ConfigurationModel {
            contacts: 4,
            ..ConfigurationModel::default()
        };
        let over = PartialConfig {
            record_count: Some(3),
            ..PartialConfig::default()
        };

        let merged = ConfigurationModel::merge(&base, over)
            .expect("valid merge")
            .config;
        assert_eq!(merged.contacts, 4);
        assert_eq!(merged.record_count, 3);
    }
}
