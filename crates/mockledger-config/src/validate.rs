use std::collections::HashSet;

use chrono::NaiveDate;
use jsonschema::JSONSchema;
use serde_json::Value;

use mockledger_core::{CustomAttributeDefinition, EntityKind};

use crate::errors::{ConfigError, ValidationReport};
use crate::model::{AttributeSchema, ConfigurationModel, MAX_SUB_RECORDS};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validate a configuration JSON document against the configuration JSON Schema.
pub fn validate_config_json(
    config_json: &Value,
    config_schema: &Value,
) -> Result<ValidationReport, ConfigError> {
    let compiled =
        JSONSchema::compile(config_schema).map_err(|err| ConfigError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(config_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.reject("schema_violation", path, error.to_string());
        }
    }

    Ok(report)
}

impl ConfigurationModel {
    pub fn validate(&self) -> ValidationReport {
        validate_config(self)
    }
}

/// Semantic checks over a fully-resolved configuration.
pub fn validate_config(config: &ConfigurationModel) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_counts(config, &mut report);
    validate_sub_records(config, &mut report);
    validate_base_date(config, &mut report);
    validate_attribute_schemas(config, &mut report);
    validate_optional_columns(config, &mut report);
    validate_items(config, &mut report);
    validate_references(config, &mut report);
    validate_payments(config, &mut report);

    report
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

fn validate_counts(config: &ConfigurationModel, report: &mut ValidationReport) {
    if config.record_count == 0 {
        report
            .reject("record_count_zero", "/record_count", "record_count must be greater than zero")
            .hint("set record_count to a positive integer");
    }
    for (kind, count) in &config.record_counts {
        if *count == 0 {
            report.reject(
                "record_count_zero",
                format!("/record_counts/{kind}"),
                format!("record count for {kind} must be greater than zero"),
            );
        }
        if !config.generates(*kind) {
            report.warn(
                "record_count_unused",
                format!("/record_counts/{kind}"),
                format!("{kind} is not in entities; its record count is ignored"),
            );
        }
    }
    if config.entities.is_empty() {
        report
            .reject("entities_empty", "/entities", "at least one entity kind must be generated")
            .hint("add \"account\" to entities");
    }
}

fn validate_sub_records(config: &ConfigurationModel, report: &mut ValidationReport) {
    let bounds = 1..=MAX_SUB_RECORDS;
    if !bounds.contains(&config.address_lines) {
        report.reject(
            "address_lines_out_of_range",
            "/address_lines",
            format!(
                "address_lines must be within [1, {MAX_SUB_RECORDS}], got {}",
                config.address_lines
            ),
        );
    }
    if !bounds.contains(&config.contacts) {
        report.reject(
            "contacts_out_of_range",
            "/contacts",
            format!("contacts must be within [1, {MAX_SUB_RECORDS}], got {}", config.contacts),
        );
    }
    if config.default_currency.trim().is_empty() {
        report.reject("currency_empty", "/default_currency", "default_currency must not be empty");
    }
}

fn validate_base_date(config: &ConfigurationModel, report: &mut ValidationReport) {
    if let Some(raw) = &config.base_date {
        if parse_date(raw).is_none() {
            report.reject(
                "invalid_base_date",
                "/base_date",
                format!("base_date '{raw}' is not a YYYY-MM-DD date"),
            );
        }
    }
}

fn validate_attribute_schemas(config: &ConfigurationModel, report: &mut ValidationReport) {
    for (kind, schema) in &config.custom_attributes {
        let base_path = format!("/custom_attributes/{kind}");
        validate_schema(*kind, schema, kind.attribute_prefix(), &base_path, config, report);
    }

    for (kind, schema) in &config.line_item_custom_attributes {
        let base_path = format!("/line_item_custom_attributes/{kind}");
        match kind.line_item_attribute_prefix() {
            Some(prefix) => validate_schema(*kind, schema, prefix, &base_path, config, report),
            None => {
                if !schema.definitions.is_empty() || schema.enabled {
                    report
                        .reject(
                            "line_items_unsupported",
                            base_path,
                            format!("{kind} records have no line items"),
                        )
                        .hint("move these definitions to custom_attributes");
                }
            }
        }
    }
}

fn validate_schema(
    kind: EntityKind,
    schema: &AttributeSchema,
    prefix: &str,
    base_path: &str,
    config: &ConfigurationModel,
    report: &mut ValidationReport,
) {
    if schema.enabled && !schema.use_defaults && schema.definitions.is_empty() {
        report
            .reject(
                "attributes_required",
                format!("{base_path}/definitions"),
                "enabled custom attribute schema needs at least one definition",
            )
            .hint("add definitions or set use_defaults");
    }
    if !schema.definitions.is_empty() && !config.generates(kind) {
        report.warn(
            "attributes_unused",
            base_path,
            format!("{kind} is not generated; its custom attributes are ignored"),
        );
    }

    let mut columns = HashSet::new();
    for (idx, definition) in schema.definitions.iter().enumerate() {
        let path = format!("{base_path}/definitions/{idx}");
        validate_definition(definition, &path, report);

        let column = definition.column_name(prefix);
        if !columns.insert(column.clone()) {
            report
                .reject(
                    "duplicate_column",
                    format!("{path}/name"),
                    format!("column '{column}' is defined more than once"),
                )
                .hint("give each custom attribute a distinct name");
        }
    }
}

fn validate_definition(
    definition: &CustomAttributeDefinition,
    path: &str,
    report: &mut ValidationReport,
) {
    if definition.name.is_empty() {
        report.reject(
            "attribute_name_empty",
            format!("{path}/name"),
            "custom attribute name must not be empty",
        );
    }

    if definition.attr_type.is_choice() && definition.options.is_empty() {
        report.reject(
            "options_required",
            format!("{path}/options"),
            format!(
                "{} attribute '{}' needs a non-empty options list",
                definition.attr_type, definition.name
            ),
        );
    }
    let unique: HashSet<&String> = definition.options.iter().collect();
    if unique.len() != definition.options.len() {
        report.reject(
            "duplicate_option",
            format!("{path}/options"),
            format!("attribute '{}' lists an option twice", definition.name),
        );
    }

    let (min, max) = definition.quantity_range();
    if min > max {
        report.reject(
            "quantity_range_inverted",
            format!("{path}/quantity_min"),
            format!("quantity_min {min} is greater than quantity_max {max}"),
        );
    }

    let date_min = definition.date_min.as_deref().map(|raw| (raw, parse_date(raw)));
    let date_max = definition.date_max.as_deref().map(|raw| (raw, parse_date(raw)));
    for (field, bound) in [("date_min", date_min), ("date_max", date_max)] {
        if let Some((raw, None)) = bound {
            report.reject(
                "invalid_date",
                format!("{path}/{field}"),
                format!("'{raw}' is not a YYYY-MM-DD date"),
            );
        }
    }
    if let (Some((_, Some(low))), Some((_, Some(high)))) = (date_min, date_max) {
        if low > high {
            report.reject(
                "date_range_inverted",
                format!("{path}/date_min"),
                format!("date_min {low} is after date_max {high}"),
            );
        }
    }

    if definition.constant && definition.value.is_none() {
        report.reject(
            "constant_value_missing",
            format!("{path}/value"),
            format!("constant attribute '{}' has no value", definition.name),
        );
    }
}

fn validate_optional_columns(config: &ConfigurationModel, report: &mut ValidationReport) {
    let toggles = &config.optional_columns;
    let required = [
        (toggles.tax, config.tax_uuids.is_empty(), "tax", "/tax_uuids"),
        (
            toggles.group,
            config.groups.names.is_empty(),
            "group",
            "/groups/names",
        ),
        (
            toggles.custom_form,
            config.custom_forms.names.is_empty(),
            "custom_form",
            "/custom_forms/names",
        ),
        (
            toggles.user_team,
            config.user_teams.is_empty(),
            "user_team",
            "/user_teams",
        ),
    ];
    for (enabled, missing, toggle, path) in required {
        if enabled && missing {
            report
                .reject(
                    "toggle_list_empty",
                    path,
                    format!("optional column '{toggle}' is enabled but {path} is empty"),
                )
                .hint(format!("provide values for {path} or disable the toggle"));
        }
    }

    if !(0.0..=100.0).contains(&config.custom_forms.assign_percent) {
        report.reject(
            "percent_out_of_range",
            "/custom_forms/assign_percent",
            "assign_percent must be within [0, 100]",
        );
    }
}

fn validate_items(config: &ConfigurationModel, report: &mut ValidationReport) {
    let items = &config.items;
    if items.max_items_per_document == 0 {
        report.reject(
            "max_items_zero",
            "/items/max_items_per_document",
            "max_items_per_document must be at least 1",
        );
    }
    if !(0.0..=1.0).contains(&items.discount_probability) {
        report.reject(
            "probability_out_of_range",
            "/items/discount_probability",
            "discount_probability must be within [0, 1]",
        );
    }

    let documents = config
        .ordered_entities()
        .into_iter()
        .any(EntityKind::has_line_items);
    if documents && items.mode.includes_system_items() && items.system_item_ids.is_empty() {
        let message = if items.mode.includes_line_items() {
            "item mode 'both' draws system items but system_item_ids is empty"
        } else {
            "item mode 'system_only' requires system_item_ids"
        };
        report
            .reject("system_items_required", "/items/system_item_ids", message)
            .hint("supply system item ids or switch items.mode to line_only");
    }
}

fn validate_references(config: &ConfigurationModel, report: &mut ValidationReport) {
    let accounts_generated = config.generates(EntityKind::Account);
    for kind in config.ordered_entities() {
        let (missing, path, hint) = match kind {
            EntityKind::Account => continue,
            EntityKind::Order | EntityKind::Invoice => (
                !accounts_generated && config.account_ids.is_empty(),
                "/account_ids",
                "generate accounts in the same run or supply account_ids",
            ),
            EntityKind::PurchaseOrder | EntityKind::PurchaseInvoice => (
                !accounts_generated && config.supplier_account_ids.is_empty(),
                "/supplier_account_ids",
                "generate accounts in the same run or supply supplier_account_ids",
            ),
            EntityKind::Payment => (
                !config.generates(EntityKind::Invoice) && config.invoice_ids.is_empty(),
                "/invoice_ids",
                "generate invoices in the same run or supply invoice_ids",
            ),
            EntityKind::PurchasePayment => (
                !config.generates(EntityKind::PurchaseInvoice)
                    && config.purchase_invoice_ids.is_empty(),
                "/purchase_invoice_ids",
                "generate purchase invoices in the same run or supply purchase_invoice_ids",
            ),
        };
        if missing {
            report
                .reject(
                    "reference_pool_empty",
                    path,
                    format!("{kind} records need parent ids but none can be resolved"),
                )
                .hint(hint);
        }
    }

    if let crate::model::RelationshipPolicy::Weighted { skew } = config.relationship_policy {
        if !skew.is_finite() || skew < 0.0 {
            report.reject(
                "invalid_skew",
                "/relationship_policy/skew",
                format!("weighted skew must be a non-negative number, got {skew}"),
            );
        }
    }
}

fn validate_payments(config: &ConfigurationModel, report: &mut ValidationReport) {
    if !config.entities.iter().any(|kind| kind.is_payment()) {
        return;
    }
    let payments = &config.payments;
    if payments.min_amount < 0.0 || payments.min_amount > payments.max_amount {
        report.reject(
            "payment_range_invalid",
            "/payments/min_amount",
            format!(
                "payment amount range [{}, {}] is not ordered",
                payments.min_amount, payments.max_amount
            ),
        );
    }
    if payments.processors.is_empty() {
        report.reject(
            "payment_processors_empty",
            "/payments/processors",
            "at least one payment processor is required",
        );
    }
}

fn normalized_json_pointer(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use mockledger_core::{AttributeType, ItemMode};

    use super::*;
    use crate::model::{AttributeSchema, ItemConfig};

    fn codes(report: &ValidationReport) -> Vec<&str> {
        report.errors.iter().map(|issue| issue.code.as_str()).collect()
    }

    #[test]
    fn default_configuration_is_valid() {
        let report = ConfigurationModel::default().validate();
        assert!(report.is_ok(), "unexpected errors: {report}");
    }

    #[test]
    fn rejects_out_of_range_cardinalities() {
        let config = ConfigurationModel {
            record_count: 0,
            address_lines: 6,
            contacts: 0,
            ..ConfigurationModel::default()
        };
        let report = config.validate();
        assert_eq!(
            codes(&report),
            vec![
                "record_count_zero",
                "address_lines_out_of_range",
                "contacts_out_of_range"
            ]
        );
    }

    #[test]
    fn choice_types_need_options() {
        let mut config = ConfigurationModel::default();
        config.custom_attributes.insert(
            EntityKind::Account,
            AttributeSchema::with_definitions(vec![CustomAttributeDefinition::new(
                "size",
                AttributeType::Dropdown,
            )]),
        );
        assert!(config.validate().has_code("options_required"));
    }

    #[test]
    fn rejects_duplicate_columns_and_inverted_ranges() {
        let mut config = ConfigurationModel::default();
        config.custom_attributes.insert(
            EntityKind::Account,
            AttributeSchema::with_definitions(vec![
                CustomAttributeDefinition::new("qty", AttributeType::Quantity)
                    .with_quantity_range(9, 3),
                CustomAttributeDefinition::new("QTY", AttributeType::Number),
            ]),
        );
        let report = config.validate();
        assert!(report.has_code("quantity_range_inverted"));
        assert!(report.has_code("duplicate_column"));
    }

    #[test]
    fn system_items_required_for_documents() {
        let config = ConfigurationModel {
            entities: vec![EntityKind::Account, EntityKind::Order],
            items: ItemConfig {
                mode: ItemMode::SystemOnly,
                ..ItemConfig::default()
            },
            ..ConfigurationModel::default()
        };
        assert!(config.validate().has_code("system_items_required"));

        let line_only = ConfigurationModel {
            items: ItemConfig {
                mode: ItemMode::LineOnly,
                ..ItemConfig::default()
            },
            ..config
        };
        assert!(line_only.validate().is_ok());
    }

    #[test]
    fn purchase_invoices_need_a_supplier_source() {
        let config = ConfigurationModel {
            entities: vec![EntityKind::PurchaseInvoice],
            items: ItemConfig {
                mode: ItemMode::LineOnly,
                ..ItemConfig::default()
            },
            ..ConfigurationModel::default()
        };
        assert!(config.validate().has_code("reference_pool_empty"));

        let external = ConfigurationModel {
            supplier_account_ids: vec!["SUP-1".to_string()],
            ..config
        };
        assert!(external.validate().is_ok());
    }

    #[test]
    fn purchase_payments_need_purchase_invoices() {
        let config = ConfigurationModel {
            entities: vec![EntityKind::PurchasePayment],
            invoice_ids: vec!["INV-1".to_string()],
            ..ConfigurationModel::default()
        };
        let report = config.validate();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "/purchase_invoice_ids");

        let external = ConfigurationModel {
            purchase_invoice_ids: vec!["PINV-1".to_string()],
            ..config
        };
        assert!(external.validate().is_ok());
    }

    #[test]
    fn purchase_payments_check_the_amount_range() {
        let mut config = ConfigurationModel {
            entities: vec![EntityKind::PurchasePayment],
            purchase_invoice_ids: vec!["PINV-1".to_string()],
            ..ConfigurationModel::default()
        };
        config.payments.min_amount = 500.0;
        config.payments.max_amount = 10.0;
        assert!(config.validate().has_code("payment_range_invalid"));
    }

    #[test]
    fn toggles_need_their_lists() {
        let mut config = ConfigurationModel::default();
        config.optional_columns.tax = true;
        config.optional_columns.user_team = true;
        let report = config.validate();
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().all(|i| i.code == "toggle_list_empty"));
    }

    #[test]
    fn line_item_schema_on_account_is_rejected() {
        let mut config = ConfigurationModel::default();
        config
            .line_item_custom_attributes
            .insert(EntityKind::Account, AttributeSchema::defaults());
        assert!(config.validate().has_code("line_items_unsupported"));
    }

    #[test]
    fn schema_violation_paths_are_json_pointers() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "record_count": { "type": "integer", "minimum": 0 } }
        });
        let report = validate_config_json(&serde_json::json!({"record_count": "x"}), &schema)
            .expect("compile schema");
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "/record_count");
    }
}
