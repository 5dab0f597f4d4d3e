use std::fs;

use mockledger_config::{AttributeSchema, ConfigurationModel, RelationshipPolicy};
use mockledger_core::{AttributeType, CustomAttributeDefinition, EntityKind, ItemMode};
use mockledger_generate::{GenerationEngine, RunOutput};

fn saved_run_config() -> ConfigurationModel {
    let mut config = ConfigurationModel {
        record_count: 9,
        entities: vec![
            EntityKind::Account,
            EntityKind::Invoice,
            EntityKind::Payment,
            EntityKind::PurchaseInvoice,
            EntityKind::PurchasePayment,
        ],
        seed: Some(2024),
        base_date: Some("2025-02-01".to_string()),
        address_lines: 2,
        contacts: 3,
        relationship_policy: RelationshipPolicy::Weighted { skew: 0.5 },
        tax_uuids: vec!["TAX-1".to_string()],
        ..ConfigurationModel::default()
    };
    config.record_counts.insert(EntityKind::Payment, 4);
    config.items.mode = ItemMode::LineOnly;
    config.optional_columns.tax = true;
    config.payments.multi_invoice = true;
    config.custom_attributes.insert(
        EntityKind::Account,
        AttributeSchema::with_definitions(vec![
            CustomAttributeDefinition::new("segment", AttributeType::Dropdown)
                .with_options(["SMB", "ENTERPRISE"]),
            CustomAttributeDefinition::new("credit limit", AttributeType::Money),
        ]),
    );
    config
        .custom_attributes
        .insert(EntityKind::PurchasePayment, AttributeSchema::defaults());
    config
        .line_item_custom_attributes
        .insert(EntityKind::Invoice, AttributeSchema::defaults());
    config
}

fn shape(output: &RunOutput) -> Vec<(EntityKind, Vec<String>, usize)> {
    output
        .tables
        .iter()
        .map(|table| (table.kind, table.columns.clone(), table.record_count()))
        .collect()
}

#[test]
fn reloaded_configuration_generates_the_same_shape() {
    let dir = std::env::temp_dir().join(format!("mockledger_saved_{}", uuid::Uuid::new_v4()));
    let path = dir.join("mockledger_config.json");
    let config = saved_run_config();
    config.to_file(&path).expect("save config");
    let reloaded = ConfigurationModel::from_file(&path)
        .expect("reload config")
        .config;

    let engine = GenerationEngine::new();
    let original = engine.generate_all(&config).expect("generate from memory");
    let restored = engine.generate_all(&reloaded).expect("generate from file");

    assert_eq!(shape(&original), shape(&restored));
    assert_eq!(
        original
            .table(EntityKind::Payment)
            .map(|table| table.record_count()),
        Some(4)
    );
    for (a, b) in original.tables.iter().zip(&restored.tables) {
        assert_eq!(a.rows(), b.rows(), "{}", a.kind);
    }

    fs::remove_dir_all(&dir).ok();
}
