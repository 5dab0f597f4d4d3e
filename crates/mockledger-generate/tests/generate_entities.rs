use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use mockledger_config::{AttributeSchema, ConfigurationModel, RelationshipPolicy};
use mockledger_core::{AttributeType, CustomAttributeDefinition, EntityKind, ItemMode};
use mockledger_generate::{
    GenerationEngine, GenerationError, IdAllocator, ItemRef, ReferencePools, Relation, RunOutput,
};

fn base_config(count: u64) -> ConfigurationModel {
    ConfigurationModel {
        record_count: count,
        seed: Some(7),
        base_date: Some("2025-06-30".to_string()),
        ..ConfigurationModel::default()
    }
}

fn all_kinds(count: u64) -> ConfigurationModel {
    let mut config = base_config(count);
    config.entities = EntityKind::ALL.to_vec();
    config.supplier_account_ids = vec!["SUP-EXT-1".to_string()];
    config.items.mode = ItemMode::LineOnly;
    config
}

fn generate(config: &ConfigurationModel) -> RunOutput {
    GenerationEngine::new()
        .generate_all(config)
        .expect("generate run")
}

#[test]
fn three_accounts_with_one_address_line_and_one_contact() {
    let output = generate(&base_config(3));
    assert_eq!(output.tables.len(), 1);
    let accounts = output.table(EntityKind::Account).expect("account table");

    assert_eq!(accounts.records.len(), 3);
    for record in &accounts.records {
        let address = record.address.as_ref().expect("address");
        assert_eq!(address.lines.len(), 1);
        assert_eq!(record.contacts.len(), 1);
        assert!(record.custom_attributes.is_empty());
    }

    let columns = &accounts.columns;
    assert!(columns.contains(&"address_1_address_line_1".to_string()));
    assert!(!columns.contains(&"address_1_address_line_2".to_string()));
    assert!(columns.iter().any(|c| c.starts_with("contact_1_")));
    assert!(!columns.iter().any(|c| c.starts_with("contact_2_")));
    assert!(!columns.iter().any(|c| c.starts_with("ca_")));
    for optional in [
        "account_tax_code",
        "account_accounting_code",
        "account_group",
        "account_custom_form",
        "account_user_team",
    ] {
        assert!(!columns.contains(&optional.to_string()), "{optional}");
    }
    assert!(!columns.iter().any(|c| c.starts_with("payment_method_")));
    assert_eq!(accounts.rows().len(), 3);
}

#[test]
fn five_address_lines_and_five_contacts() {
    let mut config = base_config(4);
    config.address_lines = 5;
    config.contacts = 5;
    let output = generate(&config);
    let accounts = output.table(EntityKind::Account).expect("account table");

    for record in &accounts.records {
        assert_eq!(record.address.as_ref().map(|a| a.lines.len()), Some(5));
        assert_eq!(record.contacts.len(), 5);
    }
    assert!(
        accounts
            .columns
            .contains(&"contact_5_receive_billing_information".to_string())
    );
    assert!(
        accounts
            .columns
            .contains(&"address_1_address_line_5".to_string())
    );
}

#[test]
fn every_kind_gets_exactly_the_requested_count() {
    let mut config = all_kinds(7);
    config.record_counts.insert(EntityKind::Payment, 4);
    let output = generate(&config);

    assert_eq!(output.tables.len(), EntityKind::ALL.len());
    for table in &output.tables {
        let expected = if table.kind == EntityKind::Payment { 4 } else { 7 };
        assert_eq!(table.records.len(), expected, "{}", table.kind);
    }
    for kind in [
        EntityKind::Order,
        EntityKind::Invoice,
        EntityKind::PurchaseOrder,
        EntityKind::PurchaseInvoice,
    ] {
        let table = output.table(kind).expect("document table");
        let items: usize = table.records.iter().map(|r| r.line_items.len()).sum();
        assert_eq!(table.rows().len(), items);
        for record in &table.records {
            assert!((1..=5).contains(&record.line_items.len()));
            assert!(record.line_items.iter().all(|item| item.parent_id == record.id));
        }
    }
}

#[test]
fn identifiers_are_unique_within_a_run() {
    let output = generate(&all_kinds(20));
    let mut seen = HashSet::new();
    for table in &output.tables {
        for record in &table.records {
            assert!(seen.insert(record.id.clone()), "duplicate {}", record.id);
            for item in &record.line_items {
                assert!(seen.insert(item.id.clone()), "duplicate {}", item.id);
            }
        }
    }
}

#[test]
fn references_never_dangle_under_any_policy() {
    for policy in [
        RelationshipPolicy::Uniform,
        RelationshipPolicy::RoundRobin,
        RelationshipPolicy::Weighted { skew: 1.5 },
    ] {
        let mut config = all_kinds(15);
        config.relationship_policy = policy;
        config.account_ids = vec!["ACC-EXT-1".to_string()];
        config.payments.multi_invoice = true;
        let output = generate(&config);

        let accounts = output.table(EntityKind::Account).expect("accounts");
        let mut customers: HashSet<String> =
            accounts.records.iter().map(|r| r.id.clone()).collect();
        customers.insert("ACC-EXT-1".to_string());
        let mut suppliers: HashSet<String> = accounts
            .records
            .iter()
            .filter(|r| {
                matches!(
                    r.field("account_type"),
                    Some("SUPPLIER" | "CUSTOMER_AND_SUPPLIER")
                )
            })
            .map(|r| r.id.clone())
            .collect();
        suppliers.insert("SUP-EXT-1".to_string());

        for (kind, pool) in [
            (EntityKind::Order, &customers),
            (EntityKind::Invoice, &customers),
            (EntityKind::PurchaseOrder, &suppliers),
            (EntityKind::PurchaseInvoice, &suppliers),
        ] {
            let column = format!("{}_account_id", kind.as_str());
            for record in &output.table(kind).expect("table").records {
                let account = record.field(&column).expect("account reference");
                assert!(pool.contains(account), "{policy}: {kind} -> {account}");
            }
        }

        let invoices: HashSet<&str> = output
            .table(EntityKind::Invoice)
            .expect("invoices")
            .records
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        for payment in &output.table(EntityKind::Payment).expect("payments").records {
            let targets: Vec<&str> = payment.references_to(Relation::Invoice).collect();
            assert!((2..=5).contains(&targets.len()), "{policy}");
            assert_eq!(targets.iter().collect::<HashSet<_>>().len(), targets.len());
            assert!(targets.iter().all(|id| invoices.contains(id)), "{policy}");
        }

        let purchase_invoices: HashSet<&str> = output
            .table(EntityKind::PurchaseInvoice)
            .expect("purchase invoices")
            .records
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        let purchase_payments = output
            .table(EntityKind::PurchasePayment)
            .expect("purchase payments");
        for payment in &purchase_payments.records {
            let targets: Vec<&str> = payment.references_to(Relation::PurchaseInvoice).collect();
            assert!((2..=5).contains(&targets.len()), "{policy}");
            assert!(
                targets.iter().all(|id| purchase_invoices.contains(id)),
                "{policy}"
            );
            assert_eq!(payment.references_to(Relation::Invoice).count(), 0);
        }
    }
}

#[test]
fn purchase_payments_settle_purchase_invoices() {
    let mut config = base_config(6);
    config.entities = vec![
        EntityKind::Account,
        EntityKind::PurchaseInvoice,
        EntityKind::PurchasePayment,
    ];
    config.items.mode = ItemMode::LineOnly;
    config.payments.multi_invoice = true;
    let output = generate(&config);

    let payments = output
        .table(EntityKind::PurchasePayment)
        .expect("purchase payments");
    assert_eq!(payments.records.len(), 6);
    assert_eq!(
        payments.columns.first().map(String::as_str),
        Some("purchase_payment_id")
    );
    for (idx, record) in payments.records.iter().enumerate() {
        assert_eq!(record.id, format!("CSV-PPMT-{:03}", idx + 1));
        let origin = record.field("purchase_payment_origin").expect("origin");
        assert!(origin.starts_with("CSV-SUP-") || origin.starts_with("CSV-PO-"));
    }

    let invoice_col = payments
        .columns
        .iter()
        .position(|c| c == "purchase_payment_invoice_id")
        .expect("invoice column");
    let expected: usize = payments
        .records
        .iter()
        .map(|r| r.references_to(Relation::PurchaseInvoice).count())
        .sum();
    let rows = payments.rows();
    assert_eq!(rows.len(), expected);
    let purchase_invoices: HashSet<&str> = output
        .table(EntityKind::PurchaseInvoice)
        .expect("purchase invoices")
        .records
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert!(rows.iter().all(|row| purchase_invoices.contains(row[invoice_col].as_str())));
}

#[test]
fn a_single_generated_account_can_supply_purchase_invoices() {
    for seed in 0..30 {
        let mut config = base_config(1);
        config.seed = Some(seed);
        config.entities = vec![EntityKind::Account, EntityKind::PurchaseInvoice];
        config.items.mode = ItemMode::LineOnly;
        assert!(config.validate().is_ok());

        let output = GenerationEngine::new()
            .generate_all(&config)
            .unwrap_or_else(|err| panic!("seed {seed}: {err}"));
        let account = &output.table(EntityKind::Account).expect("accounts").records[0];
        assert!(
            matches!(
                account.field("account_type"),
                Some("SUPPLIER" | "CUSTOMER_AND_SUPPLIER")
            ),
            "seed {seed}"
        );
        let invoice = &output
            .table(EntityKind::PurchaseInvoice)
            .expect("purchase invoices")
            .records[0];
        assert_eq!(
            invoice.field("purchase_invoice_account_id"),
            Some(account.id.as_str())
        );
    }
}

#[test]
fn multi_invoice_payments_expand_into_one_row_per_invoice() {
    let mut config = all_kinds(6);
    config.entities = vec![EntityKind::Account, EntityKind::Invoice, EntityKind::Payment];
    config.payments.multi_invoice = true;
    let output = generate(&config);
    let payments = output.table(EntityKind::Payment).expect("payments");

    let expected: usize = payments
        .records
        .iter()
        .map(|r| r.references_to(Relation::Invoice).count())
        .sum();
    let rows = payments.rows();
    assert_eq!(rows.len(), expected);
    let id_col = payments
        .columns
        .iter()
        .position(|c| c == "payment_id")
        .expect("payment_id column");
    let amount_col = payments
        .columns
        .iter()
        .position(|c| c == "payment_amount")
        .expect("payment_amount column");
    assert!(rows.iter().all(|row| !row[id_col].is_empty() && !row[amount_col].is_empty()));
}

#[test]
fn later_line_rows_blank_header_cells_except_retained_ones() {
    let output = generate(&all_kinds(10));
    let invoices = output.table(EntityKind::Invoice).expect("invoices");
    let position = |name: &str| {
        invoices
            .columns
            .iter()
            .position(|c| c == name)
            .expect("column present")
    };
    let (id, account, note) = (
        position("invoice_id"),
        position("invoice_account_id"),
        position("invoice_invoice_note"),
    );

    let mut row_index = 0;
    let rows = invoices.rows();
    for record in &invoices.records {
        for line in 0..record.line_items.len() {
            let row = &rows[row_index];
            assert_eq!(row[id], record.id);
            assert!(!row[account].is_empty());
            assert_eq!(row[note].is_empty(), line > 0);
            row_index += 1;
        }
    }
}

#[test]
fn custom_attribute_values_stay_in_their_domains() {
    let mut config = all_kinds(25);
    config.entities = vec![EntityKind::Account, EntityKind::Invoice];
    config
        .custom_attributes
        .insert(EntityKind::Account, AttributeSchema::defaults());
    config
        .line_item_custom_attributes
        .insert(EntityKind::Invoice, AttributeSchema::defaults());
    let engine = GenerationEngine::new();
    let output = engine.generate_all(&config).expect("generate run");

    let accounts = output.table(EntityKind::Account).expect("accounts");
    assert!(accounts.columns.contains(&"ca_account_attr_CA_BOOL".to_string()));
    let defaults = mockledger_core::default_definitions();
    for record in &accounts.records {
        assert_eq!(record.custom_attributes.len(), defaults.len());
        for (value, definition) in record.custom_attributes.iter().zip(&defaults) {
            assert_eq!(value.name, definition.name);
            assert!(engine.registry().validate(definition, &value.value));
        }
    }

    let invoices = output.table(EntityKind::Invoice).expect("invoices");
    assert!(
        invoices
            .columns
            .contains(&"ca_invoice_item_attr_CA_TEXT".to_string())
    );
    for item in invoices.records.iter().flat_map(|r| &r.line_items) {
        for (value, definition) in item.custom_attributes.iter().zip(&defaults) {
            assert!(engine.registry().validate(definition, &value.value));
        }
    }
}

#[test]
fn constant_attributes_repeat_their_value() {
    let mut config = base_config(5);
    config.custom_attributes.insert(
        EntityKind::Account,
        AttributeSchema::with_definitions(vec![
            CustomAttributeDefinition::new("tier", AttributeType::Dropdown)
                .with_options(["GOLD", "SILVER"])
                .with_constant(serde_json::json!("GOLD")),
        ]),
    );
    let output = generate(&config);
    let accounts = output.table(EntityKind::Account).expect("accounts");
    let column = accounts
        .columns
        .iter()
        .position(|c| c == "ca_account_attr_TIER")
        .expect("constant column");
    assert!(accounts.rows().iter().all(|row| row[column] == "GOLD"));
}

#[test]
fn non_conforming_constant_fails_before_generation() {
    let mut config = base_config(5);
    config.custom_attributes.insert(
        EntityKind::Account,
        AttributeSchema::with_definitions(vec![
            CustomAttributeDefinition::new("score", AttributeType::Number)
                .with_constant(serde_json::json!(5000)),
        ]),
    );
    let err = GenerationEngine::new()
        .generate_all(&config)
        .expect_err("out of range constant");
    assert!(matches!(err, GenerationError::InvalidConfig(_)), "got {err}");
}

#[test]
fn system_only_mode_uses_configured_items() {
    let mut config = all_kinds(8);
    config.entities = vec![EntityKind::Account, EntityKind::Order];
    config.items.mode = ItemMode::SystemOnly;
    config.items.system_item_ids = vec!["ITEM-1".to_string(), "ITEM-2".to_string()];
    let output = generate(&config);
    let orders = output.table(EntityKind::Order).expect("orders");
    assert!(!orders.columns.contains(&"line_item_name".to_string()));
    for item in orders.records.iter().flat_map(|r| &r.line_items) {
        match &item.item {
            ItemRef::System(id) => assert!(id == "ITEM-1" || id == "ITEM-2"),
            ItemRef::AdHoc(name) => panic!("unexpected ad hoc item {name}"),
        }
    }
}

#[test]
fn empty_reference_pool_is_an_unresolved_reference() {
    let config = base_config(3);
    let mut ids = IdAllocator::new();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let err = GenerationEngine::new()
        .generate(
            EntityKind::PurchaseInvoice,
            3,
            &config,
            &ReferencePools::new(),
            &mut ids,
            &mut rng,
        )
        .expect_err("no supplier accounts");
    assert!(matches!(
        err,
        GenerationError::UnresolvedReference {
            entity: EntityKind::PurchaseInvoice,
            relation: Relation::SupplierAccount
        }
    ));
    assert_eq!(ids.issued(EntityKind::PurchaseInvoice), 0);
}

#[test]
fn missing_supplier_source_is_a_validation_error() {
    let mut config = base_config(3);
    config.entities = vec![EntityKind::PurchaseInvoice];
    config.items.mode = ItemMode::LineOnly;
    match GenerationEngine::new().generate_all(&config) {
        Err(GenerationError::Validation(report)) => {
            assert!(report.has_code("reference_pool_empty"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn fixed_seed_reproduces_every_table() {
    let mut config = all_kinds(12);
    config.optional_columns.payment_methods = true;
    config.payment_methods.direct_debit_count = 1;
    config.payment_methods.other_count = 2;
    config.payment_methods.other_processors = vec!["Stripe".to_string()];
    config.relationship_policy = RelationshipPolicy::Weighted { skew: 1.0 };

    let first = generate(&config);
    let second = generate(&config);
    assert_ne!(first.run_id, second.run_id);
    for (a, b) in first.tables.iter().zip(&second.tables) {
        assert_eq!(a.columns, b.columns);
        assert_eq!(a.rows(), b.rows(), "{}", a.kind);
    }
}

#[test]
fn documents_inherit_the_account_currency() {
    let output = generate(&all_kinds(10));
    let accounts = output.table(EntityKind::Account).expect("accounts");
    let orders = output.table(EntityKind::Order).expect("orders");
    for order in &orders.records {
        let account_id = order.field("order_account_id").expect("account id");
        let account = accounts
            .records
            .iter()
            .find(|r| r.id == account_id)
            .expect("generated account");
        assert_eq!(order.field("order_currency"), account.field("account_currency"));
    }
}
