use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rand::distr::{Bernoulli, Distribution};
use rand::{Rng, RngCore};

use mockledger_config::ConfigurationModel;
use mockledger_core::{EntityKind, ItemMode};

use super::common::{ACCOUNTING_CODES, materialize_attributes, pick, pick_owned};
use super::{EntityGenerator, RecordContext};
use crate::attributes::format_cents;
use crate::errors::GenerationError;
use crate::linker::{ReferencePools, Relation, RelationshipLinker};
use crate::table::{EntityRecord, ItemRef, LineItem};

const ORDER_PREFIXES: &[&str] = &[
    "Wholesale",
    "Retail",
    "Subscription",
    "Enterprise",
    "Priority",
    "Express",
];
const ORDER_DESCRIPTORS: &[&str] = &["Bundle", "Plan", "Package", "Order", "Shipment", "Service"];
const ORDER_DESCRIPTIONS: &[&str] = &[
    "Monthly recurring subscription order",
    "One-off purchase for enterprise client",
    "Annual wholesale plan renewal",
    "Quarterly shipment for retail partner",
    "Custom implementation work order",
    "Expedited service engagement",
    "Pilot program enrollment",
];
const ORDER_NOTES: &[&str] = &[
    "Invoice includes expedited fulfillment.",
    "Ensure payment per standard net terms.",
    "Apply loyalty discount if eligible.",
    "Reference PO provided by customer.",
    "Contact finance for billing adjustments.",
];
const INVOICE_NOTES: &[&str] = &[
    "Payment due upon receipt. Thank you for your business.",
    "Please remit payment within the specified terms.",
    "Contact our billing department for any queries.",
    "Early payment discount available - contact us for details.",
    "This invoice reflects services rendered as per agreement.",
    "Net payment terms apply as specified in contract.",
    "Please reference invoice number when making payment.",
    "All amounts shown in the specified currency.",
    "Late fees may apply for overdue payments.",
    "Thank you for choosing our services.",
];
const LINE_NOTES: &[&str] = &[
    "Standard terms apply.",
    "As per service agreement.",
    "Monthly subscription fee.",
    "One-time setup charge.",
    "Prorated for partial period.",
    "Annual license renewal.",
    "Volume discount applied.",
    "Special promotion pricing.",
];
const ITEM_ADJECTIVES: &[&str] = &[
    "Premium",
    "Standard",
    "Professional",
    "Enterprise",
    "Basic",
    "Advanced",
    "Custom",
];
const ITEM_NOUNS: &[&str] = &[
    "Service",
    "Product",
    "Consultation",
    "Package",
    "Bundle",
    "Solution",
    "Support",
];

const LINE_PRICE_MIN_CENTS: i64 = 1_000;
const LINE_PRICE_MAX_CENTS: i64 = 500_000;
const TAX_EXEMPT_PROBABILITY: f64 = 0.1;
const TAX_INCLUSIVE_PROBABILITY: f64 = 0.3;

/// Column prefix of line-item cells for a document kind.
pub fn line_item_prefix(kind: EntityKind) -> Option<&'static str> {
    match kind {
        EntityKind::Order => Some("line_item_"),
        EntityKind::Invoice => Some("invoice_line_item_"),
        EntityKind::PurchaseOrder => Some("purchase_line_item_"),
        EntityKind::PurchaseInvoice => Some("purchase_invoice_line_item_"),
        EntityKind::Account | EntityKind::Payment | EntityKind::PurchasePayment => None,
    }
}

fn header_fields(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Order => &[
            "id",
            "name",
            "display_name",
            "description",
            "invoice_note",
            "currency",
            "account_id",
        ],
        EntityKind::PurchaseOrder => &[
            "id",
            "origin",
            "currency",
            "issue_date",
            "due_date",
            "expected_completion_date",
            "price_tax_inclusive",
            "purchase_order_note",
            "account_id",
        ],
        _ => &[
            "id",
            "origin",
            "currency",
            "account_id",
            "issue_date",
            "due_date",
            "price_tax_inclusive",
            "invoice_note",
        ],
    }
}

/// Orders, invoices, purchase orders and purchase invoices: a header
/// referencing an account plus 1..=max line items.
pub struct DocumentGenerator {
    kind: EntityKind,
    prefix: &'static str,
    line_prefix: &'static str,
    account: RelationshipLinker,
    system_items: Option<RelationshipLinker>,
    discount: Bernoulli,
}

impl DocumentGenerator {
    pub fn new(
        kind: EntityKind,
        config: &ConfigurationModel,
        pools: &ReferencePools,
    ) -> Result<Self, GenerationError> {
        let line_prefix = line_item_prefix(kind).ok_or_else(|| {
            GenerationError::InvalidConfig(format!("{kind} records have no line items"))
        })?;
        let relation = match kind {
            EntityKind::PurchaseOrder | EntityKind::PurchaseInvoice => Relation::SupplierAccount,
            _ => Relation::CustomerAccount,
        };
        let policy = config.relationship_policy;
        let account = pools.linker(kind, relation, policy)?;
        let system_items = match config.items.mode {
            ItemMode::SystemOnly => Some(pools.linker(kind, Relation::SystemItem, policy)?),
            ItemMode::Both => pools.linker(kind, Relation::SystemItem, policy).ok(),
            ItemMode::LineOnly => None,
        };
        let probability = config.items.discount_probability;
        let discount = Bernoulli::new(probability).map_err(|_| {
            GenerationError::InvalidConfig(format!(
                "discount_probability {probability} is not within [0, 1]"
            ))
        })?;
        Ok(Self {
            kind,
            prefix: kind.as_str(),
            line_prefix,
            account,
            system_items,
            discount,
        })
    }

    fn column(&self, field: &str) -> String {
        format!("{}_{field}", self.prefix)
    }

    fn line_columns(&self, config: &ConfigurationModel) -> Vec<String> {
        let mode = config.items.mode;
        let mut fields = vec!["id"];
        if mode.includes_system_items() {
            fields.push("system_item_id");
        }
        if mode.includes_line_items() {
            fields.push("name");
        }
        fields.extend([
            "quantity",
            "price",
            "note",
            "discount_type",
            "discount",
            "tax_exempt",
        ]);
        if config.optional_columns.tax {
            fields.push("tax_uuid");
        }
        if config.optional_columns.accounting_code {
            fields.push("accounting_code");
        }
        fields
            .into_iter()
            .map(|field| format!("{}{field}", self.line_prefix))
            .collect()
    }

    fn quantity_max(&self) -> i64 {
        match self.kind {
            EntityKind::Invoice | EntityKind::PurchaseInvoice => 100,
            _ => 50,
        }
    }

    fn header(
        &self,
        record: &mut EntityRecord,
        ctx: &RecordContext<'_>,
        account_id: &str,
        rng: &mut dyn RngCore,
    ) {
        let currency = ctx
            .pools
            .currency_for(account_id)
            .unwrap_or(&ctx.config.default_currency)
            .to_string();
        let base = ctx.attributes.base_date;
        record.set(self.column("id"), record.id.clone());
        record.set(self.column("currency"), currency);
        record.set(self.column("account_id"), account_id);
        match self.kind {
            EntityKind::Order => {
                let name = format!(
                    "{} {} {}",
                    pick(ORDER_PREFIXES, rng),
                    pick(ORDER_DESCRIPTORS, rng),
                    rng.random_range(1..=999)
                );
                let note = format!("{} ({name})", pick(ORDER_NOTES, rng));
                record.set(self.column("display_name"), name.clone());
                record.set(self.column("name"), name);
                record.set(self.column("description"), pick(ORDER_DESCRIPTIONS, rng));
                record.set(self.column("invoice_note"), note);
            }
            EntityKind::PurchaseOrder => {
                let issue = offset(base, rng.random_range(-30..=30));
                let due = offset(issue, rng.random_range(15..=90));
                let completion = offset(issue, rng.random_range(0..=60));
                record.set(self.column("origin"), origin(ctx.index));
                record.set(self.column("issue_date"), date(issue));
                record.set(self.column("due_date"), date(due));
                record.set(self.column("expected_completion_date"), date(completion));
                record.set(
                    self.column("price_tax_inclusive"),
                    pick(&["TRUE", "FALSE"], rng),
                );
                record.set(self.column("purchase_order_note"), pick(INVOICE_NOTES, rng));
            }
            _ => {
                let issue = offset(base, rng.random_range(-90..=0));
                let due = offset(issue, rng.random_range(7..=90));
                let inclusive = if rng.random_bool(TAX_INCLUSIVE_PROBABILITY) {
                    "TRUE"
                } else {
                    ""
                };
                record.set(self.column("origin"), origin(ctx.index));
                record.set(self.column("issue_date"), date(issue));
                record.set(self.column("due_date"), date(due));
                record.set(self.column("price_tax_inclusive"), inclusive);
                record.set(self.column("invoice_note"), pick(INVOICE_NOTES, rng));
            }
        }
        if ctx.config.optional_columns.custom_form {
            record.set(
                self.column("custom_form_template"),
                pick_owned(&ctx.config.custom_forms.names, rng),
            );
        }
    }

    fn line_item(
        &mut self,
        ctx: &mut RecordContext<'_>,
        parent_id: &str,
        rng: &mut dyn RngCore,
    ) -> Result<LineItem, GenerationError> {
        let config = ctx.config;
        let lp = self.line_prefix;
        let id = ctx.ids.next_line_item();
        let use_system = match (config.items.mode, self.system_items.is_some()) {
            (ItemMode::SystemOnly, true) => true,
            (ItemMode::Both, true) => rng.random_bool(0.5),
            _ => false,
        };
        let item = match self.system_items.as_mut() {
            Some(linker) if use_system => ItemRef::System(linker.pick_one(rng)),
            _ => ItemRef::AdHoc(format!(
                "{} {}",
                pick(ITEM_ADJECTIVES, rng),
                pick(ITEM_NOUNS, rng)
            )),
        };
        let quantity = rng.random_range(1..=self.quantity_max());
        let unit_amount_cents = rng.random_range(LINE_PRICE_MIN_CENTS..=LINE_PRICE_MAX_CENTS);

        let mut cells = BTreeMap::new();
        cells.insert(format!("{lp}id"), id.clone());
        let (system_id, name) = match &item {
            ItemRef::System(system_id) => (system_id.clone(), String::new()),
            ItemRef::AdHoc(name) => (String::new(), name.clone()),
        };
        if config.items.mode.includes_system_items() {
            cells.insert(format!("{lp}system_item_id"), system_id);
        }
        if config.items.mode.includes_line_items() {
            cells.insert(format!("{lp}name"), name);
        }
        cells.insert(format!("{lp}quantity"), quantity.to_string());
        cells.insert(format!("{lp}price"), format_cents(unit_amount_cents));
        cells.insert(format!("{lp}note"), pick(LINE_NOTES, rng).to_string());
        let (discount_type, discount) = if self.discount.sample(rng) {
            if rng.random_bool(0.5) {
                ("FIXED", format_cents(rng.random_range(500..=25_000)))
            } else {
                ("PERCENTAGE", rng.random_range(1..=100).to_string())
            }
        } else {
            ("", String::new())
        };
        cells.insert(format!("{lp}discount_type"), discount_type.to_string());
        cells.insert(format!("{lp}discount"), discount);
        let exempt = if rng.random_bool(TAX_EXEMPT_PROBABILITY) {
            "TRUE"
        } else {
            ""
        };
        cells.insert(format!("{lp}tax_exempt"), exempt.to_string());
        if config.optional_columns.tax {
            cells.insert(format!("{lp}tax_uuid"), pick_owned(&config.tax_uuids, rng));
        }
        if config.optional_columns.accounting_code {
            cells.insert(
                format!("{lp}accounting_code"),
                pick(ACCOUNTING_CODES, rng).to_string(),
            );
        }

        let custom_attributes = match self.kind.line_item_attribute_prefix() {
            Some(prefix) => materialize_attributes(
                ctx.registry,
                config.line_item_attributes(self.kind),
                prefix,
                &ctx.attributes,
                rng,
            )?,
            None => Vec::new(),
        };

        Ok(LineItem {
            id,
            parent_id: parent_id.to_string(),
            item,
            quantity,
            unit_amount_cents,
            cells,
            custom_attributes,
        })
    }
}

impl EntityGenerator for DocumentGenerator {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn columns(&self, config: &ConfigurationModel) -> Vec<String> {
        let mut columns: Vec<String> = header_fields(self.kind)
            .iter()
            .map(|field| self.column(field))
            .collect();
        if config.optional_columns.custom_form {
            columns.push(self.column("custom_form_template"));
        }
        columns.extend(self.line_columns(config));
        columns
    }

    fn retained_columns(&self) -> Vec<String> {
        vec![self.column("id"), self.column("account_id")]
    }

    fn resolve_references(
        &mut self,
        _config: &ConfigurationModel,
        rng: &mut dyn RngCore,
    ) -> Vec<(Relation, String)> {
        vec![(self.account.relation(), self.account.pick_one(rng))]
    }

    fn generate_record(
        &mut self,
        ctx: &mut RecordContext<'_>,
        references: Vec<(Relation, String)>,
        rng: &mut dyn RngCore,
    ) -> Result<EntityRecord, GenerationError> {
        let id = ctx.ids.next_document(self.kind);
        let mut record = EntityRecord::new(id.clone());
        let account_id = references
            .first()
            .map(|(_, id)| id.clone())
            .unwrap_or_default();
        self.header(&mut record, ctx, &account_id, rng);
        record.references = references;

        let max_items = ctx.config.items.max_items_per_document.max(1);
        let items = rng.random_range(1..=max_items);
        for _ in 0..items {
            let item = self.line_item(ctx, &id, rng)?;
            record.line_items.push(item);
        }
        Ok(record)
    }
}

fn offset(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

fn date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

fn origin(index: u64) -> String {
    format!("CSV IMPORT - {}", index + 1)
}
