use chrono::Duration;
use rand::{Rng, RngCore};

use mockledger_config::ConfigurationModel;
use mockledger_core::EntityKind;

use super::common::{pick, pick_owned};
use super::{EntityGenerator, RecordContext};
use crate::attributes::format_cents;
use crate::errors::GenerationError;
use crate::linker::{ReferencePools, Relation, RelationshipLinker};
use crate::table::EntityRecord;

/// Values of the optional `payment_method` column.
pub const PAYMENT_METHODS: &[&str] = &[
    "CASH",
    "CREDIT_CARD",
    "DIRECT_DEBIT",
    "BANK_TRANSFER",
    "CHEQUE",
];

const MULTI_INVOICE_MIN: usize = 2;
const MULTI_INVOICE_MAX: usize = 5;
const PURCHASE_DATE_HORIZON_DAYS: i64 = 90;

const NOTES: &[&str] = &[
    "Payment received via bank transfer",
    "Credit card payment processed successfully",
    "Wire transfer completed",
    "Electronic funds transfer confirmed",
    "Check payment cleared",
    "Payment applied to outstanding invoices",
    "Advance payment for future services",
    "Partial payment - balance pending",
    "Direct debit payment processed",
    "Cash payment received and recorded",
];

const SUPPLIER_NOTES: &[&str] = &[
    "Payment issued via bank transfer to supplier",
    "Supplier payment processed successfully",
    "Wire transfer completed for invoice",
    "Electronic payment sent to vendor",
    "Check payment issued and mailed",
    "Payment applied to supplier account",
    "Advance payment for upcoming order",
    "Partial payment - balance scheduled",
    "ACH payment processed to supplier",
    "Cash payment issued and recorded",
    "Payment completed - purchase order settled",
    "Direct debit payment to supplier processed",
    "Payment reconciliation with supplier completed",
];

/// Column layout of one payment kind.
struct PaymentShape {
    prefix: &'static str,
    invoices: Relation,
    alternate_date: bool,
    notes: &'static [&'static str],
}

fn shape(kind: EntityKind) -> PaymentShape {
    match kind {
        EntityKind::PurchasePayment => PaymentShape {
            prefix: "purchase_payment_",
            invoices: Relation::PurchaseInvoice,
            alternate_date: false,
            notes: SUPPLIER_NOTES,
        },
        _ => PaymentShape {
            prefix: "payment_",
            invoices: Relation::Invoice,
            alternate_date: true,
            notes: NOTES,
        },
    }
}

/// Customer payments settling invoices, or supplier payments settling
/// purchase invoices. Each covers one invoice, or 2-5 distinct invoices in
/// multi-invoice mode.
pub struct PaymentGenerator {
    kind: EntityKind,
    shape: PaymentShape,
    invoices: RelationshipLinker,
}

impl PaymentGenerator {
    pub fn new(
        kind: EntityKind,
        config: &ConfigurationModel,
        pools: &ReferencePools,
    ) -> Result<Self, GenerationError> {
        let shape = shape(kind);
        let invoices = pools.linker(kind, shape.invoices, config.relationship_policy)?;
        Ok(Self {
            kind,
            shape,
            invoices,
        })
    }

    fn column(&self, field: &str) -> String {
        format!("{}{field}", self.shape.prefix)
    }

    fn invoice_column(&self) -> String {
        self.column("invoice_id")
    }
}

impl EntityGenerator for PaymentGenerator {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn columns(&self, config: &ConfigurationModel) -> Vec<String> {
        let mut fields = vec!["id", "origin", "date"];
        if self.shape.alternate_date {
            fields.push("alternate_date");
        }
        fields.extend(["processor", "amount", "invoice_id", "note"]);
        let mut columns: Vec<String> = fields.into_iter().map(|f| self.column(f)).collect();
        if config.optional_columns.payment_methods {
            columns.push(self.column("method"));
        }
        columns
    }

    fn fan_out(&self) -> Option<(Relation, String)> {
        Some((self.shape.invoices, self.invoice_column()))
    }

    fn resolve_references(
        &mut self,
        config: &ConfigurationModel,
        rng: &mut dyn RngCore,
    ) -> Vec<(Relation, String)> {
        let invoices = if config.payments.multi_invoice {
            let distinct = self.invoices.distinct_len();
            let low = MULTI_INVOICE_MIN.min(distinct);
            let high = MULTI_INVOICE_MAX.min(distinct);
            let amount = rng.random_range(low..=high);
            self.invoices.pick_distinct(amount, rng)
        } else {
            vec![self.invoices.pick_one(rng)]
        };
        let relation = self.shape.invoices;
        invoices.into_iter().map(|id| (relation, id)).collect()
    }

    fn generate_record(
        &mut self,
        ctx: &mut RecordContext<'_>,
        references: Vec<(Relation, String)>,
        rng: &mut dyn RngCore,
    ) -> Result<EntityRecord, GenerationError> {
        let config = ctx.config;
        let id = ctx.ids.next_document(self.kind);
        let mut record = EntityRecord::new(id.clone());
        let base = ctx.attributes.base_date;

        let (origin, date) = match self.kind {
            EntityKind::PurchasePayment => {
                let source = pick(&["SUP", "PO"], rng);
                let origin = format!("CSV-{source}-{:03}", rng.random_range(1..=999));
                let offset = rng.random_range(0..=PURCHASE_DATE_HORIZON_DAYS);
                (origin, base + Duration::days(offset))
            }
            _ => (format!("CSV IMPORT - {}", ctx.index + 1), base),
        };
        record.set(self.column("id"), id);
        record.set(self.column("origin"), origin);
        record.set(self.column("date"), date.format("%Y-%m-%d").to_string());
        if self.shape.alternate_date {
            let alternate = if rng.random_bool(0.5) {
                String::new()
            } else {
                (base + Duration::days(rng.random_range(7..=30)))
                    .format("%Y-%m-%d")
                    .to_string()
            };
            record.set(self.column("alternate_date"), alternate);
        }

        let min_cents = (config.payments.min_amount * 100.0).round() as i64;
        let max_cents = (config.payments.max_amount * 100.0).round() as i64;
        let amount = rng.random_range(min_cents..=max_cents.max(min_cents));
        record.set(
            self.column("processor"),
            pick_owned(&config.payments.processors, rng),
        );
        record.set(self.column("amount"), format_cents(amount));
        if let Some((_, invoice)) = references.first() {
            record.set(self.invoice_column(), invoice.clone());
        }
        record.set(self.column("note"), pick(self.shape.notes, rng));
        if config.optional_columns.payment_methods {
            record.set(self.column("method"), pick(PAYMENT_METHODS, rng));
        }
        record.references = references;
        Ok(record)
    }
}
