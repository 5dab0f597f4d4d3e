//! One record generator per entity kind.

mod account;
pub(crate) mod common;
mod document;
mod payment;

use rand::RngCore;

use mockledger_config::ConfigurationModel;
use mockledger_core::EntityKind;

use crate::attributes::{AttributeContext, AttributeTypeRegistry};
use crate::errors::GenerationError;
use crate::ids::IdAllocator;
use crate::linker::{ReferencePools, Relation};
use crate::table::EntityRecord;

pub use account::AccountGenerator;
pub use document::{DocumentGenerator, line_item_prefix};
pub use payment::{PAYMENT_METHODS, PaymentGenerator};

/// Shared state handed to a generator for each record.
pub struct RecordContext<'a> {
    pub config: &'a ConfigurationModel,
    pub registry: &'a AttributeTypeRegistry,
    pub attributes: AttributeContext,
    pub pools: &'a ReferencePools,
    pub ids: &'a mut IdAllocator,
    /// Zero-based position of the record in its table.
    pub index: u64,
}

pub trait EntityGenerator: Send {
    fn kind(&self) -> EntityKind;

    /// Core, reference, sub-collection, optional and line-item columns.
    fn columns(&self, config: &ConfigurationModel) -> Vec<String>;

    /// Header columns repeated on every flattened line-item row.
    fn retained_columns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Relation whose multiple references expand into one row each.
    fn fan_out(&self) -> Option<(Relation, String)> {
        None
    }

    /// Parent ids for the next record, drawn before any other field.
    fn resolve_references(
        &mut self,
        config: &ConfigurationModel,
        rng: &mut dyn RngCore,
    ) -> Vec<(Relation, String)>;

    fn generate_record(
        &mut self,
        ctx: &mut RecordContext<'_>,
        references: Vec<(Relation, String)>,
        rng: &mut dyn RngCore,
    ) -> Result<EntityRecord, GenerationError>;
}

/// Build the generator for `kind`. Linkers are created here so an empty
/// reference pool fails before the first record.
pub fn generator_for(
    kind: EntityKind,
    config: &ConfigurationModel,
    pools: &ReferencePools,
    count: u64,
    rng: &mut dyn RngCore,
) -> Result<Box<dyn EntityGenerator>, GenerationError> {
    Ok(match kind {
        EntityKind::Account => Box::new(AccountGenerator::new(config, count, rng)),
        EntityKind::Order
        | EntityKind::Invoice
        | EntityKind::PurchaseOrder
        | EntityKind::PurchaseInvoice => Box::new(DocumentGenerator::new(kind, config, pools)?),
        EntityKind::Payment | EntityKind::PurchasePayment => {
            Box::new(PaymentGenerator::new(kind, config, pools)?)
        }
    })
}
