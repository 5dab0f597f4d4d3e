//! Multi-entity business record generation for mockledger.
//!
//! This crate turns a validated `ConfigurationModel` into consistent tables
//! of accounts, orders, invoices, purchase orders, purchase invoices and
//! payments, and writes them as CSV.

pub mod attributes;
pub mod batch;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod ids;
pub mod linker;
pub mod model;
pub mod output;
pub mod table;

pub use attributes::{AttributeContext, AttributeHandler, AttributeTypeRegistry, AttributeValue};
pub use batch::{BatchController, DEFAULT_BATCH_COUNTS};
pub use engine::{CancelFlag, GenerationEngine, hash_seed, resolve_base_date};
pub use errors::GenerationError;
pub use ids::IdAllocator;
pub use linker::{
    ReferencePools, Relation, RelationshipLinker, RoundRobin, SelectionPolicy, Uniform, Weighted,
    policy_for,
};
pub use model::{BatchReport, CountOutcome, RunOutput, RunReport, TableReport};
pub use output::{CsvOutputWriter, OutputSink, output_file_name};
pub use table::{
    Contact, CustomAttributeValue, EntityRecord, GeneratedTable, ItemRef, LineItem, PostalAddress,
};
