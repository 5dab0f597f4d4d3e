//! Core contracts shared by the mockledger crates.
//!
//! This crate defines the closed catalogs (attribute types, entity kinds,
//! item modes) and the custom attribute definition model consumed by the
//! configuration layer and the generation engine.

pub mod attribute;
pub mod entity;
pub mod error;

pub use attribute::{
    AttributeType, CustomAttributeDefinition, DEFAULT_CHOICE_OPTIONS, DEFAULT_QUANTITY_MAX,
    DEFAULT_QUANTITY_MIN, default_definitions,
};
pub use entity::{EntityKind, ItemMode};
pub use error::{Error, Result};

/// Contract version written into persisted configuration files.
pub const CONFIG_VERSION: &str = "0.1";
