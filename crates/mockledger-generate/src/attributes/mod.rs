//! Custom attribute value synthesis.
//!
//! Every [`AttributeType`] is served by one boxed [`AttributeHandler`]; the
//! [`AttributeTypeRegistry`] dispatches generation, validation, parsing of
//! configured constants and flat-text serialization.

mod handlers;

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use rand::RngCore;
use serde_json::Value;

use mockledger_core::{AttributeType, CustomAttributeDefinition};

use crate::errors::GenerationError;

pub use handlers::{
    BoolHandler, ChoiceHandler, ChoiceSetHandler, DateHandler, IntegerHandler, MoneyHandler,
    NUMBER_MAX, NUMBER_MIN, TEXT_WORDS, WordsHandler,
};

pub const MONEY_MIN_CENTS: i64 = 100;
pub const MONEY_MAX_CENTS: i64 = 1_000_000;
pub const DATE_SPAN_DAYS: i64 = 365;

/// A generated or parsed custom attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Bool(bool),
    /// One element of the choice set.
    Choice(String),
    /// Non-empty subset of the choice set, kept in choice-set order.
    ChoiceSet(Vec<String>),
    Date(NaiveDate),
    /// Money in cents.
    Money(i64),
    Integer(i64),
    Text(String),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(value) => write!(f, "{value}"),
            AttributeValue::Choice(value) | AttributeValue::Text(value) => f.write_str(value),
            AttributeValue::ChoiceSet(values) => f.write_str(&values.join(",")),
            AttributeValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            AttributeValue::Money(cents) => f.write_str(&format_cents(*cents)),
            AttributeValue::Integer(value) => write!(f, "{value}"),
        }
    }
}

/// Render cents as a two-decimal amount.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

/// Inputs shared by every attribute generated in one run.
#[derive(Debug, Clone, Copy)]
pub struct AttributeContext {
    /// Anchor for default date ranges.
    pub base_date: NaiveDate,
}

/// Generation, validation and parsing rules for one attribute type.
pub trait AttributeHandler: Send + Sync {
    fn attr_type(&self) -> AttributeType;

    fn generate(
        &self,
        definition: &CustomAttributeDefinition,
        ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError>;

    /// Whether `value` lies in the definition's domain.
    fn validate(&self, definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool;

    /// Convert a configured JSON value into this type's representation.
    fn parse(&self, definition: &CustomAttributeDefinition, raw: &Value) -> Option<AttributeValue>;
}

/// Registry of attribute handlers keyed by type.
pub struct AttributeTypeRegistry {
    handlers: HashMap<AttributeType, Box<dyn AttributeHandler>>,
}

impl fmt::Debug for AttributeTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("AttributeTypeRegistry")
            .field("types", &types)
            .finish()
    }
}

impl Default for AttributeTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeTypeRegistry {
    /// Registry with every built-in handler.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        handlers::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler, returning the one it replaces.
    pub fn register(
        &mut self,
        handler: Box<dyn AttributeHandler>,
    ) -> Option<Box<dyn AttributeHandler>> {
        self.handlers.insert(handler.attr_type(), handler)
    }

    pub fn handler(
        &self,
        attr_type: AttributeType,
    ) -> Result<&dyn AttributeHandler, GenerationError> {
        self.handlers
            .get(&attr_type)
            .map(|handler| handler.as_ref())
            .ok_or_else(|| {
                GenerationError::UnknownAttributeType(
                    mockledger_core::Error::UnknownAttributeType(attr_type.to_string()),
                )
            })
    }

    /// Produce a value for `definition`; constants yield their parsed value.
    pub fn generate(
        &self,
        definition: &CustomAttributeDefinition,
        ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError> {
        if definition.constant {
            let raw = definition.value.as_ref().ok_or_else(|| {
                GenerationError::InvalidConfig(format!(
                    "constant attribute '{}' has no value",
                    definition.name
                ))
            })?;
            return self.parse_value(definition, raw);
        }
        self.handler(definition.attr_type)?
            .generate(definition, ctx, rng)
    }

    /// Whether `value` conforms to the definition's domain.
    pub fn validate(&self, definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool {
        self.handler(definition.attr_type)
            .map(|handler| handler.validate(definition, value))
            .unwrap_or(false)
    }

    /// Parse a value arriving from a loaded configuration.
    pub fn parse_value(
        &self,
        definition: &CustomAttributeDefinition,
        raw: &Value,
    ) -> Result<AttributeValue, GenerationError> {
        let handler = self.handler(definition.attr_type)?;
        handler
            .parse(definition, raw)
            .filter(|value| handler.validate(definition, value))
            .ok_or_else(|| {
                GenerationError::InvalidConfig(format!(
                    "value {raw} is not a valid {} for attribute '{}'",
                    definition.attr_type, definition.name
                ))
            })
    }

    /// Flat text representation for tabular output.
    pub fn serialize(&self, value: &AttributeValue) -> String {
        value.to_string()
    }

    /// Fail when a definition has no handler or carries a non-conforming constant.
    pub fn check_definitions(
        &self,
        definitions: &[CustomAttributeDefinition],
    ) -> Result<(), GenerationError> {
        for definition in definitions {
            self.handler(definition.attr_type)?;
            if definition.constant {
                let raw = definition.value.as_ref().unwrap_or(&Value::Null);
                self.parse_value(definition, raw)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use serde_json::json;

    use super::*;

    fn ctx() -> AttributeContext {
        AttributeContext {
            base_date: NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date"),
        }
    }

    #[test]
    fn empty_registry_rejects_every_type() {
        let registry = AttributeTypeRegistry::empty();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let definition = CustomAttributeDefinition::new("CA_BOOL", AttributeType::Bool);
        let err = registry
            .generate(&definition, &ctx(), &mut rng)
            .expect_err("no handler");
        assert!(matches!(err, GenerationError::UnknownAttributeType(_)));
    }

    #[test]
    fn constants_are_parsed_and_reordered() {
        let registry = AttributeTypeRegistry::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let definition = CustomAttributeDefinition::new("CA_TAGS", AttributeType::Checkbox)
            .with_options(["A", "B", "C"])
            .with_constant(json!("C,A"));

        let value = registry
            .generate(&definition, &ctx(), &mut rng)
            .expect("constant value");
        assert_eq!(
            value,
            AttributeValue::ChoiceSet(vec!["A".to_string(), "C".to_string()])
        );
        assert_eq!(registry.serialize(&value), "A,C");
    }

    #[test]
    fn non_conforming_constant_is_rejected() {
        let registry = AttributeTypeRegistry::new();
        let definition = CustomAttributeDefinition::new("CA_MONEY", AttributeType::Money)
            .with_constant(json!(20000.5));
        let err = registry
            .check_definitions(std::slice::from_ref(&definition))
            .expect_err("out of range");
        assert!(matches!(err, GenerationError::InvalidConfig(_)));
    }

    #[test]
    fn money_renders_two_decimals() {
        assert_eq!(AttributeValue::Money(100).to_string(), "1.00");
        assert_eq!(AttributeValue::Money(1_000_000).to_string(), "10000.00");
        assert_eq!(AttributeValue::Money(12_345).to_string(), "123.45");
    }
}
