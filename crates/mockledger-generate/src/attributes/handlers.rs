use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use fake::Fake;
use fake::faker::lorem::en::{Word, Words};
use rand::{Rng, RngCore};
use serde_json::Value;

use mockledger_config::parse_date;
use mockledger_core::{AttributeType, CustomAttributeDefinition};

use super::{
    AttributeContext, AttributeHandler, AttributeTypeRegistry, AttributeValue, DATE_SPAN_DAYS,
    MONEY_MAX_CENTS, MONEY_MIN_CENTS,
};
use crate::errors::GenerationError;

pub const NUMBER_MIN: i64 = 0;
pub const NUMBER_MAX: i64 = 1000;
pub const TEXT_WORDS: usize = 6;

pub(super) fn register(registry: &mut AttributeTypeRegistry) {
    registry.register(Box::new(BoolHandler));
    registry.register(Box::new(ChoiceSetHandler::new(AttributeType::Checkbox)));
    registry.register(Box::new(DateHandler));
    registry.register(Box::new(ChoiceHandler::new(AttributeType::Dropdown)));
    registry.register(Box::new(ChoiceSetHandler::new(
        AttributeType::DropdownMultiselect,
    )));
    registry.register(Box::new(MoneyHandler));
    registry.register(Box::new(IntegerHandler::new(AttributeType::Quantity)));
    registry.register(Box::new(IntegerHandler::new(AttributeType::Number)));
    registry.register(Box::new(ChoiceHandler::new(AttributeType::Radio)));
    registry.register(Box::new(WordsHandler::new(AttributeType::Text, TEXT_WORDS)));
    registry.register(Box::new(WordsHandler::new(AttributeType::String, 1)));
}

pub struct BoolHandler;

impl AttributeHandler for BoolHandler {
    fn attr_type(&self) -> AttributeType {
        AttributeType::Bool
    }

    fn generate(
        &self,
        _definition: &CustomAttributeDefinition,
        _ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError> {
        Ok(AttributeValue::Bool(rng.random_bool(0.5)))
    }

    fn validate(&self, _definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool {
        matches!(value, AttributeValue::Bool(_))
    }

    fn parse(&self, _definition: &CustomAttributeDefinition, raw: &Value) -> Option<AttributeValue> {
        match raw {
            Value::Bool(value) => Some(AttributeValue::Bool(*value)),
            Value::String(text) => match text.trim().to_lowercase().as_str() {
                "true" => Some(AttributeValue::Bool(true)),
                "false" => Some(AttributeValue::Bool(false)),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Single element of the choice set (dropdown, radio).
pub struct ChoiceHandler {
    attr_type: AttributeType,
}

impl ChoiceHandler {
    pub fn new(attr_type: AttributeType) -> Self {
        Self { attr_type }
    }
}

impl AttributeHandler for ChoiceHandler {
    fn attr_type(&self) -> AttributeType {
        self.attr_type
    }

    fn generate(
        &self,
        definition: &CustomAttributeDefinition,
        _ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError> {
        let options = require_options(definition)?;
        let idx = rng.random_range(0..options.len());
        Ok(AttributeValue::Choice(options[idx].clone()))
    }

    fn validate(&self, definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool {
        match value {
            AttributeValue::Choice(choice) => definition.options.contains(choice),
            _ => false,
        }
    }

    fn parse(&self, _definition: &CustomAttributeDefinition, raw: &Value) -> Option<AttributeValue> {
        raw.as_str()
            .map(|choice| AttributeValue::Choice(choice.trim().to_string()))
    }
}

/// Non-empty, duplicate-free subset of the choice set (checkbox, multiselect).
pub struct ChoiceSetHandler {
    attr_type: AttributeType,
}

impl ChoiceSetHandler {
    pub fn new(attr_type: AttributeType) -> Self {
        Self { attr_type }
    }
}

impl AttributeHandler for ChoiceSetHandler {
    fn attr_type(&self) -> AttributeType {
        self.attr_type
    }

    fn generate(
        &self,
        definition: &CustomAttributeDefinition,
        _ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError> {
        let options = require_options(definition)?;
        let amount = rng.random_range(1..=options.len());
        let mut picked = rand::seq::index::sample(rng, options.len(), amount).into_vec();
        picked.sort_unstable();
        Ok(AttributeValue::ChoiceSet(
            picked.into_iter().map(|idx| options[idx].clone()).collect(),
        ))
    }

    fn validate(&self, definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool {
        let AttributeValue::ChoiceSet(values) = value else {
            return false;
        };
        let unique: HashSet<&String> = values.iter().collect();
        !values.is_empty()
            && unique.len() == values.len()
            && values.iter().all(|value| definition.options.contains(value))
    }

    fn parse(&self, definition: &CustomAttributeDefinition, raw: &Value) -> Option<AttributeValue> {
        let chosen: Vec<String> = match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(|s| s.trim().to_string()))
                .collect::<Option<Vec<_>>>()?,
            Value::String(text) => text
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string)
                .collect(),
            _ => return None,
        };
        let unique: HashSet<&String> = chosen.iter().collect();
        if unique.len() != chosen.len() || chosen.iter().any(|c| !definition.options.contains(c)) {
            return None;
        }
        let ordered = definition
            .options
            .iter()
            .filter(|option| chosen.contains(option))
            .cloned()
            .collect();
        Some(AttributeValue::ChoiceSet(ordered))
    }
}

pub struct DateHandler;

impl DateHandler {
    fn bounds(
        definition: &CustomAttributeDefinition,
        base_date: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate), GenerationError> {
        let min = date_bound(definition, definition.date_min.as_deref())?
            .unwrap_or(base_date - Duration::days(DATE_SPAN_DAYS));
        let max = date_bound(definition, definition.date_max.as_deref())?
            .unwrap_or(base_date + Duration::days(DATE_SPAN_DAYS));
        if min > max {
            return Err(GenerationError::InvalidConfig(format!(
                "attribute '{}': date_min must be <= date_max",
                definition.name
            )));
        }
        Ok((min, max))
    }
}

impl AttributeHandler for DateHandler {
    fn attr_type(&self) -> AttributeType {
        AttributeType::Date
    }

    fn generate(
        &self,
        definition: &CustomAttributeDefinition,
        ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError> {
        let (min, max) = Self::bounds(definition, ctx.base_date)?;
        let span = (max - min).num_days();
        let offset = rng.random_range(0..=span);
        Ok(AttributeValue::Date(min + Duration::days(offset)))
    }

    fn validate(&self, definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool {
        let AttributeValue::Date(date) = value else {
            return false;
        };
        let min = definition.date_min.as_deref().and_then(parse_date);
        let max = definition.date_max.as_deref().and_then(parse_date);
        min.is_none_or(|min| *date >= min) && max.is_none_or(|max| *date <= max)
    }

    fn parse(&self, _definition: &CustomAttributeDefinition, raw: &Value) -> Option<AttributeValue> {
        raw.as_str().and_then(parse_date).map(AttributeValue::Date)
    }
}

pub struct MoneyHandler;

impl AttributeHandler for MoneyHandler {
    fn attr_type(&self) -> AttributeType {
        AttributeType::Money
    }

    fn generate(
        &self,
        _definition: &CustomAttributeDefinition,
        _ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError> {
        Ok(AttributeValue::Money(
            rng.random_range(MONEY_MIN_CENTS..=MONEY_MAX_CENTS),
        ))
    }

    fn validate(&self, _definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool {
        matches!(value, AttributeValue::Money(cents) if (MONEY_MIN_CENTS..=MONEY_MAX_CENTS).contains(cents))
    }

    fn parse(&self, _definition: &CustomAttributeDefinition, raw: &Value) -> Option<AttributeValue> {
        let amount = match raw {
            Value::Number(number) => number.as_f64()?,
            Value::String(text) => text.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if !amount.is_finite() {
            return None;
        }
        Some(AttributeValue::Money((amount * 100.0).round() as i64))
    }
}

/// Inclusive integer range: quantity uses the definition bounds, number 0-1000.
pub struct IntegerHandler {
    attr_type: AttributeType,
}

impl IntegerHandler {
    pub fn new(attr_type: AttributeType) -> Self {
        Self { attr_type }
    }

    fn range(&self, definition: &CustomAttributeDefinition) -> (i64, i64) {
        match self.attr_type {
            AttributeType::Quantity => definition.quantity_range(),
            _ => (NUMBER_MIN, NUMBER_MAX),
        }
    }
}

impl AttributeHandler for IntegerHandler {
    fn attr_type(&self) -> AttributeType {
        self.attr_type
    }

    fn generate(
        &self,
        definition: &CustomAttributeDefinition,
        _ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError> {
        let (min, max) = self.range(definition);
        if min > max {
            return Err(GenerationError::InvalidConfig(format!(
                "attribute '{}': quantity_min must be <= quantity_max",
                definition.name
            )));
        }
        Ok(AttributeValue::Integer(rng.random_range(min..=max)))
    }

    fn validate(&self, definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool {
        let (min, max) = self.range(definition);
        matches!(value, AttributeValue::Integer(n) if (min..=max).contains(n))
    }

    fn parse(&self, _definition: &CustomAttributeDefinition, raw: &Value) -> Option<AttributeValue> {
        match raw {
            Value::Number(number) => number.as_i64().map(AttributeValue::Integer),
            Value::String(text) => text.trim().parse().ok().map(AttributeValue::Integer),
            _ => None,
        }
    }
}

/// Space-joined words from the lorem pool (text: six, string: one).
pub struct WordsHandler {
    attr_type: AttributeType,
    words: usize,
}

impl WordsHandler {
    pub fn new(attr_type: AttributeType, words: usize) -> Self {
        Self { attr_type, words }
    }
}

impl AttributeHandler for WordsHandler {
    fn attr_type(&self) -> AttributeType {
        self.attr_type
    }

    fn generate(
        &self,
        _definition: &CustomAttributeDefinition,
        _ctx: &AttributeContext,
        rng: &mut dyn RngCore,
    ) -> Result<AttributeValue, GenerationError> {
        let text = if self.words == 1 {
            Word().fake_with_rng::<String, _>(rng)
        } else {
            let words: Vec<String> = Words(self.words..self.words + 1).fake_with_rng(rng);
            words.join(" ")
        };
        Ok(AttributeValue::Text(text))
    }

    fn validate(&self, _definition: &CustomAttributeDefinition, value: &AttributeValue) -> bool {
        matches!(value, AttributeValue::Text(text) if text.split_whitespace().count() == self.words)
    }

    fn parse(&self, _definition: &CustomAttributeDefinition, raw: &Value) -> Option<AttributeValue> {
        raw.as_str()
            .map(|text| AttributeValue::Text(text.split_whitespace().collect::<Vec<_>>().join(" ")))
    }
}

fn require_options(definition: &CustomAttributeDefinition) -> Result<&[String], GenerationError> {
    if definition.options.is_empty() {
        return Err(GenerationError::InvalidConfig(format!(
            "{} attribute '{}' has no options",
            definition.attr_type, definition.name
        )));
    }
    Ok(&definition.options)
}

fn date_bound(
    definition: &CustomAttributeDefinition,
    raw: Option<&str>,
) -> Result<Option<NaiveDate>, GenerationError> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_date(raw).map(Some).ok_or_else(|| {
            GenerationError::InvalidConfig(format!(
                "attribute '{}': '{raw}' is not a YYYY-MM-DD date",
                definition.name
            ))
        }),
    }
}
