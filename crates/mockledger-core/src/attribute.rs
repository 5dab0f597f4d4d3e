use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options used by choice-typed attributes when the user does not supply any.
pub const DEFAULT_CHOICE_OPTIONS: &[&str] = &["A", "B", "C", "D"];
pub const DEFAULT_QUANTITY_MIN: i64 = 1;
pub const DEFAULT_QUANTITY_MAX: i64 = 50;

/// Closed catalog of custom attribute value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Bool,
    Checkbox,
    Date,
    Dropdown,
    DropdownMultiselect,
    Money,
    Quantity,
    Number,
    Radio,
    Text,
    /// Single generic word.
    String,
}

impl AttributeType {
    pub const ALL: [AttributeType; 11] = [
        AttributeType::Bool,
        AttributeType::Checkbox,
        AttributeType::Date,
        AttributeType::Dropdown,
        AttributeType::DropdownMultiselect,
        AttributeType::Money,
        AttributeType::Quantity,
        AttributeType::Number,
        AttributeType::Radio,
        AttributeType::Text,
        AttributeType::String,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttributeType::Bool => "bool",
            AttributeType::Checkbox => "checkbox",
            AttributeType::Date => "date",
            AttributeType::Dropdown => "dropdown",
            AttributeType::DropdownMultiselect => "dropdown_multiselect",
            AttributeType::Money => "money",
            AttributeType::Quantity => "quantity",
            AttributeType::Number => "number",
            AttributeType::Radio => "radio",
            AttributeType::Text => "text",
            AttributeType::String => "string",
        }
    }

    /// Types whose values are drawn from the definition's `options`.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            AttributeType::Checkbox
                | AttributeType::Dropdown
                | AttributeType::DropdownMultiselect
                | AttributeType::Radio
        )
    }

    /// Types that render as a delimiter-joined subset.
    pub fn is_multi_valued(self) -> bool {
        matches!(
            self,
            AttributeType::Checkbox | AttributeType::DropdownMultiselect
        )
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeType {
    type Err = Error;

    /// Accepts the canonical names plus the legacy menu spellings.
    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_lowercase();
        let attr_type = match normalized.as_str() {
            "bool" | "boolean" => AttributeType::Bool,
            "checkbox" | "checkboxes" => AttributeType::Checkbox,
            "date" => AttributeType::Date,
            "dropdown" => AttributeType::Dropdown,
            "dropdown_multiselect" | "dropdown_multi" | "multiselect" => {
                AttributeType::DropdownMultiselect
            }
            "money" => AttributeType::Money,
            "quantity" => AttributeType::Quantity,
            "number" => AttributeType::Number,
            "radio" => AttributeType::Radio,
            "text" => AttributeType::Text,
            "string" => AttributeType::String,
            _ => return Err(Error::UnknownAttributeType(value.to_string())),
        };
        Ok(attr_type)
    }
}

/// A user-defined, typed extra column attached to generated records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CustomAttributeDefinition {
    /// Attribute name; the output column is `<entity prefix><NAME>`.
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Choice set for dropdown, radio, checkbox and multiselect types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_max: Option<i64>,
    /// Inclusive lower bound for date values (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_min: Option<String>,
    /// Inclusive upper bound for date values (`YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_max: Option<String>,
    /// Emit `value` on every record instead of generating one.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub constant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl CustomAttributeDefinition {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: normalize_attribute_name(&name.into()),
            attr_type,
            options: Vec::new(),
            quantity_min: None,
            quantity_max: None,
            date_min: None,
            date_max: None,
            constant: false,
            value: None,
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_quantity_range(mut self, min: i64, max: i64) -> Self {
        self.quantity_min = Some(min);
        self.quantity_max = Some(max);
        self
    }

    pub fn with_constant(mut self, value: serde_json::Value) -> Self {
        self.constant = true;
        self.value = Some(value);
        self
    }

    /// Output column name under the given entity prefix.
    pub fn column_name(&self, prefix: &str) -> String {
        format!("{prefix}{}", normalize_attribute_name(&self.name))
    }

    /// Inclusive quantity bounds, falling back to the 1-50 default.
    pub fn quantity_range(&self) -> (i64, i64) {
        (
            self.quantity_min.unwrap_or(DEFAULT_QUANTITY_MIN),
            self.quantity_max.unwrap_or(DEFAULT_QUANTITY_MAX),
        )
    }
}

/// Upper-cases the name and replaces whitespace with underscores.
pub fn normalize_attribute_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

/// The fixed demo set of ten definitions, one per attribute type.
pub fn default_definitions() -> Vec<CustomAttributeDefinition> {
    let options = DEFAULT_CHOICE_OPTIONS.iter().copied();
    vec![
        CustomAttributeDefinition::new("CA_BOOL", AttributeType::Bool),
        CustomAttributeDefinition::new("CA_CHECKBOX", AttributeType::Checkbox)
            .with_options(options.clone()),
        CustomAttributeDefinition::new("CA_DATE", AttributeType::Date),
        CustomAttributeDefinition::new("CA_DROPDOWN", AttributeType::Dropdown)
            .with_options(options.clone()),
        CustomAttributeDefinition::new(
            "CA_DROPDOWN_WITH_MULTISELECT",
            AttributeType::DropdownMultiselect,
        )
        .with_options(options.clone()),
        CustomAttributeDefinition::new("CA_MONEY", AttributeType::Money),
        CustomAttributeDefinition::new("CA_QUANTITY", AttributeType::Quantity)
            .with_quantity_range(DEFAULT_QUANTITY_MIN, DEFAULT_QUANTITY_MAX),
        CustomAttributeDefinition::new("CA_NUMBER", AttributeType::Number),
        CustomAttributeDefinition::new("CA_RADIO", AttributeType::Radio).with_options(options),
        CustomAttributeDefinition::new("CA_TEXT", AttributeType::Text),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_type_names() {
        assert_eq!(
            "checkboxes".parse::<AttributeType>(),
            Ok(AttributeType::Checkbox)
        );
        assert_eq!(
            "dropdown_multi".parse::<AttributeType>(),
            Ok(AttributeType::DropdownMultiselect)
        );
        assert_eq!(" Boolean ".parse::<AttributeType>(), Ok(AttributeType::Bool));
        assert_eq!(
            "currency".parse::<AttributeType>(),
            Err(Error::UnknownAttributeType("currency".to_string()))
        );
    }

    #[test]
    fn default_set_has_one_of_each_core_type() {
        let defaults = default_definitions();
        assert_eq!(defaults.len(), 10);
        for attr_type in AttributeType::ALL
            .iter()
            .filter(|t| **t != AttributeType::String)
        {
            assert_eq!(
                defaults.iter().filter(|d| d.attr_type == *attr_type).count(),
                1,
                "{attr_type} should appear exactly once"
            );
        }
    }

    #[test]
    fn column_name_normalizes_user_input() {
        let def = CustomAttributeDefinition::new("region code", AttributeType::Text);
        assert_eq!(def.column_name("ca_account_attr_"), "ca_account_attr_REGION_CODE");
    }
}
