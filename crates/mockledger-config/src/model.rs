use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use mockledger_core::{CONFIG_VERSION, CustomAttributeDefinition, EntityKind, ItemMode};

pub const DEFAULT_RECORD_COUNT: u64 = 200;
pub const DEFAULT_CURRENCY: &str = "AUD";
pub const DEFAULT_MAX_ITEMS_PER_DOCUMENT: u32 = 5;
pub const DEFAULT_DISCOUNT_PROBABILITY: f64 = 0.12;
pub const MAX_SUB_RECORDS: u8 = 5;

/// Custom attribute schema for one entity kind and scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AttributeSchema {
    /// When enabled without defaults, at least one definition is required.
    pub enabled: bool,
    /// Replace `definitions` with the fixed demo set of ten.
    pub use_defaults: bool,
    pub definitions: Vec<CustomAttributeDefinition>,
}

impl AttributeSchema {
    pub fn with_definitions(definitions: Vec<CustomAttributeDefinition>) -> Self {
        Self {
            enabled: !definitions.is_empty(),
            use_defaults: false,
            definitions,
        }
    }

    pub fn defaults() -> Self {
        Self {
            enabled: true,
            use_defaults: true,
            definitions: mockledger_core::default_definitions(),
        }
    }
}

/// Toggles for optional output columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OptionalColumns {
    pub payment_methods: bool,
    pub tax: bool,
    pub accounting_code: bool,
    pub group: bool,
    pub custom_form: bool,
    pub user_team: bool,
}

impl OptionalColumns {
    pub fn any(&self) -> bool {
        self.payment_methods
            || self.tax
            || self.accounting_code
            || self.group
            || self.custom_form
            || self.user_team
    }
}

/// Stored payment methods attached to each account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PaymentMethodConfig {
    pub direct_debit_count: u32,
    pub other_count: u32,
    pub direct_debit_processor: String,
    /// Processor per OTHER method slot; the last entry repeats for extra slots.
    pub other_processors: Vec<String>,
}

/// Account group assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GroupConfig {
    pub names: Vec<String>,
    /// Number of accounts receiving a group, capped at the record count.
    pub assign_count: u64,
}

/// Custom form references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CustomFormConfig {
    pub names: Vec<String>,
    /// Share of records (0-100) that receive a custom form reference.
    pub assign_percent: f64,
}

impl Default for CustomFormConfig {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            assign_percent: 100.0,
        }
    }
}

/// Line item generation settings for document kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ItemConfig {
    pub mode: ItemMode,
    pub system_item_ids: Vec<String>,
    pub max_items_per_document: u32,
    pub discount_probability: f64,
}

impl Default for ItemConfig {
    fn default() -> Self {
        Self {
            mode: ItemMode::Both,
            system_item_ids: Vec::new(),
            max_items_per_document: DEFAULT_MAX_ITEMS_PER_DOCUMENT,
            discount_probability: DEFAULT_DISCOUNT_PROBABILITY,
        }
    }
}

/// Settings shared by customer and supplier payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PaymentConfig {
    /// Spread each payment across 2-5 distinct invoices.
    pub multi_invoice: bool,
    pub min_amount: f64,
    pub max_amount: f64,
    pub processors: Vec<String>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            multi_invoice: false,
            min_amount: 100.0,
            max_amount: 50_000.0,
            processors: vec!["Cash".to_string()],
        }
    }
}

/// Rule used to choose which parent identifier a dependent record references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipPolicy {
    /// Uniform random choice with replacement.
    #[default]
    Uniform,
    /// Cycle through the pool in order.
    RoundRobin,
    /// Zipf-like preference for earlier pool entries.
    Weighted { skew: f64 },
}

impl fmt::Display for RelationshipPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipPolicy::Uniform => f.write_str("uniform"),
            RelationshipPolicy::RoundRobin => f.write_str("round_robin"),
            RelationshipPolicy::Weighted { skew } => write!(f, "weighted:{skew}"),
        }
    }
}

impl FromStr for RelationshipPolicy {
    type Err = String;

    /// Parses `uniform`, `round_robin` or `weighted[:skew]`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase().replace('-', "_");
        let (name, arg) = match normalized.split_once(':') {
            Some((name, arg)) => (name.to_string(), Some(arg.to_string())),
            None => (normalized, None),
        };
        match (name.as_str(), arg) {
            ("uniform", None) => Ok(RelationshipPolicy::Uniform),
            ("round_robin", None) => Ok(RelationshipPolicy::RoundRobin),
            ("weighted", None) => Ok(RelationshipPolicy::Weighted { skew: 1.0 }),
            ("weighted", Some(arg)) => arg
                .parse::<f64>()
                .map(|skew| RelationshipPolicy::Weighted { skew })
                .map_err(|_| format!("invalid weighted skew '{arg}'")),
            _ => Err(format!("unknown relationship policy '{value}'")),
        }
    }
}

/// Every resolved decision for one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConfigurationModel {
    pub config_version: String,
    /// Records per entity kind unless overridden in `record_counts`.
    pub record_count: u64,
    pub record_counts: BTreeMap<EntityKind, u64>,
    /// Entity kinds to generate; generation follows dependency order.
    pub entities: Vec<EntityKind>,
    pub seed: Option<u64>,
    /// Anchor for generated dates (`YYYY-MM-DD`); defaults to today.
    pub base_date: Option<String>,
    pub default_currency: String,
    pub address_lines: u8,
    pub contacts: u8,
    pub custom_attributes: BTreeMap<EntityKind, AttributeSchema>,
    pub line_item_custom_attributes: BTreeMap<EntityKind, AttributeSchema>,
    pub optional_columns: OptionalColumns,
    pub payment_methods: PaymentMethodConfig,
    pub groups: GroupConfig,
    pub custom_forms: CustomFormConfig,
    pub user_teams: Vec<String>,
    pub tax_uuids: Vec<String>,
    pub items: ItemConfig,
    /// External customer account ids.
    pub account_ids: Vec<String>,
    /// External supplier account ids.
    pub supplier_account_ids: Vec<String>,
    /// External invoice ids for payments.
    pub invoice_ids: Vec<String>,
    /// External purchase invoice ids for purchase payments.
    pub purchase_invoice_ids: Vec<String>,
    pub relationship_policy: RelationshipPolicy,
    pub payments: PaymentConfig,
}

impl Default for ConfigurationModel {
    fn default() -> Self {
        Self {
            config_version: CONFIG_VERSION.to_string(),
            record_count: DEFAULT_RECORD_COUNT,
            record_counts: BTreeMap::new(),
            entities: vec![EntityKind::Account],
            seed: None,
            base_date: None,
            default_currency: DEFAULT_CURRENCY.to_string(),
            address_lines: 1,
            contacts: 1,
            custom_attributes: BTreeMap::new(),
            line_item_custom_attributes: BTreeMap::new(),
            optional_columns: OptionalColumns::default(),
            payment_methods: PaymentMethodConfig::default(),
            groups: GroupConfig::default(),
            custom_forms: CustomFormConfig::default(),
            user_teams: Vec::new(),
            tax_uuids: Vec::new(),
            items: ItemConfig::default(),
            account_ids: Vec::new(),
            supplier_account_ids: Vec::new(),
            invoice_ids: Vec::new(),
            purchase_invoice_ids: Vec::new(),
            relationship_policy: RelationshipPolicy::Uniform,
            payments: PaymentConfig::default(),
        }
    }
}

impl ConfigurationModel {
    /// Requested record count for a kind.
    pub fn count_for(&self, kind: EntityKind) -> u64 {
        self.record_counts
            .get(&kind)
            .copied()
            .unwrap_or(self.record_count)
    }

    /// Configured kinds, deduplicated, in dependency order.
    pub fn ordered_entities(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.entities.contains(kind))
            .collect()
    }

    pub fn generates(&self, kind: EntityKind) -> bool {
        self.entities.contains(&kind)
    }

    /// Header-level custom attribute definitions for a kind.
    pub fn header_attributes(&self, kind: EntityKind) -> &[CustomAttributeDefinition] {
        self.custom_attributes
            .get(&kind)
            .map(|schema| schema.definitions.as_slice())
            .unwrap_or(&[])
    }

    /// Line-item custom attribute definitions for a kind.
    pub fn line_item_attributes(&self, kind: EntityKind) -> &[CustomAttributeDefinition] {
        self.line_item_custom_attributes
            .get(&kind)
            .map(|schema| schema.definitions.as_slice())
            .unwrap_or(&[])
    }

    /// Copy of this configuration generating `count` records of every kind.
    pub fn with_record_count(&self, count: u64) -> Self {
        let mut config = self.clone();
        config.record_count = count;
        config.record_counts.clear();
        config
    }
}

/// Split comma-separated identifiers, preserving order and duplicates.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .collect()
}
