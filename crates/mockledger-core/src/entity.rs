use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed catalog of generated business entities.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Order,
    Invoice,
    PurchaseOrder,
    PurchaseInvoice,
    Payment,
    PurchasePayment,
}

impl EntityKind {
    /// All kinds in dependency order: parents always precede dependents.
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Account,
        EntityKind::Order,
        EntityKind::Invoice,
        EntityKind::PurchaseOrder,
        EntityKind::PurchaseInvoice,
        EntityKind::Payment,
        EntityKind::PurchasePayment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Account => "account",
            EntityKind::Order => "order",
            EntityKind::Invoice => "invoice",
            EntityKind::PurchaseOrder => "purchase_order",
            EntityKind::PurchaseInvoice => "purchase_invoice",
            EntityKind::Payment => "payment",
            EntityKind::PurchasePayment => "purchase_payment",
        }
    }

    /// Upper-case tag used in output file names.
    pub fn file_tag(self) -> &'static str {
        match self {
            EntityKind::Account => "ACCOUNT",
            EntityKind::Order => "ORDER",
            EntityKind::Invoice => "INVOICE",
            EntityKind::PurchaseOrder => "PURCHASE_ORDER",
            EntityKind::PurchaseInvoice => "PURCHASE_INVOICE",
            EntityKind::Payment => "PAYMENT",
            EntityKind::PurchasePayment => "PURCHASE_PAYMENT",
        }
    }

    /// Column prefix for header-level custom attributes.
    pub fn attribute_prefix(self) -> &'static str {
        match self {
            EntityKind::Account => "ca_account_attr_",
            EntityKind::Order => "ca_order_attr_",
            EntityKind::Invoice => "ca_invoice_attr_",
            EntityKind::PurchaseOrder => "ca_purchase_order_attr_",
            EntityKind::PurchaseInvoice => "ca_purchase_invoice_attr_",
            EntityKind::Payment => "ca_payment_attr_",
            EntityKind::PurchasePayment => "ca_purchase_payment_attr_",
        }
    }

    /// Column prefix for line-item custom attributes, if the kind has line items.
    pub fn line_item_attribute_prefix(self) -> Option<&'static str> {
        match self {
            EntityKind::Order => Some("ca_order_line_item_attr_"),
            EntityKind::Invoice => Some("ca_invoice_item_attr_"),
            EntityKind::PurchaseOrder => Some("ca_purchase_order_item_attr_"),
            EntityKind::PurchaseInvoice => Some("ca_purchase_invoice_item_attr_"),
            EntityKind::Account | EntityKind::Payment | EntityKind::PurchasePayment => None,
        }
    }

    pub fn has_line_items(self) -> bool {
        self.line_item_attribute_prefix().is_some()
    }

    /// Kinds whose generation requires a parent reference.
    pub fn is_dependent(self) -> bool {
        !matches!(self, EntityKind::Account)
    }

    /// Kinds settling invoices of a parent document kind.
    pub fn is_payment(self) -> bool {
        matches!(self, EntityKind::Payment | EntityKind::PurchasePayment)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let normalized = value.trim().to_lowercase().replace(['-', ' '], "_");
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::UnknownEntityKind(value.to_string()))
    }
}

/// Which item kinds may appear on document line items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemMode {
    SystemOnly,
    LineOnly,
    #[default]
    Both,
}

impl ItemMode {
    pub fn includes_system_items(self) -> bool {
        matches!(self, ItemMode::SystemOnly | ItemMode::Both)
    }

    pub fn includes_line_items(self) -> bool {
        matches!(self, ItemMode::LineOnly | ItemMode::Both)
    }
}

impl FromStr for ItemMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().replace('-', "_").as_str() {
            "1" | "system_only" | "system" => Ok(ItemMode::SystemOnly),
            "2" | "line_only" | "line" => Ok(ItemMode::LineOnly),
            "3" | "both" => Ok(ItemMode::Both),
            _ => Err(Error::UnknownItemMode(value.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_order_puts_payments_last() {
        assert_eq!(EntityKind::ALL.first(), Some(&EntityKind::Account));
        let payments: Vec<EntityKind> = EntityKind::ALL[5..].to_vec();
        assert_eq!(
            payments,
            vec![EntityKind::Payment, EntityKind::PurchasePayment]
        );
        assert!(payments.iter().all(|kind| kind.is_payment()));
    }

    #[test]
    fn parses_kind_names_with_dashes() {
        assert_eq!(
            "purchase-invoice".parse::<EntityKind>(),
            Ok(EntityKind::PurchaseInvoice)
        );
        assert!("supplier".parse::<EntityKind>().is_err());
    }

    #[test]
    fn serializes_kind_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(EntityKind::PurchaseOrder, 3_u64);
        let json = serde_json::to_string(&map).expect("serialize map");
        assert_eq!(json, r#"{"purchase_order":3}"#);
    }
}
