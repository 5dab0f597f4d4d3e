use std::collections::BTreeMap;

use mockledger_core::EntityKind;

use crate::attributes::AttributeValue;
use crate::linker::Relation;

/// A materialised custom attribute on a record or line item.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAttributeValue {
    pub name: String,
    pub column: String,
    pub value: AttributeValue,
}

/// Primary postal address of an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalAddress {
    /// Between one and five populated lines.
    pub lines: Vec<String>,
    pub post_code: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub is_default_billing: bool,
    pub is_default_shipping: bool,
}

const ADDRESS_PREFIX: &str = "address_1_";
const ADDRESS_TAIL: [&str; 6] = [
    "post_code",
    "city",
    "state",
    "country",
    "is_default_billing",
    "is_default_shipping",
];

impl PostalAddress {
    pub fn columns(lines: usize) -> Vec<String> {
        (1..=lines)
            .map(|idx| format!("{ADDRESS_PREFIX}address_line_{idx}"))
            .chain(
                ADDRESS_TAIL
                    .iter()
                    .map(|field| format!("{ADDRESS_PREFIX}{field}")),
            )
            .collect()
    }

    pub fn cells(&self) -> Vec<(String, String)> {
        let tail = [
            self.post_code.clone(),
            self.city.clone(),
            self.state.clone(),
            self.country.clone(),
            yes_no(self.is_default_billing),
            yes_no(self.is_default_shipping),
        ];
        Self::columns(self.lines.len())
            .into_iter()
            .zip(self.lines.iter().cloned().chain(tail))
            .collect()
    }
}

pub const CONTACT_FIELDS: [&str; 20] = [
    "salutation",
    "designation",
    "first_name",
    "middle_name",
    "last_name",
    "email_address",
    "email_address_do_not_email",
    "address_line_1",
    "address_line_2",
    "address_line_3",
    "address_line_4",
    "address_line_5",
    "post_code",
    "phone",
    "phone_do_not_call",
    "fax",
    "fax_do_not_call",
    "mobile",
    "mobile_do_not_call",
    "receive_billing_information",
];

/// A person attached to an account. Opt-out flags are `YES`, `NO` or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub salutation: String,
    pub designation: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub email_address: String,
    pub email_do_not_email: String,
    pub address_lines: [String; 5],
    pub post_code: String,
    pub phone: String,
    pub phone_do_not_call: String,
    pub fax: String,
    pub fax_do_not_call: String,
    pub mobile: String,
    pub mobile_do_not_call: String,
    pub receive_billing_information: String,
}

impl Contact {
    /// Columns of the contact at 1-based `index`.
    pub fn columns(index: usize) -> Vec<String> {
        CONTACT_FIELDS
            .iter()
            .map(|field| format!("contact_{index}_{field}"))
            .collect()
    }

    pub fn cells(&self, index: usize) -> Vec<(String, String)> {
        let [line_1, line_2, line_3, line_4, line_5] = self.address_lines.clone();
        let values = [
            self.salutation.clone(),
            self.designation.clone(),
            self.first_name.clone(),
            self.middle_name.clone(),
            self.last_name.clone(),
            self.email_address.clone(),
            self.email_do_not_email.clone(),
            line_1,
            line_2,
            line_3,
            line_4,
            line_5,
            self.post_code.clone(),
            self.phone.clone(),
            self.phone_do_not_call.clone(),
            self.fax.clone(),
            self.fax_do_not_call.clone(),
            self.mobile.clone(),
            self.mobile_do_not_call.clone(),
            self.receive_billing_information.clone(),
        ];
        Self::columns(index).into_iter().zip(values).collect()
    }
}

/// What a line item sells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemRef {
    /// Reference into the system item catalog.
    System(String),
    /// Free-text line with a generated name.
    AdHoc(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: String,
    pub parent_id: String,
    pub item: ItemRef,
    pub quantity: i64,
    pub unit_amount_cents: i64,
    /// Rendered line columns, including id, item and amounts.
    pub cells: BTreeMap<String, String>,
    pub custom_attributes: Vec<CustomAttributeValue>,
}

/// One generated business record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityRecord {
    pub id: String,
    /// Core, reference and optional header cells by column.
    pub fields: BTreeMap<String, String>,
    pub references: Vec<(Relation, String)>,
    pub address: Option<PostalAddress>,
    pub contacts: Vec<Contact>,
    pub custom_attributes: Vec<CustomAttributeValue>,
    pub line_items: Vec<LineItem>,
}

impl EntityRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    pub fn references_to(&self, relation: Relation) -> impl Iterator<Item = &str> {
        self.references
            .iter()
            .filter(move |(rel, _)| *rel == relation)
            .map(|(_, id)| id.as_str())
    }

    /// Every header cell: fields, sub-collections and custom attributes.
    pub fn header_cells(&self) -> BTreeMap<String, String> {
        let mut cells = self.fields.clone();
        if let Some(address) = &self.address {
            cells.extend(address.cells());
        }
        for (idx, contact) in self.contacts.iter().enumerate() {
            cells.extend(contact.cells(idx + 1));
        }
        for attr in &self.custom_attributes {
            cells.insert(attr.column.clone(), attr.value.to_string());
        }
        cells
    }
}

/// All records of one entity kind plus the flat column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTable {
    pub kind: EntityKind,
    pub columns: Vec<String>,
    pub records: Vec<EntityRecord>,
    /// Header columns kept on every flattened line-item row.
    pub retained: Vec<String>,
    /// Records with several references of this relation emit one full row
    /// per reference, written into the named column.
    pub fan_out: Option<(Relation, String)>,
}

impl GeneratedTable {
    pub fn new(kind: EntityKind, columns: Vec<String>) -> Self {
        Self {
            kind,
            columns,
            records: Vec::new(),
            retained: Vec::new(),
            fan_out: None,
        }
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Flat rows in column order.
    pub fn rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for record in &self.records {
            let header = record.header_cells();
            if !record.line_items.is_empty() {
                for (idx, item) in record.line_items.iter().enumerate() {
                    let mut cells = if idx == 0 {
                        header.clone()
                    } else {
                        header
                            .iter()
                            .filter(|(column, _)| self.retained.contains(column))
                            .map(|(column, value)| (column.clone(), value.clone()))
                            .collect()
                    };
                    cells.extend(item.cells.clone());
                    for attr in &item.custom_attributes {
                        cells.insert(attr.column.clone(), attr.value.to_string());
                    }
                    rows.push(self.ordered(&cells));
                }
                continue;
            }
            match &self.fan_out {
                Some((relation, column)) if record.references_to(*relation).count() > 1 => {
                    for target in record.references_to(*relation) {
                        let mut cells = header.clone();
                        cells.insert(column.clone(), target.to_string());
                        rows.push(self.ordered(&cells));
                    }
                }
                _ => rows.push(self.ordered(&header)),
            }
        }
        rows
    }

    fn ordered(&self, cells: &BTreeMap<String, String>) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| cells.get(column).cloned().unwrap_or_default())
            .collect()
    }
}

pub(crate) fn yes_no(value: bool) -> String {
    if value { "YES" } else { "NO" }.to_string()
}
