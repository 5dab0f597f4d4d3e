use std::collections::HashSet;

use fake::Fake;
use fake::faker::address::en::{BuildingNumber, CityName, StateName, StreetName};
use rand::{Rng, RngCore};

use mockledger_core::CustomAttributeDefinition;

use crate::attributes::{AttributeContext, AttributeTypeRegistry};
use crate::errors::GenerationError;
use crate::table::CustomAttributeValue;

pub const ACCOUNTING_CODES: &[&str] = &[
    "Account Receivable",
    "Cash and Cash Equivalent",
    "Inventory",
    "Sales Revenue",
    "Event Charge",
    "Deduction",
    "Alteration",
    "Cancellation",
    "Chargeback",
];

const UNIT_TYPES: &[&str] = &["Apt.", "Unit", "Suite"];

pub fn pick<'a>(values: &[&'a str], rng: &mut dyn RngCore) -> &'a str {
    values[rng.random_range(0..values.len())]
}

/// Random element of a configured list, blank when the list is empty.
pub fn pick_owned(values: &[String], rng: &mut dyn RngCore) -> String {
    if values.is_empty() {
        return String::new();
    }
    values[rng.random_range(0..values.len())].clone()
}

pub fn yes_no_blank(rng: &mut dyn RngCore) -> String {
    pick(&["YES", "NO", ""], rng).to_string()
}

/// Landline in `0X XXXX XXXX` form.
pub fn phone(rng: &mut dyn RngCore) -> String {
    format!(
        "0{} {} {}",
        rng.random_range(2..=8),
        rng.random_range(1000..=9999),
        rng.random_range(1000..=9999)
    )
}

/// Mobile in `04XX XXX XXX` form.
pub fn mobile(rng: &mut dyn RngCore) -> String {
    format!(
        "04{:02} {} {}",
        rng.random_range(0..=99),
        rng.random_range(100..=999),
        rng.random_range(100..=999)
    )
}

pub fn post_code(rng: &mut dyn RngCore) -> String {
    rng.random_range(2000..=9999).to_string()
}

pub fn city(rng: &mut dyn RngCore) -> String {
    CityName().fake_with_rng(rng)
}

pub fn state(rng: &mut dyn RngCore) -> String {
    StateName().fake_with_rng(rng)
}

/// Street address, often prefixed with a unit.
pub fn street_address(rng: &mut dyn RngCore) -> String {
    let number: String = BuildingNumber().fake_with_rng(rng);
    let street: String = StreetName().fake_with_rng(rng);
    if rng.random_bool(0.6) {
        let unit = pick(UNIT_TYPES, rng);
        format!("{unit} {} {number} {street}", rng.random_range(1..=999))
    } else {
        format!("{number} {street}")
    }
}

/// The five address lines of a full address; lines two to five may be blank.
pub fn address_lines(rng: &mut dyn RngCore) -> [String; 5] {
    let line_2 = if rng.random_bool(0.5) {
        String::new()
    } else {
        match rng.random_range(0..4) {
            0 => format!("Apt. {}", rng.random_range(1..=999)),
            1 => format!("Suite {}", rng.random_range(100..=999)),
            2 => format!("Unit {}", rng.random_range(1..=99)),
            _ => format!("{}/", rng.random_range(1..=999)),
        }
    };
    let line_3 = pick(
        &[
            "",
            "Business Park",
            "Industrial Estate",
            "Corporate Centre",
            "Technology Park",
            "Office Tower",
        ],
        rng,
    )
    .to_string();
    let line_4 = match rng.random_range(0..5) {
        0 => String::new(),
        1 => format!("Level {}", rng.random_range(1..=25)),
        2 => format!("Building {}", pick(&["A", "B", "C", "D"], rng)),
        3 => "North Wing".to_string(),
        _ => "South Wing".to_string(),
    };
    let line_5 = pick(
        &[
            "",
            "CBD",
            "Business District",
            "Commercial Area",
            "City Centre",
        ],
        rng,
    )
    .to_string();
    [street_address(rng), line_2, line_3, line_4, line_5]
}

/// `1st`, `2nd`, `23rd`, `11th`.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Lower-cased name usable as a host name.
pub fn domain_stem(name: &str) -> String {
    let stem = name
        .to_lowercase()
        .replace('&', "and")
        .replace([',', '\'', '.'], "")
        .split_whitespace()
        .filter(|word| !matches!(*word, "pty" | "ltd" | "inc" | "corp" | "llc"))
        .collect::<Vec<_>>()
        .join("-");
    if stem.is_empty() {
        "example".to_string()
    } else {
        stem
    }
}

/// Distinct record positions out of `count`, `amount` of them.
pub fn sample_positions(count: u64, amount: u64, rng: &mut dyn RngCore) -> HashSet<u64> {
    let amount = amount.min(count) as usize;
    rand::seq::index::sample(rng, count as usize, amount)
        .into_iter()
        .map(|idx| idx as u64)
        .collect()
}

/// Output columns for a definition list under one prefix.
pub fn attribute_columns(definitions: &[CustomAttributeDefinition], prefix: &str) -> Vec<String> {
    definitions
        .iter()
        .map(|definition| definition.column_name(prefix))
        .collect()
}

/// Generate one value per definition, in definition order.
pub fn materialize_attributes(
    registry: &AttributeTypeRegistry,
    definitions: &[CustomAttributeDefinition],
    prefix: &str,
    ctx: &AttributeContext,
    rng: &mut dyn RngCore,
) -> Result<Vec<CustomAttributeValue>, GenerationError> {
    definitions
        .iter()
        .map(|definition| {
            Ok(CustomAttributeValue {
                name: definition.name.clone(),
                column: definition.column_name(prefix),
                value: registry.generate(definition, ctx, rng)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn ordinals_use_english_suffixes() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(22), "22nd");
        assert_eq!(ordinal(23), "23rd");
        assert_eq!(ordinal(30), "30th");
    }

    #[test]
    fn domain_stem_drops_company_suffixes() {
        assert_eq!(domain_stem("Apex Digital Pty Ltd"), "apex-digital");
        assert_eq!(domain_stem("Smith & Sons, Inc."), "smith-and-sons");
    }

    #[test]
    fn phone_numbers_match_local_formats() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let landline = phone(&mut rng);
        assert_eq!(landline.len(), 12);
        assert!(landline.starts_with('0'));
        let cell = mobile(&mut rng);
        assert_eq!(cell.len(), 12);
        assert!(cell.starts_with("04"));
    }

    #[test]
    fn sampled_positions_are_capped_by_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let positions = sample_positions(5, 9, &mut rng);
        assert_eq!(positions.len(), 5);
        assert!(positions.iter().all(|pos| *pos < 5));
    }
}
