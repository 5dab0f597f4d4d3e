use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use serde_json::Value;
use thiserror::Error;

use mockledger_config::{
    AttributeSchema, CustomFormConfig, DEFAULT_RECORD_COUNT, GroupConfig, ItemConfig,
    MAX_SUB_RECORDS, OptionalColumns, PartialConfig, PaymentConfig, PaymentMethodConfig,
    RelationshipPolicy, parse_id_list,
};
use mockledger_core::{
    AttributeType, CustomAttributeDefinition, DEFAULT_CHOICE_OPTIONS, DEFAULT_QUANTITY_MAX,
    DEFAULT_QUANTITY_MIN, EntityKind, ItemMode,
};

const MAX_ATTRIBUTES_PER_KIND: usize = 50;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt io error: {0}")]
    Io(#[from] io::Error),
}

/// Builds the interactive configuration layer by asking questions on a
/// terminal (or any reader/writer pair).
///
/// Only fields that no higher layer already supplies are asked. A blank
/// answer keeps the documented default; end of input stops asking and leaves
/// every remaining field unset.
pub struct PromptCollector<R, W> {
    input: R,
    output: W,
    exhausted: bool,
}

enum AttributeAnswer {
    Defaults,
    Count(usize),
}

impl<R: BufRead, W: Write> PromptCollector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            exhausted: false,
        }
    }

    pub fn collect(&mut self, known: &PartialConfig) -> Result<PartialConfig, PromptError> {
        let mut answers = PartialConfig::default();

        if known.record_count.is_none() {
            answers.record_count = self.ask_parsed(
                &format!("How many records per entity? (default {DEFAULT_RECORD_COUNT}): "),
                parse_positive,
            )?;
        }
        if known.entities.is_none() {
            answers.entities = self.ask_parsed(
                "Entities to generate (comma separated: account, order, invoice, \
                 purchase_order, purchase_invoice, payment, purchase_payment; \
                 default account): ",
                parse_entities,
            )?;
        }
        let entities = known
            .entities
            .clone()
            .or_else(|| answers.entities.clone())
            .unwrap_or_else(|| vec![EntityKind::Account]);
        let generates = |kind: EntityKind| entities.contains(&kind);

        if generates(EntityKind::Account) {
            if known.address_lines.is_none() {
                answers.address_lines = self.ask_parsed(
                    &format!("How many address lines per account? (1-{MAX_SUB_RECORDS}, default 1): "),
                    parse_cardinality,
                )?;
            }
            if known.contacts.is_none() {
                answers.contacts = self.ask_parsed(
                    &format!("How many contacts per account? (1-{MAX_SUB_RECORDS}, default 1): "),
                    parse_cardinality,
                )?;
            }
        }

        if known.custom_attributes.is_none() {
            answers.custom_attributes = self.collect_schemas(&entities, "")?;
        }
        let documents: Vec<EntityKind> = entities
            .iter()
            .copied()
            .filter(|kind| kind.has_line_items())
            .collect();
        if known.line_item_custom_attributes.is_none() && !documents.is_empty() {
            answers.line_item_custom_attributes = self.collect_schemas(&documents, " line items")?;
        }

        if known.optional_columns.is_none() {
            self.collect_optional_columns(known, generates(EntityKind::Account), &mut answers)?;
        }
        if known.items.is_none() && !documents.is_empty() {
            answers.items = self.collect_items()?;
        }

        let accounts = generates(EntityKind::Account);
        if !accounts
            && known.account_ids.is_none()
            && (generates(EntityKind::Order) || generates(EntityKind::Invoice))
        {
            answers.account_ids =
                self.ask_parsed("Existing customer account ids (comma separated): ", parse_ids)?;
        }
        if !accounts
            && known.supplier_account_ids.is_none()
            && (generates(EntityKind::PurchaseOrder) || generates(EntityKind::PurchaseInvoice))
        {
            answers.supplier_account_ids =
                self.ask_parsed("Existing supplier account ids (comma separated): ", parse_ids)?;
        }
        if generates(EntityKind::Payment)
            && !generates(EntityKind::Invoice)
            && known.invoice_ids.is_none()
        {
            answers.invoice_ids =
                self.ask_parsed("Existing invoice ids (comma separated): ", parse_ids)?;
        }
        if generates(EntityKind::PurchasePayment)
            && !generates(EntityKind::PurchaseInvoice)
            && known.purchase_invoice_ids.is_none()
        {
            answers.purchase_invoice_ids = self.ask_parsed(
                "Existing purchase invoice ids (comma separated): ",
                parse_ids,
            )?;
        }
        if entities.iter().any(|kind| kind.is_payment()) {
            if known.payments.is_none()
                && self.ask_yes_no("Spread each payment across several invoices? (y/N): ", false)?
            {
                answers.payments = Some(PaymentConfig {
                    multi_invoice: true,
                    ..PaymentConfig::default()
                });
            }
        }
        if known.relationship_policy.is_none() && entities.iter().any(|kind| kind.is_dependent()) {
            answers.relationship_policy = self.ask_parsed(
                "Relationship policy (uniform, round_robin, weighted[:skew]; default uniform): ",
                |raw| raw.parse::<RelationshipPolicy>(),
            )?;
        }
        if known.seed.is_none() {
            answers.seed = self.ask_parsed("Seed for repeatable output (blank for random): ", |raw| {
                raw.parse::<u64>()
                    .map_err(|_| format!("'{raw}' is not a non-negative integer"))
            })?;
        }

        Ok(answers)
    }

    fn collect_schemas(
        &mut self,
        kinds: &[EntityKind],
        scope: &str,
    ) -> Result<Option<BTreeMap<EntityKind, AttributeSchema>>, PromptError> {
        let mut schemas = BTreeMap::new();
        for &kind in kinds {
            let question = format!(
                "How many custom attributes for {kind}{scope}? (0 for none, d for the default set): "
            );
            match self.ask_parsed(&question, parse_attribute_answer)? {
                Some(AttributeAnswer::Defaults) => {
                    schemas.insert(kind, AttributeSchema::defaults());
                }
                Some(AttributeAnswer::Count(count)) if count > 0 => {
                    let mut definitions = Vec::with_capacity(count);
                    for index in 1..=count {
                        if let Some(definition) = self.collect_definition(index)? {
                            definitions.push(definition);
                        }
                    }
                    schemas.insert(kind, AttributeSchema::with_definitions(definitions));
                }
                _ => {}
            }
        }
        Ok((!schemas.is_empty()).then_some(schemas))
    }

    fn collect_definition(
        &mut self,
        index: usize,
    ) -> Result<Option<CustomAttributeDefinition>, PromptError> {
        let Some(name) = self.ask_parsed(&format!("  Attribute {index} name: "), parse_text)? else {
            return Ok(None);
        };
        let names: Vec<String> = AttributeType::ALL
            .iter()
            .enumerate()
            .map(|(idx, ty)| format!("{}={ty}", idx + 1))
            .collect();
        let attr_type = self
            .ask_parsed(
                &format!("  Type ({}; default text): ", names.join(", ")),
                parse_attribute_type,
            )?
            .unwrap_or(AttributeType::Text);

        let mut definition = CustomAttributeDefinition::new(name, attr_type);
        if attr_type.is_choice() {
            let options = self
                .ask_parsed(
                    &format!(
                        "  Options (comma separated, default {}): ",
                        DEFAULT_CHOICE_OPTIONS.join(",")
                    ),
                    parse_ids,
                )?
                .unwrap_or_else(|| DEFAULT_CHOICE_OPTIONS.iter().map(ToString::to_string).collect());
            definition = definition.with_options(options);
        }
        if attr_type == AttributeType::Quantity {
            let (min, max) = self
                .ask_parsed(
                    &format!(
                        "  Quantity range min-max (default {DEFAULT_QUANTITY_MIN}-{DEFAULT_QUANTITY_MAX}): "
                    ),
                    parse_range,
                )?
                .unwrap_or((DEFAULT_QUANTITY_MIN, DEFAULT_QUANTITY_MAX));
            definition = definition.with_quantity_range(min, max);
        }
        if self.ask_yes_no("  Use the same value for all rows? (y/N): ", false)? {
            if let Some(raw) = self.ask_parsed("  Value for all rows: ", parse_text)? {
                definition = definition.with_constant(constant_value(&raw));
            }
        }
        Ok(Some(definition))
    }

    fn collect_optional_columns(
        &mut self,
        known: &PartialConfig,
        accounts: bool,
        answers: &mut PartialConfig,
    ) -> Result<(), PromptError> {
        let mut columns = OptionalColumns::default();

        if accounts && self.ask_yes_no("Add stored payment methods to accounts? (y/N): ", false)? {
            columns.payment_methods = true;
            if known.payment_methods.is_none() {
                let direct_debit_count = self
                    .ask_parsed("  Direct debit methods per account (default 0): ", parse_u32)?
                    .unwrap_or_default();
                let other_count = self
                    .ask_parsed("  Other methods per account (default 0): ", parse_u32)?
                    .unwrap_or_default();
                let direct_debit_processor = if direct_debit_count > 0 {
                    self.ask_parsed("  Direct debit processor: ", parse_text)?
                        .unwrap_or_default()
                } else {
                    String::new()
                };
                let other_processors = if other_count > 0 {
                    self.ask_parsed("  Processors for other methods (comma separated): ", parse_ids)?
                        .unwrap_or_default()
                } else {
                    Vec::new()
                };
                answers.payment_methods = Some(PaymentMethodConfig {
                    direct_debit_count,
                    other_count,
                    direct_debit_processor,
                    other_processors,
                });
            }
        }

        if self.ask_yes_no("Add tax columns? (y/N): ", false)? {
            columns.tax = true;
            if known.tax_uuids.is_none() {
                answers.tax_uuids = self.ask_parsed("  Tax uuids (comma separated): ", parse_ids)?;
            }
        }
        if self.ask_yes_no("Add accounting code columns? (y/N): ", false)? {
            columns.accounting_code = true;
        }
        if accounts && self.ask_yes_no("Add an account group column? (y/N): ", false)? {
            columns.group = true;
            if known.groups.is_none() {
                let names = self
                    .ask_parsed("  Group names (comma separated): ", parse_ids)?
                    .unwrap_or_default();
                let assign_count = self
                    .ask_parsed("  How many accounts get a group? (default 0): ", |raw| {
                        raw.parse::<u64>()
                            .map_err(|_| format!("'{raw}' is not a non-negative integer"))
                    })?
                    .unwrap_or_default();
                answers.groups = Some(GroupConfig {
                    names,
                    assign_count,
                });
            }
        }
        if self.ask_yes_no("Add a custom form column? (y/N): ", false)? {
            columns.custom_form = true;
            if known.custom_forms.is_none() {
                let defaults = CustomFormConfig::default();
                let names = self
                    .ask_parsed("  Custom form names (comma separated): ", parse_ids)?
                    .unwrap_or_default();
                let assign_percent = self
                    .ask_parsed(
                        &format!(
                            "  Share of records with a form, 0-100 (default {}): ",
                            defaults.assign_percent
                        ),
                        parse_percent,
                    )?
                    .unwrap_or(defaults.assign_percent);
                answers.custom_forms = Some(CustomFormConfig {
                    names,
                    assign_percent,
                });
            }
        }
        if accounts && self.ask_yes_no("Add an account user team column? (y/N): ", false)? {
            columns.user_team = true;
            if known.user_teams.is_none() {
                answers.user_teams =
                    self.ask_parsed("  User team names (comma separated): ", parse_ids)?;
            }
        }

        if columns.any() {
            answers.optional_columns = Some(columns);
        }
        Ok(())
    }

    fn collect_items(&mut self) -> Result<Option<ItemConfig>, PromptError> {
        let Some(mode) = self.ask_parsed(
            "Line item mode (system_only, line_only, both; default both): ",
            |raw| raw.parse::<ItemMode>().map_err(|err| err.to_string()),
        )?
        else {
            return Ok(None);
        };
        let mut items = ItemConfig {
            mode,
            ..ItemConfig::default()
        };
        if mode.includes_system_items() {
            items.system_item_ids = self
                .ask_parsed("  System item ids (comma separated): ", parse_ids)?
                .unwrap_or_default();
        }
        Ok(Some(items))
    }

    /// Ask until the answer parses. `None` for a blank answer or end of input.
    fn ask_parsed<T, F>(&mut self, question: &str, parse: F) -> Result<Option<T>, PromptError>
    where
        F: Fn(&str) -> Result<T, String>,
    {
        loop {
            let Some(raw) = self.ask(question)? else {
                return Ok(None);
            };
            if raw.is_empty() {
                return Ok(None);
            }
            match parse(&raw) {
                Ok(value) => return Ok(Some(value)),
                Err(message) => writeln!(self.output, "  {message}")?,
            }
        }
    }

    fn ask_yes_no(&mut self, question: &str, default: bool) -> Result<bool, PromptError> {
        let answer = self.ask_parsed(question, |raw| match raw.to_lowercase().as_str() {
            "y" | "yes" => Ok(true),
            "n" | "no" => Ok(false),
            _ => Err("please answer y or n".to_string()),
        })?;
        Ok(answer.unwrap_or(default))
    }

    fn ask(&mut self, question: &str) -> Result<Option<String>, PromptError> {
        if self.exhausted {
            return Ok(None);
        }
        write!(self.output, "{question}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            self.exhausted = true;
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

fn parse_positive(raw: &str) -> Result<u64, String> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("'{raw}' is not a positive integer")),
    }
}

fn parse_u32(raw: &str) -> Result<u32, String> {
    raw.parse::<u32>()
        .map_err(|_| format!("'{raw}' is not a non-negative integer"))
}

fn parse_cardinality(raw: &str) -> Result<u8, String> {
    match raw.parse::<u8>() {
        Ok(value) if (1..=MAX_SUB_RECORDS).contains(&value) => Ok(value),
        _ => Err(format!("enter a number between 1 and {MAX_SUB_RECORDS}")),
    }
}

fn parse_percent(raw: &str) -> Result<f64, String> {
    match raw.trim_end_matches('%').parse::<f64>() {
        Ok(value) if (0.0..=100.0).contains(&value) => Ok(value),
        _ => Err("enter a percentage between 0 and 100".to_string()),
    }
}

fn parse_text(raw: &str) -> Result<String, String> {
    Ok(raw.to_string())
}

fn parse_ids(raw: &str) -> Result<Vec<String>, String> {
    let ids = parse_id_list(raw);
    if ids.is_empty() {
        Err("enter at least one value".to_string())
    } else {
        Ok(ids)
    }
}

fn parse_entities(raw: &str) -> Result<Vec<EntityKind>, String> {
    let mut kinds = Vec::new();
    for name in parse_id_list(raw) {
        let kind = name.parse::<EntityKind>().map_err(|err| err.to_string())?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    if kinds.is_empty() {
        return Err("enter at least one entity".to_string());
    }
    Ok(kinds)
}

fn parse_attribute_answer(raw: &str) -> Result<AttributeAnswer, String> {
    if matches!(raw.to_lowercase().as_str(), "d" | "default" | "defaults") {
        return Ok(AttributeAnswer::Defaults);
    }
    match raw.parse::<usize>() {
        Ok(count) if count <= MAX_ATTRIBUTES_PER_KIND => Ok(AttributeAnswer::Count(count)),
        _ => Err(format!(
            "enter 0-{MAX_ATTRIBUTES_PER_KIND} or d for the default set"
        )),
    }
}

fn parse_attribute_type(raw: &str) -> Result<AttributeType, String> {
    if let Ok(number) = raw.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|idx| AttributeType::ALL.get(idx).copied())
            .ok_or_else(|| format!("enter 1-{} or a type name", AttributeType::ALL.len()));
    }
    raw.parse::<AttributeType>().map_err(|err| err.to_string())
}

fn parse_range(raw: &str) -> Result<(i64, i64), String> {
    let invalid = || format!("'{raw}' is not a min-max range");
    let (min, max) = raw.split_once('-').ok_or_else(invalid)?;
    let min = min.trim().parse::<i64>().map_err(|_| invalid())?;
    let max = max.trim().parse::<i64>().map_err(|_| invalid())?;
    if min > max {
        return Err(format!("minimum {min} is greater than maximum {max}"));
    }
    Ok((min, max))
}

/// JSON literals stay typed (`true`, `12.5`); anything else is text.
fn constant_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_))) => value,
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn collect(input: &str, known: &PartialConfig) -> (PartialConfig, String) {
        let mut output = Vec::new();
        let answers = {
            let mut collector = PromptCollector::new(Cursor::new(input.as_bytes()), &mut output);
            collector.collect(known).expect("collect answers")
        };
        (answers, String::from_utf8(output).expect("utf8 transcript"))
    }

    #[test]
    fn end_of_input_leaves_every_field_unset() {
        let (answers, transcript) = collect("", &PartialConfig::default());
        assert_eq!(answers, PartialConfig::default());
        assert_eq!(transcript.matches('?').count(), 1);
    }

    #[test]
    fn fields_from_higher_layers_are_not_asked() {
        let known = PartialConfig {
            record_count: Some(10),
            entities: Some(vec![EntityKind::Account]),
            address_lines: Some(2),
            ..PartialConfig::default()
        };
        let (answers, transcript) = collect("4\n", &known);
        assert!(!transcript.contains("How many records"));
        assert!(!transcript.contains("address lines"));
        assert!(transcript.contains("How many contacts"));
        assert_eq!(answers.contacts, Some(4));
        assert_eq!(answers.record_count, None);
    }

    #[test]
    fn invalid_answers_are_asked_again() {
        let known = PartialConfig {
            record_count: Some(10),
            entities: Some(vec![EntityKind::Account]),
            ..PartialConfig::default()
        };
        let (answers, transcript) = collect("0\n9\n3\n\n", &known);
        assert_eq!(answers.address_lines, Some(3));
        assert_eq!(answers.contacts, None);
        assert_eq!(
            transcript
                .matches(&format!("enter a number between 1 and {MAX_SUB_RECORDS}"))
                .count(),
            2
        );
    }

    #[test]
    fn builds_custom_attribute_definitions() {
        let known = PartialConfig {
            record_count: Some(10),
            entities: Some(vec![EntityKind::Account]),
            address_lines: Some(1),
            contacts: Some(1),
            ..PartialConfig::default()
        };
        let input = "2\n\
                     Loyalty Tier\n4\nGOLD, SILVER\ny\nGOLD\n\
                     units\nquantity\n5-10\nn\n";
        let (answers, _) = collect(input, &known);

        let schemas = answers.custom_attributes.expect("account schema");
        let schema = &schemas[&EntityKind::Account];
        assert!(schema.enabled);
        assert_eq!(schema.definitions.len(), 2);

        let tier = &schema.definitions[0];
        assert_eq!(tier.name, "LOYALTY_TIER");
        assert_eq!(tier.attr_type, AttributeType::Dropdown);
        assert_eq!(tier.options, vec!["GOLD", "SILVER"]);
        assert!(tier.constant);
        assert_eq!(tier.value, Some(Value::String("GOLD".to_string())));

        let units = &schema.definitions[1];
        assert_eq!(units.attr_type, AttributeType::Quantity);
        assert_eq!(units.quantity_range(), (5, 10));
        assert!(!units.constant);
    }

    #[test]
    fn toggles_collect_their_required_lists() {
        let known = PartialConfig {
            record_count: Some(10),
            entities: Some(vec![EntityKind::Account]),
            address_lines: Some(1),
            contacts: Some(1),
            custom_attributes: Some(BTreeMap::new()),
            ..PartialConfig::default()
        };
        // payment methods: n, tax: y + uuids, accounting: y, group: n,
        // custom form: n, user team: y + names
        let input = "n\ny\nT-1, T-2\ny\nn\nn\ny\nSales\n";
        let (answers, _) = collect(input, &known);

        let columns = answers.optional_columns.expect("toggles");
        assert!(columns.tax && columns.accounting_code && columns.user_team);
        assert!(!columns.group && !columns.custom_form && !columns.payment_methods);
        assert_eq!(answers.tax_uuids, Some(vec!["T-1".to_string(), "T-2".to_string()]));
        assert_eq!(answers.user_teams, Some(vec!["Sales".to_string()]));
    }

    #[test]
    fn dependent_kinds_ask_for_missing_reference_sources() {
        let known = PartialConfig {
            record_count: Some(5),
            entities: Some(vec![EntityKind::PurchaseInvoice]),
            custom_attributes: Some(BTreeMap::new()),
            line_item_custom_attributes: Some(BTreeMap::new()),
            optional_columns: Some(OptionalColumns::default()),
            ..PartialConfig::default()
        };
        let input = "line_only\nSUP-1, SUP-2\nround_robin\n42\n";
        let (answers, transcript) = collect(input, &known);

        assert!(!transcript.contains("contacts"));
        assert_eq!(answers.items.map(|items| items.mode), Some(ItemMode::LineOnly));
        assert_eq!(
            answers.supplier_account_ids,
            Some(vec!["SUP-1".to_string(), "SUP-2".to_string()])
        );
        assert_eq!(answers.relationship_policy, Some(RelationshipPolicy::RoundRobin));
        assert_eq!(answers.seed, Some(42));
    }

    #[test]
    fn constants_keep_json_scalars_typed() {
        assert_eq!(constant_value("12.5"), serde_json::json!(12.5));
        assert_eq!(constant_value("true"), Value::Bool(true));
        assert_eq!(constant_value("2025-01-31"), Value::String("2025-01-31".into()));
    }
}
