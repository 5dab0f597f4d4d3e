use std::collections::HashSet;

use fake::Fake;
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::{FirstName, LastName, Name};
use rand::{Rng, RngCore};

use mockledger_config::ConfigurationModel;
use mockledger_core::EntityKind;

use super::common::{
    ACCOUNTING_CODES, address_lines, city, domain_stem, mobile, ordinal, phone, pick, pick_owned,
    post_code, sample_positions, state, yes_no_blank,
};
use super::{EntityGenerator, RecordContext};
use crate::errors::GenerationError;
use crate::linker::{ACCOUNT_CURRENCY_COLUMN, ACCOUNT_TYPE_COLUMN, Relation};
use crate::table::{Contact, EntityRecord, PostalAddress};

const CORE_COLUMNS: [&str; 23] = [
    "account_status",
    "account_id",
    "account_name",
    "account_display_name",
    ACCOUNT_TYPE_COLUMN,
    "account_description",
    "account_origin",
    "account_email_address",
    ACCOUNT_CURRENCY_COLUMN,
    "account_time_zone",
    "account_website",
    "account_invoice_mode",
    "account_communication_preference",
    "account_linkedin",
    "account_twitter",
    "account_facebook",
    "account_consolidate_invoice",
    "account_payment_mode",
    "account_billing_start_date",
    "account_billing_start_day_of_month",
    "account_payment_term",
    "account_invoice_term",
    "account_billing_period",
];

const ACCOUNT_TYPES: &[&str] = &["CUSTOMER", "SUPPLIER", "CUSTOMER_AND_SUPPLIER"];
const SUPPLIER_TYPES: &[&str] = &["SUPPLIER", "CUSTOMER_AND_SUPPLIER"];
const CURRENCIES: &[&str] = &["AUD", "USD"];
const TIME_ZONES: &[&str] = &[
    "Australia/Melbourne",
    "Africa/Abidjan",
    "America/Costa Rica",
    "America/Dawson",
    "Europe/Warsaw",
    "Europe/Rome",
    "Asia/Kuwait",
    "Asia/Kuala Lumpur",
];
const DESCRIPTIONS: &[&str] = &[
    "Configurable empowering challenge",
    "Right-sized high-level groupware",
    "Innovative scalable solution",
    "Enterprise-grade platform",
    "Customer-focused service excellence",
    "Advanced technology integration",
    "Streamlined business operations",
    "Comprehensive management system",
    "Strategic business solutions",
    "Next-generation digital platform",
    "Robust infrastructure services",
    "Integrated business intelligence",
    "Flexible enterprise architecture",
    "Optimized workflow automation",
    "Cutting-edge innovation hub",
];
const CHANNELS: &[&str] = &["EMAIL", "POSTAL_EMAIL", "TEXT_MESSAGE", "VOICE_MAIL"];
const BILLING_START: &[&str] = &[
    "DAY_OF_MONTH",
    "RATING_START_DATE",
    "SUBSCRIPTION_START_DATE",
    "SUBSCRIPTION_ACTIVATION_DATE",
    "SUBSCRIPTION_ACCEPTANCE_DATE",
];
const PAYMENT_TERMS: &[&str] = &[
    "Due on Receipt",
    "Net 7",
    "Net 14",
    "Net 15",
    "Net 21",
    "Net 30",
    "Net 60",
    "Net 90",
];
const INVOICE_TERMS: &[&str] = &[
    "Billing Start Date",
    "Net 7",
    "Net 14",
    "Net 15",
    "Net 21",
    "Net 30",
    "Net 60",
    "Net 90",
];
const NAME_PREFIXES: &[&str] = &[
    "Global", "Prime", "Elite", "Summit", "Apex", "Vertex", "Nexus", "Quantum",
];
const NAME_INDUSTRIES: &[&str] = &[
    "Tech",
    "Logistics",
    "Financial",
    "Consulting",
    "Marketing",
    "Digital",
    "Industrial",
    "Trading",
];
const COMPANY_TYPES: &[&str] = &[
    "Pty Ltd",
    "Inc",
    "Corp",
    "Group",
    "Solutions",
    "Services",
    "Technologies",
    "Enterprises",
];
const SALUTATIONS: &[&str] = &[
    "Mr.", "Mrs.", "Ms.", "Dr.", "Prof.", "Master", "Sir", "Frau", "Fraulein",
];
const DESIGNATIONS: &[&str] = &[
    "Analyst",
    "Accountant",
    "Integrator",
    "Investor",
    "Partner",
    "Reseller",
    "Supplier",
    "Vendor",
    "Consultant",
    "Developer",
    "Customer Service Manager",
    "Marketing Manager",
    "Sales Manager",
    "CEO",
    "Director",
    "Vice President",
    "Other",
];
const EMAIL_EXTENSIONS: &[&str] = &[".com.au", ".net.au", ".org.au"];
const COUNTRY: &str = "Australia";
const NAME_ATTEMPTS: usize = 20;

/// Customer and supplier accounts with address, contacts and optional
/// billing columns.
pub struct AccountGenerator {
    group_positions: HashSet<u64>,
    form_positions: HashSet<u64>,
    used_names: HashSet<String>,
    /// The first account must be able to act as a supplier.
    supplier_first: bool,
}

impl AccountGenerator {
    /// Pre-selects which record positions receive a group or custom form.
    pub fn new(config: &ConfigurationModel, count: u64, rng: &mut dyn RngCore) -> Self {
        let optional = &config.optional_columns;
        let group_positions = if optional.group && !config.groups.names.is_empty() {
            sample_positions(count, config.groups.assign_count, rng)
        } else {
            HashSet::new()
        };
        let form_positions = if optional.custom_form && !config.custom_forms.names.is_empty() {
            sample_positions(count, custom_form_quota(count, config.custom_forms.assign_percent), rng)
        } else {
            HashSet::new()
        };
        Self {
            group_positions,
            form_positions,
            used_names: HashSet::new(),
            supplier_first: needs_generated_supplier(config),
        }
    }

    fn account_type(&self, index: u64, rng: &mut dyn RngCore) -> &'static str {
        if index == 0 && self.supplier_first {
            pick(SUPPLIER_TYPES, rng)
        } else {
            pick(ACCOUNT_TYPES, rng)
        }
    }

    fn unique_name(&mut self, index: u64, rng: &mut dyn RngCore) -> String {
        for _ in 0..NAME_ATTEMPTS {
            let name = account_name(rng);
            if self.used_names.insert(name.clone()) {
                return name;
            }
        }
        let name = format!("{} {}", account_name(rng), index + 1);
        self.used_names.insert(name.clone());
        name
    }
}

/// Supplier-side kinds with no external supplier ids draw only from the
/// accounts generated in this run.
fn needs_generated_supplier(config: &ConfigurationModel) -> bool {
    config.supplier_account_ids.is_empty()
        && (config.generates(EntityKind::PurchaseOrder)
            || config.generates(EntityKind::PurchaseInvoice))
}

/// Records receiving a custom form: at least one when the share is positive.
pub fn custom_form_quota(count: u64, percent: f64) -> u64 {
    if percent <= 0.0 || count == 0 {
        return 0;
    }
    ((count as f64 * percent / 100.0) as u64).clamp(1, count)
}

impl EntityGenerator for AccountGenerator {
    fn kind(&self) -> EntityKind {
        EntityKind::Account
    }

    fn columns(&self, config: &ConfigurationModel) -> Vec<String> {
        let mut columns: Vec<String> = CORE_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(PostalAddress::columns(config.address_lines as usize));
        for idx in 1..=config.contacts as usize {
            columns.extend(Contact::columns(idx));
        }
        let optional = &config.optional_columns;
        if optional.payment_methods {
            for idx in 1..=config.payment_methods.direct_debit_count {
                let prefix = format!("payment_method_dd_{idx}_");
                columns.extend(
                    [
                        "processor_type",
                        "is_default",
                        "bsb_number",
                        "account_name",
                        "account_number",
                        "processor",
                        "reference",
                    ]
                    .iter()
                    .map(|field| format!("{prefix}{field}")),
                );
            }
            for idx in 1..=config.payment_methods.other_count {
                let prefix = format!("payment_method_ot_{idx}_");
                columns.extend(
                    ["processor_type", "is_default", "processor", "reference"]
                        .iter()
                        .map(|field| format!("{prefix}{field}")),
                );
            }
        }
        let toggled = [
            (optional.tax, "account_tax_code"),
            (optional.accounting_code, "account_accounting_code"),
            (optional.group, "account_group"),
            (optional.custom_form, "account_custom_form"),
            (optional.user_team, "account_user_team"),
        ];
        columns.extend(
            toggled
                .into_iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, column)| column.to_string()),
        );
        columns
    }

    fn resolve_references(
        &mut self,
        _config: &ConfigurationModel,
        _rng: &mut dyn RngCore,
    ) -> Vec<(Relation, String)> {
        Vec::new()
    }

    fn generate_record(
        &mut self,
        ctx: &mut RecordContext<'_>,
        _references: Vec<(Relation, String)>,
        rng: &mut dyn RngCore,
    ) -> Result<EntityRecord, GenerationError> {
        let config = ctx.config;
        let name = self.unique_name(ctx.index, rng);
        let account_type = self.account_type(ctx.index, rng);
        let id = ctx.ids.next_account(account_type == "SUPPLIER");
        let stem = domain_stem(&name);
        let domain = format!("{stem}{}", pick(EMAIL_EXTENSIONS, rng));
        let slug: String = name
            .to_lowercase()
            .replace('&', "and")
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();

        let mut record = EntityRecord::new(id.clone());
        record.set("account_status", "ACTIVE");
        record.set("account_id", id.clone());
        record.set("account_name", name.clone());
        record.set("account_display_name", name.clone());
        record.set(ACCOUNT_TYPE_COLUMN, account_type);
        record.set("account_description", pick(DESCRIPTIONS, rng));
        record.set("account_origin", "");
        record.set("account_email_address", format!("info@{domain}"));
        record.set(ACCOUNT_CURRENCY_COLUMN, pick(CURRENCIES, rng));
        record.set("account_time_zone", pick(TIME_ZONES, rng));
        record.set("account_website", format!("https://{stem}.com"));
        record.set("account_invoice_mode", pick(&["AUTOMATIC", "MANUAL"], rng));
        record.set("account_communication_preference", channels(rng));
        record.set(
            "account_linkedin",
            format!("https://www.linkedin.com/in/{slug}"),
        );
        record.set("account_twitter", format!("https://x.com/{slug}"));
        record.set(
            "account_facebook",
            format!("https://www.facebook.com/{slug}"),
        );
        record.set("account_consolidate_invoice", pick(&["YES", "NO"], rng));
        record.set("account_payment_mode", pick(&["AUTOMATIC", "MANUAL"], rng));
        let billing_start = pick(BILLING_START, rng);
        record.set("account_billing_start_date", billing_start);
        let day_of_month = if billing_start == "DAY_OF_MONTH" {
            match rng.random_range(1..=31) {
                31 => "End of the Month".to_string(),
                day => format!("{} of The Month", ordinal(day)),
            }
        } else {
            String::new()
        };
        record.set("account_billing_start_day_of_month", day_of_month);
        record.set("account_payment_term", pick(PAYMENT_TERMS, rng));
        record.set("account_invoice_term", pick(INVOICE_TERMS, rng));
        record.set("account_billing_period", billing_period(rng));

        let mut lines = address_lines(rng).to_vec();
        lines.truncate(config.address_lines as usize);
        record.address = Some(PostalAddress {
            lines,
            post_code: post_code(rng),
            city: city(rng),
            state: state(rng),
            country: COUNTRY.to_string(),
            is_default_billing: true,
            is_default_shipping: true,
        });
        record.contacts = (0..config.contacts)
            .map(|_| contact(&domain, rng))
            .collect();

        let optional = &config.optional_columns;
        if optional.payment_methods {
            let methods = &config.payment_methods;
            for idx in 1..=methods.direct_debit_count {
                let prefix = format!("payment_method_dd_{idx}_");
                record.set(format!("{prefix}processor_type"), "DIRECT_DEBIT");
                record.set(format!("{prefix}is_default"), default_flag(idx));
                record.set(
                    format!("{prefix}bsb_number"),
                    rng.random_range(100_000..=999_999).to_string(),
                );
                record.set(format!("{prefix}account_name"), name.clone());
                record.set(
                    format!("{prefix}account_number"),
                    rng.random_range(100_000_000..=999_999_999).to_string(),
                );
                record.set(
                    format!("{prefix}processor"),
                    methods.direct_debit_processor.clone(),
                );
                record.set(format!("{prefix}reference"), format!("{id}-DD{idx}"));
            }
            for idx in 1..=methods.other_count {
                let prefix = format!("payment_method_ot_{idx}_");
                let processor = methods
                    .other_processors
                    .get(idx as usize - 1)
                    .or(methods.other_processors.last())
                    .cloned()
                    .unwrap_or_default();
                record.set(format!("{prefix}processor_type"), "OTHER");
                record.set(format!("{prefix}is_default"), default_flag(idx));
                record.set(format!("{prefix}processor"), processor);
                record.set(format!("{prefix}reference"), format!("{id}-OT{idx}"));
            }
        }
        if optional.tax {
            record.set("account_tax_code", pick_owned(&config.tax_uuids, rng));
        }
        if optional.accounting_code && rng.random_bool(0.7) {
            record.set("account_accounting_code", pick(ACCOUNTING_CODES, rng));
        }
        if optional.group && self.group_positions.contains(&ctx.index) {
            record.set("account_group", pick_owned(&config.groups.names, rng));
        }
        if optional.custom_form && self.form_positions.contains(&ctx.index) {
            record.set(
                "account_custom_form",
                pick_owned(&config.custom_forms.names, rng),
            );
        }
        if optional.user_team {
            record.set("account_user_team", pick_owned(&config.user_teams, rng));
        }
        Ok(record)
    }
}

fn account_name(rng: &mut dyn RngCore) -> String {
    if rng.random_bool(0.6) {
        if rng.random_bool(0.5) {
            format!(
                "{} {} {}",
                pick(NAME_PREFIXES, rng),
                pick(NAME_INDUSTRIES, rng),
                pick(COMPANY_TYPES, rng)
            )
        } else {
            CompanyName().fake_with_rng(rng)
        }
    } else {
        Name().fake_with_rng(rng)
    }
}

/// One to four distinct channels, comma-joined.
fn channels(rng: &mut dyn RngCore) -> String {
    let amount = rng.random_range(1..=CHANNELS.len());
    rand::seq::index::sample(rng, CHANNELS.len(), amount)
        .into_iter()
        .map(|idx| CHANNELS[idx])
        .collect::<Vec<_>>()
        .join(",")
}

fn billing_period(rng: &mut dyn RngCore) -> String {
    match rng.random_range(0..24) {
        0 => "1 Day".to_string(),
        1 => "1 Week".to_string(),
        n @ 2..=13 => format!("{} Month", n - 1),
        n => format!("{} Year", n - 13),
    }
}

fn default_flag(idx: u32) -> &'static str {
    if idx == 1 { "YES" } else { "NO" }
}

fn contact(domain: &str, rng: &mut dyn RngCore) -> Contact {
    let first_name: String = FirstName().fake_with_rng(rng);
    let last_name: String = LastName().fake_with_rng(rng);
    let middle_name = if rng.random_bool(0.3) {
        FirstName().fake_with_rng(rng)
    } else {
        String::new()
    };
    let local_part = format!("{first_name}.{last_name}")
        .to_lowercase()
        .replace(' ', ".");
    Contact {
        salutation: pick(SALUTATIONS, rng).to_string(),
        designation: pick(DESIGNATIONS, rng).to_string(),
        email_address: format!("{local_part}@{domain}"),
        email_do_not_email: yes_no_blank(rng),
        address_lines: address_lines(rng),
        post_code: post_code(rng),
        phone: phone(rng),
        phone_do_not_call: yes_no_blank(rng),
        fax: phone(rng),
        fax_do_not_call: yes_no_blank(rng),
        mobile: mobile(rng),
        mobile_do_not_call: yes_no_blank(rng),
        receive_billing_information: yes_no_blank(rng),
        first_name,
        middle_name,
        last_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_form_quota_rounds_down_with_a_floor_of_one() {
        assert_eq!(custom_form_quota(10, 25.0), 2);
        assert_eq!(custom_form_quota(3, 10.0), 1);
        assert_eq!(custom_form_quota(3, 0.0), 0);
        assert_eq!(custom_form_quota(4, 100.0), 4);
    }

    #[test]
    fn first_account_is_a_supplier_when_purchases_need_one() {
        use rand::SeedableRng;
        let mut config = ConfigurationModel {
            entities: vec![EntityKind::Account, EntityKind::PurchaseOrder],
            ..ConfigurationModel::default()
        };
        for seed in 0..40 {
            let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
            let generator = AccountGenerator::new(&config, 1, &mut rng);
            assert!(SUPPLIER_TYPES.contains(&generator.account_type(0, &mut rng)));
        }

        config.supplier_account_ids = vec!["SUP-EXT".to_string()];
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(0);
        assert!(!AccountGenerator::new(&config, 1, &mut rng).supplier_first);
    }

    #[test]
    fn billing_periods_cover_days_to_years() {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(12);
        let periods: HashSet<String> = (0..500).map(|_| billing_period(&mut rng)).collect();
        assert!(periods.contains("1 Day"));
        assert!(periods.contains("12 Month"));
        assert!(periods.contains("10 Year"));
        assert!(!periods.contains("11 Year"));
    }
}
