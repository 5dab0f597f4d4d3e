use std::collections::BTreeMap;

use mockledger_core::EntityKind;

const ACCOUNT_ID_BASE: u64 = 10_000;
const DOCUMENT_ID_BASE: u64 = 100_000;

/// Monotonic, collision-free identifiers for one run.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    counters: BTreeMap<EntityKind, u64>,
    line_items: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self, kind: EntityKind) -> u64 {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        *counter
    }

    /// `CSV-ACC-10001-CUS`; suppliers carry a `SUP` suffix.
    pub fn next_account(&mut self, supplier: bool) -> String {
        let n = ACCOUNT_ID_BASE + self.bump(EntityKind::Account);
        let suffix = if supplier { "SUP" } else { "CUS" };
        format!("CSV-ACC-{n:05}-{suffix}")
    }

    /// Header id for document and payment kinds.
    pub fn next_document(&mut self, kind: EntityKind) -> String {
        let tag = match kind {
            EntityKind::Account => return self.next_account(false),
            EntityKind::Order => "ORD",
            EntityKind::Invoice => "INV",
            EntityKind::PurchaseOrder => "PO",
            EntityKind::PurchaseInvoice => "PINV",
            EntityKind::Payment => {
                let n = self.bump(kind);
                return format!("CSV-PMT-{n:03}");
            }
            EntityKind::PurchasePayment => {
                let n = self.bump(kind);
                return format!("CSV-PPMT-{n:03}");
            }
        };
        let n = DOCUMENT_ID_BASE + self.bump(kind);
        format!("CSV-{tag}-{n}")
    }

    pub fn next_line_item(&mut self) -> String {
        self.line_items += 1;
        format!("LI-{:06}", self.line_items)
    }

    /// Identifiers issued so far for a kind.
    pub fn issued(&self, kind: EntityKind) -> u64 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_advance_per_kind() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_account(false), "CSV-ACC-10001-CUS");
        assert_eq!(ids.next_account(true), "CSV-ACC-10002-SUP");
        assert_eq!(ids.next_document(EntityKind::Invoice), "CSV-INV-100001");
        assert_eq!(ids.next_document(EntityKind::Payment), "CSV-PMT-001");
        assert_eq!(
            ids.next_document(EntityKind::PurchasePayment),
            "CSV-PPMT-001"
        );
        assert_eq!(ids.next_document(EntityKind::Invoice), "CSV-INV-100002");
        assert_eq!(ids.issued(EntityKind::Account), 2);
        assert_eq!(ids.next_line_item(), "LI-000001");
    }
}
