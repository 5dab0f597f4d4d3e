//! Foreign-key style references between generated entities.
//!
//! A [`RelationshipLinker`] draws identifiers from one pool according to a
//! [`SelectionPolicy`]. Pools are assembled by [`ReferencePools`]: ids
//! materialised earlier in the run come first, external ids follow.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, RngCore};
use serde::Serialize;

use mockledger_config::{ConfigurationModel, RelationshipPolicy};
use mockledger_core::EntityKind;

use crate::errors::GenerationError;
use crate::table::GeneratedTable;

pub const ACCOUNT_TYPE_COLUMN: &str = "account_type";
pub const ACCOUNT_CURRENCY_COLUMN: &str = "account_currency";

/// The parent collection a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    CustomerAccount,
    SupplierAccount,
    Invoice,
    PurchaseInvoice,
    SystemItem,
}

impl Relation {
    pub fn as_str(self) -> &'static str {
        match self {
            Relation::CustomerAccount => "customer account",
            Relation::SupplierAccount => "supplier account",
            Relation::Invoice => "invoice",
            Relation::PurchaseInvoice => "purchase invoice",
            Relation::SystemItem => "system item",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chooses an index into a pool of `len` entries.
pub trait SelectionPolicy: Send {
    fn select(&mut self, len: usize, rng: &mut dyn RngCore) -> usize;
}

/// Uniform choice with replacement.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uniform;

impl SelectionPolicy for Uniform {
    fn select(&mut self, len: usize, rng: &mut dyn RngCore) -> usize {
        rng.random_range(0..len)
    }
}

/// Cycles through the pool in order.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobin {
    cursor: usize,
}

impl SelectionPolicy for RoundRobin {
    fn select(&mut self, len: usize, _rng: &mut dyn RngCore) -> usize {
        let idx = self.cursor % len;
        self.cursor = self.cursor.wrapping_add(1);
        idx
    }
}

/// Zipf-like preference: entry `i` has weight `1 / (i + 1)^skew`.
#[derive(Debug, Clone)]
pub struct Weighted {
    skew: f64,
    cached: Option<(usize, WeightedIndex<f64>)>,
}

impl Weighted {
    pub fn new(skew: f64) -> Self {
        Self { skew, cached: None }
    }
}

impl SelectionPolicy for Weighted {
    fn select(&mut self, len: usize, rng: &mut dyn RngCore) -> usize {
        if self.cached.as_ref().map(|(cached, _)| *cached) != Some(len) {
            let weights = (0..len).map(|i| 1.0 / ((i + 1) as f64).powf(self.skew));
            self.cached = WeightedIndex::new(weights).ok().map(|dist| (len, dist));
        }
        match &self.cached {
            Some((_, dist)) => dist.sample(rng),
            None => rng.random_range(0..len),
        }
    }
}

/// Build the selection policy named in the configuration.
pub fn policy_for(policy: RelationshipPolicy) -> Box<dyn SelectionPolicy> {
    match policy {
        RelationshipPolicy::Uniform => Box::new(Uniform),
        RelationshipPolicy::RoundRobin => Box::new(RoundRobin::default()),
        RelationshipPolicy::Weighted { skew } => Box::new(Weighted::new(skew)),
    }
}

/// Draws parent identifiers for one relation of one entity kind.
pub struct RelationshipLinker {
    entity: EntityKind,
    relation: Relation,
    pool: Vec<String>,
    policy: Box<dyn SelectionPolicy>,
}

impl fmt::Debug for RelationshipLinker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationshipLinker")
            .field("entity", &self.entity)
            .field("relation", &self.relation)
            .field("pool", &self.pool.len())
            .finish()
    }
}

impl RelationshipLinker {
    /// Fails with `UnresolvedReference` when the pool is empty.
    pub fn new(
        entity: EntityKind,
        relation: Relation,
        pool: Vec<String>,
        policy: Box<dyn SelectionPolicy>,
    ) -> Result<Self, GenerationError> {
        if pool.is_empty() {
            return Err(GenerationError::UnresolvedReference { entity, relation });
        }
        Ok(Self {
            entity,
            relation,
            pool,
            policy,
        })
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    pub fn pick_one(&mut self, rng: &mut dyn RngCore) -> String {
        let idx = self.policy.select(self.pool.len(), rng);
        self.pool[idx].clone()
    }

    /// `n` ids, repeats allowed.
    pub fn pick(&mut self, n: usize, rng: &mut dyn RngCore) -> Vec<String> {
        (0..n).map(|_| self.pick_one(rng)).collect()
    }

    /// Up to `n` distinct ids; fewer when the pool has fewer distinct values.
    pub fn pick_distinct(&mut self, n: usize, rng: &mut dyn RngCore) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut remaining: Vec<&String> = self
            .pool
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .collect();
        let n = n.min(remaining.len());
        let mut picked = Vec::with_capacity(n);
        while picked.len() < n {
            let idx = self.policy.select(remaining.len(), rng);
            picked.push(remaining.remove(idx).clone());
        }
        picked
    }

    /// Number of distinct ids in the pool.
    pub fn distinct_len(&self) -> usize {
        self.pool.iter().collect::<HashSet<_>>().len()
    }
}

/// Identifier pools available to dependent entity kinds.
#[derive(Debug, Clone, Default)]
pub struct ReferencePools {
    generated: BTreeMap<Relation, Vec<String>>,
    external: BTreeMap<Relation, Vec<String>>,
    currencies: HashMap<String, String>,
}

impl ReferencePools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pools seeded with the externally supplied id lists.
    pub fn from_config(config: &ConfigurationModel) -> Self {
        let mut pools = Self::new();
        pools
            .external
            .insert(Relation::CustomerAccount, config.account_ids.clone());
        pools
            .external
            .insert(Relation::SupplierAccount, config.supplier_account_ids.clone());
        pools
            .external
            .insert(Relation::Invoice, config.invoice_ids.clone());
        pools.external.insert(
            Relation::PurchaseInvoice,
            config.purchase_invoice_ids.clone(),
        );
        pools
            .external
            .insert(Relation::SystemItem, config.items.system_item_ids.clone());
        pools
    }

    pub fn add_generated(&mut self, relation: Relation, id: impl Into<String>) {
        self.generated.entry(relation).or_default().push(id.into());
    }

    /// Feed a finished table into the pools of later kinds.
    pub fn ingest(&mut self, table: &GeneratedTable) {
        match table.kind {
            EntityKind::Account => {
                for record in &table.records {
                    self.add_generated(Relation::CustomerAccount, record.id.clone());
                    let account_type = record
                        .fields
                        .get(ACCOUNT_TYPE_COLUMN)
                        .map(String::as_str)
                        .unwrap_or_default();
                    if matches!(account_type, "SUPPLIER" | "CUSTOMER_AND_SUPPLIER") {
                        self.add_generated(Relation::SupplierAccount, record.id.clone());
                    }
                    if let Some(currency) = record.fields.get(ACCOUNT_CURRENCY_COLUMN) {
                        self.currencies.insert(record.id.clone(), currency.clone());
                    }
                }
            }
            EntityKind::Invoice => {
                for record in &table.records {
                    self.add_generated(Relation::Invoice, record.id.clone());
                }
            }
            EntityKind::PurchaseInvoice => {
                for record in &table.records {
                    self.add_generated(Relation::PurchaseInvoice, record.id.clone());
                }
            }
            _ => {}
        }
    }

    /// Generated ids followed by external ids.
    pub fn pool(&self, relation: Relation) -> Vec<String> {
        let generated = self.generated.get(&relation).into_iter().flatten();
        let external = self.external.get(&relation).into_iter().flatten();
        generated.chain(external).cloned().collect()
    }

    /// Linker over one relation's pool using the configured policy.
    pub fn linker(
        &self,
        entity: EntityKind,
        relation: Relation,
        policy: RelationshipPolicy,
    ) -> Result<RelationshipLinker, GenerationError> {
        RelationshipLinker::new(entity, relation, self.pool(relation), policy_for(policy))
    }

    /// Currency of a generated account, if known.
    pub fn currency_for(&self, account_id: &str) -> Option<&str> {
        self.currencies.get(account_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn empty_pool_is_unresolved() {
        let err = RelationshipLinker::new(
            EntityKind::PurchaseInvoice,
            Relation::SupplierAccount,
            Vec::new(),
            Box::new(Uniform),
        )
        .expect_err("empty pool");
        assert!(matches!(
            err,
            GenerationError::UnresolvedReference {
                entity: EntityKind::PurchaseInvoice,
                relation: Relation::SupplierAccount
            }
        ));
    }

    #[test]
    fn round_robin_follows_pool_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut linker = RelationshipLinker::new(
            EntityKind::Order,
            Relation::CustomerAccount,
            ids(&["A", "B", "C"]),
            Box::new(RoundRobin::default()),
        )
        .expect("linker");
        assert_eq!(linker.pick(5, &mut rng), ids(&["A", "B", "C", "A", "B"]));
    }

    #[test]
    fn weighted_prefers_early_entries() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut policy = Weighted::new(2.0);
        let mut counts = [0_u32; 4];
        for _ in 0..2000 {
            counts[policy.select(4, &mut rng)] += 1;
        }
        assert!(counts[0] > counts[1] && counts[1] > counts[3]);
    }

    #[test]
    fn pick_distinct_never_repeats() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut linker = RelationshipLinker::new(
            EntityKind::Payment,
            Relation::Invoice,
            ids(&["I1", "I2", "I2", "I3"]),
            Box::new(Uniform),
        )
        .expect("linker");
        let picked = linker.pick_distinct(5, &mut rng);
        assert_eq!(picked.len(), 3);
        let unique: HashSet<_> = picked.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn pools_list_generated_ids_before_external_ones() {
        let config = ConfigurationModel {
            supplier_account_ids: ids(&["EXT-1"]),
            ..ConfigurationModel::default()
        };
        let mut pools = ReferencePools::from_config(&config);
        pools.add_generated(Relation::SupplierAccount, "GEN-1");
        assert_eq!(
            pools.pool(Relation::SupplierAccount),
            ids(&["GEN-1", "EXT-1"])
        );
        assert!(pools.pool(Relation::Invoice).is_empty());
    }
}
