//! Discovery ledger
//!
//! Tracks which materials the player knows, resolves recipes, and mirrors
//! the discovered set into a key-value store as a JSON array of string IDs.
//! Persistence is best-effort: a failed write is logged and the in-memory
//! set stays authoritative for the session.

use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::{Catalog, MaterialId};
use crate::persistence::KeyValueStore;
use crate::sim::Combiner;

/// Outcome of trying a pair of materials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Combination {
    /// Recipe result, `None` when the pair has no recipe
    pub result: Option<MaterialId>,
    /// The result was not discovered before this call
    pub is_new: bool,
}

impl Combination {
    pub const NONE: Combination = Combination {
        result: None,
        is_new: false,
    };
}

pub struct DiscoveryLedger {
    catalog: Arc<Catalog>,
    discovered: HashSet<MaterialId>,
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for DiscoveryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryLedger")
            .field("discovered", &self.discovered.len())
            .field("total", &self.catalog.len())
            .finish()
    }
}

impl DiscoveryLedger {
    /// Store key holding the discovered set
    pub const STORAGE_KEY: &'static str = "alchemy-discovered";

    /// Load the ledger from `store`, falling back to the starting set
    pub fn new(catalog: Arc<Catalog>, store: Box<dyn KeyValueStore>) -> Self {
        let mut ledger = Self {
            catalog,
            discovered: HashSet::new(),
            store,
        };
        ledger.load();
        ledger
    }

    fn load(&mut self) {
        self.discovered = match self.store.get(Self::STORAGE_KEY) {
            Some(json) => match serde_json::from_str::<Vec<String>>(&json) {
                Ok(keys) => {
                    let mut set = HashSet::with_capacity(keys.len());
                    for key in &keys {
                        match self.catalog.id(key) {
                            Some(id) => {
                                set.insert(id);
                            }
                            None => log::warn!("Ignoring unknown saved material `{}`", key),
                        }
                    }
                    log::info!("Loaded {} discovered materials", set.len());
                    set
                }
                Err(e) => {
                    log::warn!("Discarding unreadable discovery save: {}", e);
                    HashSet::new()
                }
            },
            None => {
                log::info!("No discovery save found, starting fresh");
                HashSet::new()
            }
        };
        // Starting materials survive any save, corrupted or not
        self.discovered
            .extend(self.catalog.starting().iter().copied());
    }

    fn save(&mut self) {
        let mut keys: Vec<&str> = self
            .discovered
            .iter()
            .map(|&id| self.catalog.key(id))
            .collect();
        keys.sort_unstable();
        let json = match serde_json::to_string(&keys) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize discoveries: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(Self::STORAGE_KEY, &json) {
            log::warn!("Failed to save discoveries: {}", e);
        }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Try a pair; records and persists a first-time result
    pub fn combine(&mut self, a: MaterialId, b: MaterialId) -> Combination {
        let Some(result) = self.catalog.recipe(a, b) else {
            return Combination::NONE;
        };
        let is_new = self.discovered.insert(result);
        if is_new {
            log::info!(
                "Discovered {} ({}/{})",
                self.catalog.info(result).name,
                self.discovered.len(),
                self.catalog.len()
            );
            self.save();
        }
        Combination {
            result: Some(result),
            is_new,
        }
    }

    /// String-keyed `combine`; unknown keys never match
    pub fn combine_keys(&mut self, a: &str, b: &str) -> Combination {
        match (self.catalog.id(a), self.catalog.id(b)) {
            (Some(a), Some(b)) => self.combine(a, b),
            _ => Combination::NONE,
        }
    }

    pub fn is_discovered(&self, id: MaterialId) -> bool {
        self.discovered.contains(&id)
    }

    pub fn is_discovered_key(&self, key: &str) -> bool {
        self.catalog.id(key).is_some_and(|id| self.is_discovered(id))
    }

    pub fn discovered_count(&self) -> usize {
        self.discovered.len()
    }

    pub fn total_count(&self) -> usize {
        self.catalog.len()
    }

    /// Back to exactly the starting set
    pub fn reset(&mut self) {
        self.discovered = self.catalog.starting().iter().copied().collect();
        log::info!("Discoveries reset to {} starting materials", self.discovered.len());
        self.save();
    }

    /// Discovered materials sorted by display name (case-insensitive)
    pub fn discovered_sorted(&self) -> Vec<MaterialId> {
        let mut ids: Vec<MaterialId> = self.discovered.iter().copied().collect();
        ids.sort_by_cached_key(|&id| (self.catalog.info(id).name.to_lowercase(), id));
        ids
    }

    /// Discovered materials in `category`, sorted by name; `"all"` matches every category
    pub fn discovered_in_category(&self, category: &str) -> Vec<MaterialId> {
        let mut ids = self.discovered_sorted();
        if category != "all" {
            ids.retain(|&id| self.catalog.info(id).category == category);
        }
        ids
    }

    /// Categories with at least one discovered material, sorted
    pub fn discovered_categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self
            .discovered
            .iter()
            .map(|&id| self.catalog.info(id).category.as_str())
            .collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }
}

impl Combiner for DiscoveryLedger {
    fn combine(&mut self, a: MaterialId, b: MaterialId) -> Combination {
        DiscoveryLedger::combine(self, a, b)
    }
}
