//! Static material and recipe tables
//!
//! External data identifies materials by string. At load time every string
//! is interned to a dense [`MaterialId`] so the per-tick paths (zone counts,
//! cooldown keys, recipe lookup) never hash strings.
//!
//! IDs are assigned in lexicographic order of the string keys, so sorting a
//! pair of `MaterialId`s gives the same canonical order as sorting the
//! strings.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in demo table (starting set: water, fire, earth, air)
pub const DEMO_CATALOG: &str = include_str!("data/demo_catalog.json");

/// Dense material index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u16);

impl MaterialId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Order-independent pair key
#[inline]
pub fn canonical_pair(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Display data for a material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialInfo {
    pub name: String,
    #[serde(alias = "emoji")]
    pub glyph: String,
    pub category: String,
}

/// One recipe as supplied by the data provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDef {
    pub ingredients: [String; 2],
    pub result: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog has {0} materials, more than the supported maximum")]
    TooManyMaterials(usize),
    #[error("{context} references unknown material `{id}`")]
    UnknownMaterial { context: String, id: String },
    #[error("recipe {a}+{b} defined twice with different results (`{first}` and `{second}`)")]
    ConflictingRecipe {
        a: String,
        b: String,
        first: String,
        second: String,
    },
    #[error("catalog has no starting materials")]
    NoStartingMaterials,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    materials: BTreeMap<String, MaterialInfo>,
    #[serde(default)]
    recipes: Vec<RecipeDef>,
    starting: Vec<String>,
}

/// Immutable material/recipe tables
#[derive(Debug, Clone)]
pub struct Catalog {
    keys: Vec<String>,
    infos: Vec<MaterialInfo>,
    index: HashMap<String, MaterialId>,
    recipes: HashMap<(MaterialId, MaterialId), MaterialId>,
    /// Recipes in the order they were supplied (canonical ingredient order)
    recipe_list: Vec<((MaterialId, MaterialId), MaterialId)>,
    starting: Vec<MaterialId>,
}

impl Catalog {
    pub fn new(
        materials: BTreeMap<String, MaterialInfo>,
        recipes: Vec<RecipeDef>,
        starting: Vec<String>,
    ) -> Result<Self, CatalogError> {
        if materials.len() > u16::MAX as usize {
            return Err(CatalogError::TooManyMaterials(materials.len()));
        }

        let mut keys = Vec::with_capacity(materials.len());
        let mut infos = Vec::with_capacity(materials.len());
        let mut index = HashMap::with_capacity(materials.len());
        // BTreeMap iteration is sorted, so ids follow lexicographic key order
        for (i, (key, info)) in materials.into_iter().enumerate() {
            index.insert(key.clone(), MaterialId(i as u16));
            keys.push(key);
            infos.push(info);
        }

        let lookup = |context: &str, id: &str| {
            index
                .get(id)
                .copied()
                .ok_or_else(|| CatalogError::UnknownMaterial {
                    context: context.to_string(),
                    id: id.to_string(),
                })
        };

        let mut recipe_map: HashMap<(MaterialId, MaterialId), MaterialId> =
            HashMap::with_capacity(recipes.len());
        let mut recipe_list = Vec::with_capacity(recipes.len());
        for recipe in &recipes {
            let [a, b] = &recipe.ingredients;
            let context = format!("recipe {a}+{b}");
            let ia = lookup(&context, a)?;
            let ib = lookup(&context, b)?;
            let result = lookup(&context, &recipe.result)?;
            if a > b {
                log::debug!("Recipe {}+{} is not in canonical order", a, b);
            }

            let key = canonical_pair(ia, ib);
            match recipe_map.get(&key) {
                Some(&existing) if existing != result => {
                    return Err(CatalogError::ConflictingRecipe {
                        a: a.clone(),
                        b: b.clone(),
                        first: keys[existing.index()].clone(),
                        second: recipe.result.clone(),
                    });
                }
                Some(_) => continue,
                None => {
                    recipe_map.insert(key, result);
                    recipe_list.push((key, result));
                }
            }
        }

        let mut seen = HashSet::new();
        let mut starting_ids = Vec::with_capacity(starting.len());
        for id in &starting {
            let id = lookup("starting set", id)?;
            if seen.insert(id) {
                starting_ids.push(id);
            }
        }
        if starting_ids.is_empty() {
            return Err(CatalogError::NoStartingMaterials);
        }

        let catalog = Self {
            keys,
            infos,
            index,
            recipes: recipe_map,
            recipe_list,
            starting: starting_ids,
        };

        let unreachable = catalog.unreachable_materials();
        if !unreachable.is_empty() {
            log::warn!(
                "{} materials cannot be reached from the starting set: {:?}",
                unreachable.len(),
                unreachable.iter().map(|&id| catalog.key(id)).collect::<Vec<_>>()
            );
        }
        log::info!(
            "Loaded catalog: {} materials, {} recipes, {} starting",
            catalog.len(),
            catalog.recipe_list.len(),
            catalog.starting.len()
        );

        Ok(catalog)
    }

    /// Parse `{ "materials": {..}, "recipes": [..], "starting": [..] }`
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.materials, file.recipes, file.starting)
    }

    /// The built-in demo table
    pub fn demo() -> Result<Self, CatalogError> {
        Self::from_json_str(DEMO_CATALOG)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn id(&self, key: &str) -> Option<MaterialId> {
        self.index.get(key).copied()
    }

    /// String key of a material. Panics on an id from another catalog.
    pub fn key(&self, id: MaterialId) -> &str {
        &self.keys[id.index()]
    }

    pub fn info(&self, id: MaterialId) -> &MaterialInfo {
        &self.infos[id.index()]
    }

    pub fn contains(&self, id: MaterialId) -> bool {
        id.index() < self.keys.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = MaterialId> + '_ {
        (0..self.keys.len()).map(|i| MaterialId(i as u16))
    }

    pub fn starting(&self) -> &[MaterialId] {
        &self.starting
    }

    pub fn recipe_count(&self) -> usize {
        self.recipe_list.len()
    }

    /// Result of combining `a` and `b`, in either order
    #[inline]
    pub fn recipe(&self, a: MaterialId, b: MaterialId) -> Option<MaterialId> {
        self.recipes.get(&canonical_pair(a, b)).copied()
    }

    /// All categories, sorted
    pub fn categories(&self) -> Vec<&str> {
        self.infos
            .iter()
            .map(|info| info.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Materials that no sequence of recipes produces from the starting set
    pub fn unreachable_materials(&self) -> Vec<MaterialId> {
        let mut known: HashSet<MaterialId> = self.starting.iter().copied().collect();
        loop {
            let mut changed = false;
            for &((a, b), result) in &self.recipe_list {
                if known.contains(&a) && known.contains(&b) && known.insert(result) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        self.ids().filter(|id| !known.contains(id)).collect()
    }
}
