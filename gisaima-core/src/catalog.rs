//! The catalog: static game-data lookups (unit stats, structure defaults,
//! item classification) the engine consults but never mutates.
//!
//! Modeled as a trait so a real deployment can swap in a catalog loaded from
//! a data file or admin-editable store, while tests and a minimal runtime
//! use the bundled [`StaticCatalog`].

use std::collections::HashMap;

use crate::entities::item::ItemKind;
use crate::entities::ItemBag;

/// Base stats for a unit type, independent of any particular unit instance.
#[derive(Debug, Clone, Copy)]
pub struct UnitStats {
    pub base_strength: u32,
    pub capacity: Option<u32>,
    /// Ticks to recruit a single unit of this type at speed 1.0.
    pub recruit_ticks_per_unit: u64,
    /// If set, only a structure of the same race may recruit this unit.
    pub race: Option<&'static str>,
}

/// Defaults applied when a structure of a given type is first built.
#[derive(Debug, Clone)]
pub struct StructureDefaults {
    pub max_level: u32,
    pub base_build_time_ticks: u64,
    pub build_cost: ItemBag,
    /// Ticks and resources to go from level `n` to `n+1`, per level.
    pub upgrade_time_ticks: u64,
    pub upgrade_cost: ItemBag,
    /// Fraction shaved off crafting time for a craft performed at this
    /// structure type (0.0 for types with no workshop bonus).
    pub crafting_bonus: f64,
}

/// A craftable recipe: base time and material cost at skill level 1.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub base_time_ticks: u64,
    pub materials: ItemBag,
}

/// A read-only source of game-balance data. Pure and synchronous: lookups
/// never touch the store or the network.
pub trait Catalog: Send + Sync {
    fn unit_stats(&self, unit_type: &str) -> Option<UnitStats>;
    fn structure_defaults(&self, structure_type: &str) -> Option<StructureDefaults>;
    fn item_kind(&self, item_code: &str) -> Option<ItemKind>;
    fn recipe(&self, recipe_id: &str) -> Option<Recipe>;
}

fn bag(entries: &[(&str, u64)]) -> ItemBag {
    entries.iter().map(|(code, qty)| ((*code).to_string(), *qty)).collect()
}

/// Bundled reference catalog covering the item and unit codes named in the
/// design notes (`human_warrior`, `outpost`/`watchtower`/`fortress`/
/// `stronghold`/`spawn`, `wooden_sticks`/`stone_pieces`).
pub struct StaticCatalog {
    units: HashMap<&'static str, UnitStats>,
    structures: HashMap<&'static str, StructureDefaults>,
    items: HashMap<&'static str, ItemKind>,
    recipes: HashMap<&'static str, Recipe>,
}

impl StaticCatalog {
    #[must_use]
    pub fn new() -> Self {
        let mut units = HashMap::new();
        units.insert(
            "human_warrior",
            UnitStats { base_strength: 10, capacity: None, recruit_ticks_per_unit: 3, race: Some("human") },
        );
        units.insert(
            "player",
            UnitStats { base_strength: 5, capacity: None, recruit_ticks_per_unit: 0, race: None },
        );
        units.insert(
            "rowboat",
            UnitStats { base_strength: 0, capacity: Some(4), recruit_ticks_per_unit: 5, race: None },
        );

        let mut structures = HashMap::new();
        structures.insert(
            "outpost",
            StructureDefaults {
                max_level: 3,
                base_build_time_ticks: 1,
                build_cost: bag(&[("wooden_sticks", 5), ("stone_pieces", 3)]),
                upgrade_time_ticks: 10,
                upgrade_cost: bag(&[("wooden_sticks", 10), ("stone_pieces", 5)]),
                crafting_bonus: 0.0,
            },
        );
        structures.insert(
            "watchtower",
            StructureDefaults {
                max_level: 3,
                base_build_time_ticks: 15,
                build_cost: bag(&[("wooden_sticks", 10), ("stone_pieces", 10)]),
                upgrade_time_ticks: 20,
                upgrade_cost: bag(&[("wooden_sticks", 20), ("stone_pieces", 20)]),
                crafting_bonus: 0.0,
            },
        );
        structures.insert(
            "fortress",
            StructureDefaults {
                max_level: 5,
                base_build_time_ticks: 40,
                build_cost: bag(&[("wooden_sticks", 40), ("stone_pieces", 40)]),
                upgrade_time_ticks: 50,
                upgrade_cost: bag(&[("wooden_sticks", 50), ("stone_pieces", 50)]),
                crafting_bonus: 0.1,
            },
        );
        structures.insert(
            "stronghold",
            StructureDefaults {
                max_level: 5,
                base_build_time_ticks: 80,
                build_cost: bag(&[("wooden_sticks", 80), ("stone_pieces", 80)]),
                upgrade_time_ticks: 100,
                upgrade_cost: bag(&[("wooden_sticks", 100), ("stone_pieces", 100)]),
                crafting_bonus: 0.15,
            },
        );
        structures.insert(
            "spawn",
            StructureDefaults {
                max_level: 1,
                base_build_time_ticks: 0,
                build_cost: ItemBag::new(),
                upgrade_time_ticks: 0,
                upgrade_cost: ItemBag::new(),
                crafting_bonus: 0.0,
            },
        );

        let mut items = HashMap::new();
        items.insert("wooden_sticks", ItemKind::Resource);
        items.insert("stone_pieces", ItemKind::Resource);

        let mut recipes = HashMap::new();
        recipes.insert(
            "wooden_sword",
            Recipe { base_time_ticks: 20, materials: bag(&[("wooden_sticks", 5)]) },
        );
        recipes.insert(
            "stone_axe",
            Recipe { base_time_ticks: 30, materials: bag(&[("wooden_sticks", 3), ("stone_pieces", 5)]) },
        );

        Self { units, structures, items, recipes }
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog for StaticCatalog {
    fn unit_stats(&self, unit_type: &str) -> Option<UnitStats> {
        self.units.get(unit_type).copied()
    }

    fn structure_defaults(&self, structure_type: &str) -> Option<StructureDefaults> {
        self.structures.get(structure_type).cloned()
    }

    fn item_kind(&self, item_code: &str) -> Option<ItemKind> {
        self.items.get(item_code).copied()
    }

    fn recipe(&self, recipe_id: &str) -> Option<Recipe> {
        self.recipes.get(recipe_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_catalog_knows_baseline_entries() {
        let catalog = StaticCatalog::new();
        assert!(catalog.unit_stats("human_warrior").is_some());
        assert!(catalog.structure_defaults("stronghold").is_some());
        assert_eq!(catalog.item_kind("wooden_sticks"), Some(ItemKind::Resource));
        assert!(catalog.unit_stats("unknown_unit").is_none());
    }
}
