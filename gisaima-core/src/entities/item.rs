//! Item storage shared by tiles, structures, and personal banks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ItemCode;

/// A code-to-quantity map. Kept deliberately untyped (no per-entry struct)
/// since every storage location — tile ground, structure warehouse, personal
/// bank — is the same shape; a catalog supplies the metadata an item code
/// implies (see [`crate::catalog::Catalog`]).
pub type ItemBag = HashMap<ItemCode, u64>;

/// Broad classification used only by the catalog to describe an item code;
/// never stored on an entity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Resource,
    Weapon,
    Tool,
    Scroll,
    Artifact,
}

/// Moves `amount` of `code` from `from` to `to`, clamped to what's available.
/// Returns the amount actually moved.
pub fn transfer(from: &mut ItemBag, to: &mut ItemBag, code: &str, amount: u64) -> u64 {
    let available = from.get(code).copied().unwrap_or(0);
    let moved = available.min(amount);
    if moved == 0 {
        return 0;
    }
    let remaining = available - moved;
    if remaining == 0 {
        from.remove(code);
    } else {
        from.insert(code.to_string(), remaining);
    }
    *to.entry(code.to_string()).or_insert(0) += moved;
    moved
}

/// Adds `amount` of `code`, creating the entry if absent.
pub fn add(bag: &mut ItemBag, code: &str, amount: u64) {
    if amount == 0 {
        return;
    }
    *bag.entry(code.to_string()).or_insert(0) += amount;
}

/// Older world snapshots stored items as a list of `{code, quantity}`
/// objects rather than a code-keyed map. Folds that shape into the current
/// map representation; a no-op on already-normalized bags.
#[must_use]
pub fn normalize_items(raw: &serde_json::Value) -> ItemBag {
    let mut bag = ItemBag::new();
    match raw {
        serde_json::Value::Object(map) => {
            for (code, qty) in map {
                if let Some(n) = qty.as_u64() {
                    add(&mut bag, code, n);
                }
            }
        }
        serde_json::Value::Array(list) => {
            for entry in list {
                let code = entry.get("code").and_then(serde_json::Value::as_str);
                let qty = entry.get("quantity").and_then(serde_json::Value::as_u64);
                if let (Some(code), Some(qty)) = (code, qty) {
                    add(&mut bag, code, qty);
                }
            }
        }
        _ => {}
    }
    bag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_clamps_to_available() {
        let mut from = ItemBag::from([("wood".to_string(), 3)]);
        let mut to = ItemBag::new();
        let moved = transfer(&mut from, &mut to, "wood", 10);
        assert_eq!(moved, 3);
        assert!(!from.contains_key("wood"));
        assert_eq!(to["wood"], 3);
    }

    #[test]
    fn normalize_items_handles_both_shapes() {
        let legacy = serde_json::json!([{"code": "wood", "quantity": 2}]);
        let modern = serde_json::json!({"wood": 2});
        assert_eq!(normalize_items(&legacy), normalize_items(&modern));
    }
}
