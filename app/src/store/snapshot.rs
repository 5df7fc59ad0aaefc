//! Backups written by older versions of the calculator name entities with
//! free-form ids such as `id-lx3k9a-abc1234`. Those are re-keyed to typed ids
//! before the snapshot is decoded.

use std::collections::HashMap;

use log::*;
use serde_json::Value;

use infra::ids::{Entity, Id};

use crate::catalog::{Component, Ingredient, Product};

/// Replaces every string id that is not already typed with one hashed from
/// it, so the same backup always imports to the same ids. Recipe lines follow
/// their component; a line naming nothing in the snapshot stays stale.
pub(super) fn adopt_foreign_ids(snapshot: &mut Value) {
    let ingredients = retype::<Ingredient>(snapshot.get_mut("ingredients"));
    let products = retype::<Product>(snapshot.get_mut("products"));

    let products_list = match snapshot.get_mut("products").and_then(Value::as_array_mut) {
        Some(list) => list,
        None => return,
    };
    for product in products_list {
        let lines = match product.get_mut("ingredients").and_then(Value::as_array_mut) {
            Some(lines) => lines,
            None => continue,
        };
        for line in lines {
            let id = match line.get_mut("id") {
                Some(id) => id,
                None => continue,
            };
            let old = match id.as_str() {
                Some(old) if old.parse::<Component>().is_err() => old.to_string(),
                _ => continue,
            };
            // Ingredients win when a foreign id names both kinds.
            let new = match ingredients.get(&old).or_else(|| products.get(&old)) {
                Some(new) => new.clone(),
                None => {
                    debug!("Recipe line names unknown component {:?}", old);
                    Id::<Ingredient>::hashed(old.as_str()).to_string()
                }
            };
            *id = Value::String(new);
        }
    }
}

fn retype<T: Entity>(entities: Option<&mut Value>) -> HashMap<String, String> {
    let mut renamed = HashMap::new();
    let entities = match entities.and_then(Value::as_array_mut) {
        Some(entities) => entities,
        None => return renamed,
    };
    for entity in entities {
        let id = match entity.get_mut("id") {
            Some(id) => id,
            None => continue,
        };
        let old = match id.as_str() {
            Some(old) if old.parse::<Id<T>>().is_err() => old.to_string(),
            _ => continue,
        };
        let new = Id::<T>::hashed(old.as_str()).to_string();
        debug!("Re-keying {} {:?} as {}", T::PREFIX, old, new);
        *id = Value::String(new.clone());
        renamed.insert(old, new);
    }
    renamed
}
