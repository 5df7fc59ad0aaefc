//! Guarded with `#[cfg(test)]` from `lib.rs`

use env_logger;
use maplit::btreeset;
use std::collections::BTreeSet;

use crate::catalog::{Component, Settings};
use crate::costing::MAX_RECURSION_DEPTH;
use crate::store::{NewProduct, ProductPatch, Store};
use crate::units::{format_currency, Unit};


use self::junk_drawer::{bakery, Bakery, FlakyStorage};

#[test]
fn bread_costs_and_earns_as_worked_out_by_hand() {
    env_logger::try_init().unwrap_or_default();
    let Bakery { store, bread, .. } = bakery();

    let profit = store.product_profit(&bread);

    assert_eq!(profit.costs.ingredients_cost, 50.0);
    assert_eq!(profit.costs.labor_cost, 5.0);
    assert_eq!(profit.costs.total_cost, 55.0);
    assert_eq!(profit.costs.unit_cost, 55.0);
    assert_eq!(profit.unit_profit, 45.0);
    assert_eq!(profit.margin, 45.0);
    assert_eq!(format_currency(profit.unit_profit, &store.settings().currency), "45 TWD");
}

#[test]
fn nested_products_cost_their_sub_recipes() {
    env_logger::try_init().unwrap_or_default();
    let Bakery {
        mut store, bread, ..
    } = bakery();
    let platter = store
        .add_product(NewProduct::new("Platter", 1.0, Unit::Piece, 300.0).with_labor_cost(0.0))
        .expect("add platter");
    store
        .add_recipe_line(&platter.id, bread.into(), 2.0)
        .expect("add bread to platter");

    let costs = store.product_cost(&platter.id);

    assert_eq!(costs.ingredients_cost, 110.0);
    assert_eq!(costs.total_cost, 110.0);
}

#[test]
fn global_labor_applies_without_override() {
    env_logger::try_init().unwrap_or_default();
    let Bakery {
        mut store, bread, ..
    } = bakery();
    store
        .save_settings(Settings {
            global_labor_cost: 20.0,
            ..Settings::default()
        })
        .expect("settings");

    assert_eq!(store.product_cost(&bread).labor_cost, 5.0);

    store
        .update_product(
            &bread,
            ProductPatch {
                labor_cost_override: Some(None),
                ..ProductPatch::default()
            },
        )
        .expect("clear override");

    assert_eq!(store.product_cost(&bread).labor_cost, 20.0);
    assert_eq!(store.product_cost(&bread).total_cost, 70.0);
}

#[test]
fn price_changes_flow_into_every_user() {
    env_logger::try_init().unwrap_or_default();
    let Bakery {
        mut store,
        flour,
        bread,
    } = bakery();

    store
        .update_ingredient(
            &flour,
            crate::store::IngredientPatch {
                purchase_price: Some(200.0),
                ..Default::default()
            },
        )
        .expect("update flour");

    assert_eq!(store.product_cost(&bread).ingredients_cost, 100.0);
}

#[test]
fn failed_writes_keep_the_in_memory_change() {
    env_logger::try_init().unwrap_or_default();
    let Bakery {
        mut store, bread, ..
    } = Bakery::new(FlakyStorage::default());

    store.storage().set_failing(true);
    store
        .update_product(
            &bread,
            ProductPatch {
                selling_price: Some(120.0),
                ..ProductPatch::default()
            },
        )
        .expect("update");

    assert!(!store.is_persisted());
    assert_eq!(store.product(&bread).map(|p| p.selling_price), Some(120.0));

    store.storage().set_failing(false);
    store.reset_to_defaults();
    assert!(store.is_persisted());
}

#[test]
fn imported_cycles_still_cost_finitely() {
    env_logger::try_init().unwrap_or_default();
    let Bakery { store, flour, .. } = bakery();
    let a = infra::ids::IdGen::new().generate::<crate::catalog::Product>();
    let b = infra::ids::IdGen::new().generate::<crate::catalog::Product>();
    let snapshot = serde_json::json!({
        "version": "1.0",
        "ingredients": store.ingredients(),
        "products": [
            {
                "id": a.to_string(), "name": "A", "isAvailableAsIngredient": true,
                "laborCostOverride": 1.0,
                "ingredients": [
                    { "id": b.to_string(), "amount": 1.0 },
                    { "id": flour.to_string(), "amount": 10.0 },
                ],
            },
            {
                "id": b.to_string(), "name": "B", "isAvailableAsIngredient": true,
                "laborCostOverride": 1.0,
                "ingredients": [{ "id": a.to_string(), "amount": 1.0 }],
            },
        ],
    });
    let mut store = Store::open(infra::persistence::MemoryStorage::new());
    store
        .import_snapshot(&snapshot.to_string())
        .expect("import");

    let costs = store.product_cost(&a);

    assert!(costs.truncated);
    assert!(costs.total_cost.is_finite());
    // A is costed at every even depth up to the guard (flour 1 + labor 1),
    // B at every odd depth (labor 1).
    let a_levels = (MAX_RECURSION_DEPTH / 2 + 1) as f64;
    assert_eq!(costs.total_cost, a_levels * 2.0 + (a_levels - 1.0));

    let board = store.dashboard();
    let names = board.truncated.iter().cloned().collect::<BTreeSet<_>>();
    assert_eq!(names, btreeset! { "A".to_string(), "B".to_string() });

    let result = store.add_recipe_line(&b, Component::Ingredient(flour), 1.0);
    assert!(result.is_ok(), "{:?}", result);
}

#[test]
fn export_import_round_trip_preserves_everything() {
    env_logger::try_init().unwrap_or_default();
    let Bakery { store, .. } = bakery();
    let exported = store.export_snapshot().expect("export");

    let mut other = Store::open(infra::persistence::MemoryStorage::new());
    other.import_snapshot(&exported).expect("import");

    assert_eq!(other.workbook(), store.workbook());
}
