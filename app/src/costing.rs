//! Recursive cost resolution over the recipe graph.
//!
//! Costs are recomputed from scratch on every call. Sub-products are resolved
//! by descending into their own recipes; each descent adds one to the depth,
//! and any branch deeper than [`MAX_RECURSION_DEPTH`] is cut off and costed as
//! zero. The guard is per call path, so a product reached along several
//! branches is costed once per branch.

use std::collections::HashSet;

use log::*;
use serde::Serialize;

use infra::ids::Id;

use crate::catalog::{Component, Ingredient, Product, RecipeLine, Workbook};

pub const MAX_RECURSION_DEPTH: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub total_cost: f64,
    pub unit_cost: f64,
    pub labor_cost: f64,
    pub ingredients_cost: f64,
    /// Some branch below this product was cut off by the depth guard, so the
    /// figures above undercount.
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Costing<'a> {
    workbook: &'a Workbook,
}

impl<'a> Costing<'a> {
    pub fn new(workbook: &'a Workbook) -> Self {
        Costing { workbook }
    }

    /// Price per base unit of an ingredient; zero when unknown.
    pub fn cost_per_unit(&self, id: &Id<Ingredient>) -> f64 {
        self.workbook
            .ingredient(id)
            .map(Ingredient::cost_per_unit)
            .unwrap_or(0.0)
    }

    pub fn resolve_component_cost(&self, component: &Component, depth: usize) -> f64 {
        self.component_cost(component, depth).0
    }

    fn component_cost(&self, component: &Component, depth: usize) -> (f64, bool) {
        match component {
            Component::Ingredient(id) => (self.cost_per_unit(id), false),
            Component::Product(id) => {
                let costs = self.resolve_product_cost(id, depth);
                (costs.unit_cost, costs.truncated)
            }
        }
    }

    pub fn resolve_product_cost(&self, id: &Id<Product>, depth: usize) -> CostBreakdown {
        if depth > MAX_RECURSION_DEPTH {
            warn!("Max recursion depth reached for product: {}", id);
            return CostBreakdown {
                truncated: true,
                ..CostBreakdown::default()
            };
        }

        let product = match self.workbook.product(id) {
            Some(product) => product,
            None => {
                debug!("Costing unknown product {} as zero", id);
                return CostBreakdown::default();
            }
        };

        let mut ingredients_cost = 0.0;
        let mut truncated = false;
        for line in product.ingredients.iter() {
            let (cost, cut) = self.component_cost(&line.component, depth + 1);
            ingredients_cost += cost * line.amount;
            truncated |= cut;
        }

        let labor_cost = product
            .labor_cost_override
            .unwrap_or(self.workbook.settings.global_labor_cost);
        let total_cost = ingredients_cost + labor_cost;
        let unit_cost = if product.yield_amount > 0.0 {
            total_cost / product.yield_amount
        } else {
            0.0
        };

        trace!(
            "Cost of {} at depth {}: total {} unit {}",
            id,
            depth,
            total_cost,
            unit_cost
        );

        CostBreakdown {
            total_cost,
            unit_cost,
            labor_cost,
            ingredients_cost,
            truncated,
        }
    }

    /// Top-level cost of a product.
    pub fn product_cost(&self, id: &Id<Product>) -> CostBreakdown {
        self.resolve_product_cost(id, 0)
    }

    pub fn recipe_line_cost(&self, line: &RecipeLine) -> f64 {
        self.resolve_component_cost(&line.component, 0) * line.amount
    }

    /// Whether `product` is `target`, or uses it anywhere in its recipe tree.
    pub fn depends_on(&self, product: &Id<Product>, target: &Id<Product>) -> bool {
        let mut seen = HashSet::new();
        let mut pending = vec![*product];
        while let Some(id) = pending.pop() {
            if id == *target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(p) = self.workbook.product(&id) {
                pending.extend(p.ingredients.iter().filter_map(|l| match l.component {
                    Component::Product(sub) => Some(sub),
                    Component::Ingredient(_) => None,
                }));
            }
        }
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::catalog::Settings;
    use crate::units::Unit;
    use infra::ids::IdGen;

    fn ingredient(idgen: &IdGen, price: f64, amount: f64) -> Ingredient {
        Ingredient {
            id: idgen.generate(),
            name: "Flour".into(),
            unit: Unit::Gram,
            purchase_price: price,
            purchase_amount: amount,
        }
    }

    fn product(idgen: &IdGen, lines: Vec<RecipeLine>) -> Product {
        Product {
            id: idgen.generate(),
            name: "Bun".into(),
            yield_amount: 1.0,
            yield_unit: Unit::Piece,
            selling_price: 0.0,
            labor_cost_override: None,
            is_available_as_ingredient: true,
            ingredients: lines,
        }
    }

    fn workbook(labor: f64) -> Workbook {
        Workbook {
            settings: Settings {
                global_labor_cost: labor,
                ..Settings::default()
            },
            ..Workbook::default()
        }
    }

    #[test]
    fn ingredient_cost_is_price_over_amount() {
        let idgen = IdGen::new();
        let mut wb = workbook(0.0);
        let flour = ingredient(&idgen, 100.0, 1000.0);
        wb.ingredients.push(flour.clone());

        assert_eq!(Costing::new(&wb).cost_per_unit(&flour.id), 0.1);
    }

    #[test]
    fn unknown_ingredient_costs_nothing() {
        let wb = workbook(0.0);
        assert_eq!(Costing::new(&wb).cost_per_unit(&IdGen::new().generate()), 0.0);
    }

    #[test]
    fn zero_purchase_amount_costs_nothing() {
        let idgen = IdGen::new();
        let mut wb = workbook(0.0);
        let salt = ingredient(&idgen, 30.0, 0.0);
        wb.ingredients.push(salt.clone());

        let costing = Costing::new(&wb);
        assert_eq!(costing.cost_per_unit(&salt.id), 0.0);
        assert_eq!(
            costing.resolve_component_cost(&Component::Ingredient(salt.id), 0),
            0.0
        );
    }

    #[test]
    fn empty_recipe_costs_only_labor() {
        let idgen = IdGen::new();
        let mut wb = workbook(5.0);
        let p = product(&idgen, vec![]);
        wb.products.push(p.clone());

        let costs = Costing::new(&wb).product_cost(&p.id);

        assert_eq!(costs.ingredients_cost, 0.0);
        assert_eq!(costs.labor_cost, 5.0);
        assert_eq!(costs.total_cost, 5.0);
    }

    #[test]
    fn labor_override_replaces_global_labor() {
        let idgen = IdGen::new();
        let mut wb = workbook(5.0);
        let mut p = product(&idgen, vec![]);
        p.labor_cost_override = Some(12.0);
        wb.products.push(p.clone());

        let costs = Costing::new(&wb).product_cost(&p.id);

        assert_eq!(costs.labor_cost, 12.0);
        assert_eq!(costs.total_cost, 12.0);
    }

    #[test]
    fn zero_yield_has_zero_unit_cost() {
        let idgen = IdGen::new();
        let mut wb = workbook(5.0);
        let mut p = product(&idgen, vec![]);
        p.yield_amount = 0.0;
        wb.products.push(p.clone());

        let costs = Costing::new(&wb).product_cost(&p.id);

        assert_eq!(costs.total_cost, 5.0);
        assert_eq!(costs.unit_cost, 0.0);
    }

    #[test]
    fn unknown_product_costs_nothing() {
        let wb = workbook(5.0);
        let costs = Costing::new(&wb).product_cost(&IdGen::new().generate());
        assert_eq!(costs, CostBreakdown::default());
    }

    #[test]
    fn nested_products_cost_their_unit_cost_times_amount() {
        let idgen = IdGen::new();
        let mut wb = workbook(0.0);
        let flour = ingredient(&idgen, 100.0, 1000.0);
        // 0.1 per g * 200 g = 20 per batch of 4, so 5 each.
        let mut dough = product(&idgen, vec![RecipeLine::new(flour.id.into(), 200.0)]);
        dough.yield_amount = 4.0;
        // 2 dough = 10, plus labor 2, over 2 = 6 each.
        let mut bun = product(&idgen, vec![RecipeLine::new(dough.id.into(), 2.0)]);
        bun.yield_amount = 2.0;
        bun.labor_cost_override = Some(2.0);
        // 3 buns = 18.
        let tray = product(&idgen, vec![RecipeLine::new(bun.id.into(), 3.0)]);
        wb.ingredients.push(flour);
        wb.products.extend(vec![dough.clone(), bun.clone(), tray.clone()]);

        let costing = Costing::new(&wb);

        assert_eq!(costing.product_cost(&dough.id).unit_cost, 5.0);
        assert_eq!(costing.product_cost(&bun.id).unit_cost, 6.0);
        let tray_costs = costing.product_cost(&tray.id);
        assert_eq!(tray_costs.ingredients_cost, 18.0);
        assert!(!tray_costs.truncated);
    }

    #[test]
    fn unknown_components_cost_nothing() {
        let idgen = IdGen::new();
        let mut wb = workbook(1.0);
        let stale = vec![
            RecipeLine::new(Component::Ingredient(idgen.generate()), 10.0),
            RecipeLine::new(Component::Product(idgen.generate()), 10.0),
        ];
        let p = product(&idgen, stale);
        wb.products.push(p.clone());

        let costs = Costing::new(&wb).product_cost(&p.id);

        assert_eq!(costs.ingredients_cost, 0.0);
        assert_eq!(costs.total_cost, 1.0);
    }

    fn chain(idgen: &IdGen, wb: &mut Workbook, len: usize) -> Vec<Id<Product>> {
        let flour = ingredient(idgen, 1.0, 1.0);
        let mut next: Component = flour.id.into();
        wb.ingredients.push(flour);
        let mut ids = Vec::new();
        for _ in 0..len {
            let p = product(idgen, vec![RecipeLine::new(next, 1.0)]);
            next = p.id.into();
            ids.push(p.id);
            wb.products.push(p);
        }
        ids.reverse();
        ids
    }

    #[test]
    fn chain_within_depth_limit_is_fully_costed() {
        let idgen = IdGen::new();
        let mut wb = workbook(1.0);
        // The top product at depth 0 down to the last at depth 10.
        let ids = chain(&idgen, &mut wb, MAX_RECURSION_DEPTH + 1);

        let costs = Costing::new(&wb).product_cost(&ids[0]);

        assert_eq!(costs.total_cost, (MAX_RECURSION_DEPTH + 1) as f64 + 1.0);
        assert!(!costs.truncated);
    }

    #[test]
    fn chain_beyond_depth_limit_zeroes_the_deepest_branch() {
        let idgen = IdGen::new();
        let mut wb = workbook(1.0);
        let ids = chain(&idgen, &mut wb, MAX_RECURSION_DEPTH + 3);

        let costing = Costing::new(&wb);
        let costs = costing.product_cost(&ids[0]);

        // Products at depths 0..=10 each add their labor; everything below
        // is cut off.
        assert_eq!(costs.total_cost, (MAX_RECURSION_DEPTH + 1) as f64);
        assert!(costs.truncated);
        assert_eq!(
            costing.resolve_product_cost(&ids[0], MAX_RECURSION_DEPTH + 1),
            CostBreakdown {
                truncated: true,
                ..CostBreakdown::default()
            }
        );
    }

    #[test]
    fn cyclic_recipes_terminate() {
        let idgen = IdGen::new();
        let mut wb = workbook(1.0);
        let mut a = product(&idgen, vec![]);
        let mut b = product(&idgen, vec![]);
        a.ingredients.push(RecipeLine::new(b.id.into(), 1.0));
        b.ingredients.push(RecipeLine::new(a.id.into(), 1.0));
        wb.products.extend(vec![a.clone(), b.clone()]);

        let costing = Costing::new(&wb);
        let costs = costing.product_cost(&a.id);

        assert_eq!(costs.total_cost, (MAX_RECURSION_DEPTH + 1) as f64);
        assert!(costs.truncated);
        assert!(costing.depends_on(&a.id, &b.id));
        assert!(costing.depends_on(&b.id, &a.id));
    }

    #[test]
    fn shared_sub_products_are_costed_on_every_branch() {
        let idgen = IdGen::new();
        let mut wb = workbook(0.0);
        let mut base = product(&idgen, vec![]);
        base.labor_cost_override = Some(3.0);
        let left = product(&idgen, vec![RecipeLine::new(base.id.into(), 1.0)]);
        let right = product(&idgen, vec![RecipeLine::new(base.id.into(), 2.0)]);
        let top = product(
            &idgen,
            vec![
                RecipeLine::new(left.id.into(), 1.0),
                RecipeLine::new(right.id.into(), 1.0),
            ],
        );
        wb.products.extend(vec![base, left, right, top.clone()]);

        let costs = Costing::new(&wb).product_cost(&top.id);

        assert_eq!(costs.ingredients_cost, 9.0);
    }

    #[test]
    fn depends_on_follows_sub_products_only_downwards() {
        let idgen = IdGen::new();
        let mut wb = workbook(0.0);
        let leaf = product(&idgen, vec![]);
        let mid = product(&idgen, vec![RecipeLine::new(leaf.id.into(), 1.0)]);
        let top = product(&idgen, vec![RecipeLine::new(mid.id.into(), 1.0)]);
        wb.products.extend(vec![leaf.clone(), mid.clone(), top.clone()]);

        let costing = Costing::new(&wb);

        assert!(costing.depends_on(&top.id, &leaf.id));
        assert!(costing.depends_on(&leaf.id, &leaf.id));
        assert!(!costing.depends_on(&leaf.id, &top.id));
    }

    #[test]
    fn recipe_line_cost_multiplies_amount() {
        let idgen = IdGen::new();
        let mut wb = workbook(0.0);
        let flour = ingredient(&idgen, 100.0, 1000.0);
        wb.ingredients.push(flour.clone());

        let line = RecipeLine::new(flour.id.into(), 500.0);

        assert_eq!(Costing::new(&wb).recipe_line_cost(&line), 50.0);
    }
}
