//! Selling-price relative metrics, built on top of [`Costing`].

use std::cmp::Ordering;

use serde::Serialize;

use infra::ids::Id;

use crate::catalog::{Product, Workbook};
use crate::costing::{CostBreakdown, Costing};

/// How many products the margin ranking keeps.
pub const RANKING_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitReport {
    pub yield_revenue: f64,
    pub yield_profit: f64,
    pub unit_profit: f64,
    /// Unit profit as a percentage of the selling price.
    pub margin: f64,
    #[serde(flatten)]
    pub costs: CostBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginRank {
    pub id: Id<Product>,
    pub name: String,
    pub margin: f64,
    pub unit_profit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub ingredient_count: usize,
    pub product_count: usize,
    pub sub_recipe_count: usize,
    pub ranking: Vec<MarginRank>,
    /// Sellable products with nothing in their recipe.
    pub empty_recipes: Vec<String>,
    /// Products whose cost hit the recursion depth guard.
    pub truncated: Vec<String>,
}

pub fn resolve_product_profit(workbook: &Workbook, id: &Id<Product>) -> ProfitReport {
    let product = match workbook.product(id) {
        Some(product) => product,
        None => return ProfitReport::default(),
    };

    let costs = Costing::new(workbook).product_cost(id);
    let yield_revenue = product.selling_price * product.yield_amount;
    let yield_profit = yield_revenue - costs.total_cost;
    let unit_profit = product.selling_price - costs.unit_cost;
    let margin = if product.selling_price > 0.0 {
        (unit_profit / product.selling_price) * 100.0
    } else {
        0.0
    };

    ProfitReport {
        yield_revenue,
        yield_profit,
        unit_profit,
        margin,
        costs,
    }
}

pub fn dashboard(workbook: &Workbook) -> Dashboard {
    let sellable = workbook
        .products
        .iter()
        .filter(|p| p.is_sellable())
        .collect::<Vec<&Product>>();

    let mut ranking = sellable
        .iter()
        .map(|p| {
            let profit = resolve_product_profit(workbook, &p.id);
            MarginRank {
                id: p.id,
                name: p.name.clone(),
                margin: profit.margin,
                unit_profit: profit.unit_profit,
            }
        })
        .collect::<Vec<_>>();
    ranking.sort_by(|a, b| b.margin.partial_cmp(&a.margin).unwrap_or(Ordering::Equal));
    ranking.truncate(RANKING_SIZE);

    let costing = Costing::new(workbook);
    let truncated = workbook
        .products
        .iter()
        .filter(|p| costing.product_cost(&p.id).truncated)
        .map(|p| p.name.clone())
        .collect();

    Dashboard {
        ingredient_count: workbook.ingredients.len(),
        product_count: sellable.len(),
        sub_recipe_count: workbook.products.iter().filter(|p| p.is_sub_recipe()).count(),
        ranking,
        empty_recipes: sellable
            .iter()
            .filter(|p| p.ingredients.is_empty())
            .map(|p| p.name.clone())
            .collect(),
        truncated,
    }
}

impl Dashboard {
    pub fn best_margin(&self) -> Option<f64> {
        self.ranking.first().map(|r| r.margin)
    }
}
