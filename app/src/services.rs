//! Request types served by the store, one per screen of the calculator.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::*;
use serde::Serialize;

use infra::ids::Id;
use infra::persistence::Storage;

use crate::catalog::{ComponentEntry, Ingredient, Product, RecipeLine};
use crate::profit::{Dashboard, ProfitReport};
use crate::store::{export_filename, Store};
use crate::units::Unit;

pub trait Request {
    type Resp;
}

pub trait Queryable<Req>
where
    Req: Request,
{
    fn query(&self, req: Req) -> Result<Req::Resp>;
}

pub trait Commandable<Req>
where
    Req: Request,
{
    fn execute(&mut self, req: Req) -> Result<Req::Resp>;
}

#[derive(Debug, Clone, Copy)]
pub struct ShowProduct(pub Id<Product>);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub product: Product,
    pub profit: ProfitReport,
    pub lines: Vec<LineView>,
}

/// A recipe line with its component looked up. Lines naming a component that
/// no longer exists have no name or unit and cost nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    pub line: RecipeLine,
    pub name: Option<String>,
    pub unit: Option<Unit>,
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ShowDashboard;

#[derive(Debug, Clone, Default)]
pub struct ListComponents {
    pub excluding: Option<Id<Product>>,
    pub query: String,
}

#[derive(Debug, Clone, Copy)]
pub struct ListIngredients;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientView {
    pub ingredient: Ingredient,
    pub cost_per_unit: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ListProducts;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub product: Product,
    pub profit: ProfitReport,
}

/// Writes a snapshot to `path`, or to a date-stamped file in the current
/// directory.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub path: Option<PathBuf>,
    pub today: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct ImportFile(pub PathBuf);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub ingredients: usize,
    pub products: usize,
}

impl Request for ShowProduct {
    type Resp = Option<ProductView>;
}

impl Request for ShowDashboard {
    type Resp = Dashboard;
}

impl Request for ListComponents {
    type Resp = Vec<ComponentEntry>;
}

impl Request for ListIngredients {
    type Resp = Vec<IngredientView>;
}

impl Request for ListProducts {
    type Resp = Vec<ProductSummary>;
}

impl Request for ExportFile {
    type Resp = PathBuf;
}

impl Request for ImportFile {
    type Resp = ImportSummary;
}

impl<S: Storage> Queryable<ShowProduct> for Store<S> {
    fn query(&self, req: ShowProduct) -> Result<Option<ProductView>> {
        let ShowProduct(id) = req;
        let product = match self.product(&id) {
            Some(product) => product.clone(),
            None => return Ok(None),
        };
        let costing = self.costing();
        let lines = product
            .ingredients
            .iter()
            .map(|line| {
                let found = self.workbook().entry(&line.component);
                LineView {
                    line: *line,
                    name: found.as_ref().map(|e| e.name.clone()),
                    unit: found.as_ref().map(|e| e.unit),
                    cost: costing.recipe_line_cost(line),
                }
            })
            .collect();

        Ok(Some(ProductView {
            profit: self.product_profit(&id),
            product,
            lines,
        }))
    }
}

impl<S: Storage> Queryable<ShowDashboard> for Store<S> {
    fn query(&self, _: ShowDashboard) -> Result<Dashboard> {
        Ok(self.dashboard())
    }
}

impl<S: Storage> Queryable<ListComponents> for Store<S> {
    fn query(&self, req: ListComponents) -> Result<Vec<ComponentEntry>> {
        Ok(self.search_components(req.excluding.as_ref(), &req.query))
    }
}

impl<S: Storage> Queryable<ListIngredients> for Store<S> {
    fn query(&self, _: ListIngredients) -> Result<Vec<IngredientView>> {
        Ok(self
            .ingredients()
            .iter()
            .map(|i| IngredientView {
                cost_per_unit: i.cost_per_unit(),
                ingredient: i.clone(),
            })
            .collect())
    }
}

impl<S: Storage> Queryable<ListProducts> for Store<S> {
    fn query(&self, _: ListProducts) -> Result<Vec<ProductSummary>> {
        Ok(self
            .products()
            .iter()
            .map(|p| ProductSummary {
                profit: self.product_profit(&p.id),
                product: p.clone(),
            })
            .collect())
    }
}

impl<S: Storage> Commandable<ExportFile> for Store<S> {
    fn execute(&mut self, req: ExportFile) -> Result<PathBuf> {
        let ExportFile { path, today } = req;
        let path = path.unwrap_or_else(|| PathBuf::from(export_filename(today)));
        let json = self.export_snapshot()?;
        fs::write(&path, json).with_context(|| format!("write export to {:?}", path))?;
        info!("Exported workbook to {:?}", path);
        Ok(path)
    }
}

impl<S: Storage> Commandable<ImportFile> for Store<S> {
    fn execute(&mut self, req: ImportFile) -> Result<ImportSummary> {
        let ImportFile(path) = req;
        let raw = fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
        let workbook = self
            .import_snapshot(&raw)
            .with_context(|| format!("import {:?}", path))?;
        Ok(ImportSummary {
            ingredients: workbook.ingredients.len(),
            products: workbook.products.len(),
        })
    }
}
