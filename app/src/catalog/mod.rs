//! Ingredients, products and the workbook that holds them.

use std::fmt;

use serde::Serialize;

use infra::ids::{Entity, Id};

use crate::units::Unit;

mod models;

pub use self::models::{
    Component, ComponentParseError, Ingredient, Product, RecipeLine, Settings, Workbook,
    DEFAULT_CURRENCY, WORKBOOK_VERSION,
};

/// A pickable recipe component, as offered to recipe editors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentEntry {
    pub component: Component,
    pub name: String,
    pub unit: Unit,
}

impl Workbook {
    pub fn id() -> Id<Workbook> {
        Id::hashed("nightcalc_data")
    }

    pub fn ingredient(&self, id: &Id<Ingredient>) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.id == *id)
    }

    pub fn product(&self, id: &Id<Product>) -> Option<&Product> {
        self.products.iter().find(|p| p.id == *id)
    }

    pub fn contains(&self, component: &Component) -> bool {
        match component {
            Component::Ingredient(id) => self.ingredient(id).is_some(),
            Component::Product(id) => self.product(id).is_some(),
        }
    }

    /// Looks up a component whether or not it is currently offered to recipes.
    pub fn entry(&self, component: &Component) -> Option<ComponentEntry> {
        match component {
            Component::Ingredient(id) => self.ingredient(id).map(|i| ComponentEntry {
                component: *component,
                name: i.name.clone(),
                unit: i.unit,
            }),
            Component::Product(id) => self.product(id).map(|p| ComponentEntry {
                component: *component,
                name: p.name.clone(),
                unit: p.yield_unit,
            }),
        }
    }

    /// Products whose recipe mentions `component`, in workbook order.
    pub fn users_of<'a>(&'a self, component: &'a Component) -> impl Iterator<Item = &'a Product> {
        self.products.iter().filter(move |p| p.uses(component))
    }

    /// Every ingredient, then every product flagged as usable in recipes,
    /// leaving out `excluding` so a product is never offered to itself.
    pub fn available_components(&self, excluding: Option<&Id<Product>>) -> Vec<ComponentEntry> {
        let raw = self.ingredients.iter().map(|i| ComponentEntry {
            component: Component::Ingredient(i.id),
            name: i.name.clone(),
            unit: i.unit,
        });
        let products = self
            .products
            .iter()
            .filter(|p| p.is_available_as_ingredient && Some(&p.id) != excluding)
            .map(|p| ComponentEntry {
                component: Component::Product(p.id),
                name: p.name.clone(),
                unit: p.yield_unit,
            });
        raw.chain(products).collect()
    }
}

impl ComponentEntry {
    pub fn kind(&self) -> &'static str {
        match self.component {
            Component::Ingredient(_) => Ingredient::PREFIX,
            Component::Product(_) => Product::PREFIX,
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        query.is_empty() || self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

impl fmt::Display for ComponentEntry {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self.component {
            Component::Ingredient(_) => write!(fmt, "{} [{}]", self.name, self.unit),
            Component::Product(_) => write!(fmt, "{} (product) [{}]", self.name, self.unit),
        }
    }
}
