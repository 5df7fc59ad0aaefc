use std::fmt;
use std::str::FromStr;

use err_derive::Error;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use infra::ids::{Entity, Id, IdParseError, DIVIDER};

use crate::units::Unit;

pub const DEFAULT_CURRENCY: &str = "TWD";
pub const WORKBOOK_VERSION: &str = "1.0";

/// A raw ingredient, bought in bulk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: Id<Ingredient>,
    pub name: String,
    #[serde(default = "Unit::mass")]
    pub unit: Unit,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default = "one")]
    pub purchase_amount: f64,
}

/// A recipe, producing `yield_amount` units per batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Id<Product>,
    pub name: String,
    #[serde(default = "one")]
    pub yield_amount: f64,
    #[serde(default = "Unit::count")]
    pub yield_unit: Unit,
    #[serde(default)]
    pub selling_price: f64,
    #[serde(default)]
    pub labor_cost_override: Option<f64>,
    #[serde(default)]
    pub is_available_as_ingredient: bool,
    #[serde(default)]
    pub ingredients: Vec<RecipeLine>,
}

/// One line of a recipe: `amount` base units of some component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    #[serde(rename = "id")]
    pub component: Component,
    pub amount: f64,
}

/// Anything that may appear in a recipe. The kind is carried by the id's
/// prefix, so it is known as soon as the line is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Ingredient(Id<Ingredient>),
    Product(Id<Product>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentParseError {
    #[error(display = "{:?} names neither an ingredient nor a product", _0)]
    UnknownKind(String),
    #[error(display = "invalid component id")]
    Id(#[error(source)] IdParseError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub global_labor_cost: f64,
    pub currency: String,
}

/// Everything the calculator knows, persisted as one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    #[serde(default = "current_version")]
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
    pub ingredients: Vec<Ingredient>,
    pub products: Vec<Product>,
}

fn one() -> f64 {
    1.0
}

fn current_version() -> String {
    WORKBOOK_VERSION.to_string()
}

impl Ingredient {
    pub fn cost_per_unit(&self) -> f64 {
        if self.purchase_amount == 0.0 {
            0.0
        } else {
            self.purchase_price / self.purchase_amount
        }
    }
}

impl Product {
    pub fn uses(&self, component: &Component) -> bool {
        self.ingredients.iter().any(|l| l.component == *component)
    }

    /// Sold to customers, rather than only feeding other recipes.
    pub fn is_sellable(&self) -> bool {
        !self.is_available_as_ingredient || self.selling_price > 0.0
    }

    pub fn is_sub_recipe(&self) -> bool {
        !self.is_sellable()
    }
}

impl RecipeLine {
    pub fn new(component: Component, amount: f64) -> Self {
        RecipeLine { component, amount }
    }
}

impl From<Id<Ingredient>> for Component {
    fn from(id: Id<Ingredient>) -> Self {
        Component::Ingredient(id)
    }
}

impl From<Id<Product>> for Component {
    fn from(id: Id<Product>) -> Self {
        Component::Product(id)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Component::Ingredient(id) => write!(fmt, "{}", id),
            Component::Product(id) => write!(fmt, "{}", id),
        }
    }
}

impl FromStr for Component {
    type Err = ComponentParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let kind = src.split(DIVIDER).next().unwrap_or_default();
        if kind == Ingredient::PREFIX {
            src.parse().map(Component::Ingredient).map_err(ComponentParseError::Id)
        } else if kind == Product::PREFIX {
            src.parse().map(Component::Product).map_err(ComponentParseError::Id)
        } else {
            Err(ComponentParseError::UnknownKind(src.to_string()))
        }
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Component {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            global_labor_cost: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Workbook {
            version: current_version(),
            settings: Settings::default(),
            ingredients: Vec::new(),
            products: Vec::new(),
        }
    }
}

impl Entity for Ingredient {
    const PREFIX: &'static str = "ingredient";
}

impl Entity for Product {
    const PREFIX: &'static str = "product";
}

impl Entity for Workbook {
    const PREFIX: &'static str = "workbook";
}
