//! Loosely typed form input, as entered on the command line, turned into
//! store requests.
//!
//! Numbers are read leniently. When adding, a price that does not parse is
//! taken as zero, and an amount or yield that does not parse (or is zero) is
//! taken as one. When updating, a number that does not parse leaves the old
//! value in place. An empty labor override means "use the global default".

use err_derive::Error;

use crate::catalog::{Component, ComponentParseError};
use crate::store::{IngredientPatch, NewIngredient, NewProduct, ProductPatch};
use crate::units::{Unit, UnitParseError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error(display = "{}", _0)]
    Unit(#[error(source)] UnitParseError),
    #[error(display = "{}", _0)]
    Component(#[error(source)] ComponentParseError),
    #[error(display = "Please enter a valid amount, not {:?}.", _0)]
    Amount(String),
}

/// Ingredient fields as text; `None` means the field was not given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientForm {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub purchase_price: Option<String>,
    pub purchase_amount: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    pub name: Option<String>,
    pub yield_amount: Option<String>,
    pub yield_unit: Option<String>,
    pub selling_price: Option<String>,
    pub labor_cost_override: Option<String>,
    pub is_available_as_ingredient: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecipeLineForm {
    pub component: String,
    pub amount: String,
}

fn number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn price_or_zero(raw: Option<&String>) -> f64 {
    raw.and_then(|r| number(r)).unwrap_or(0.0)
}

fn amount_or_one(raw: Option<&String>) -> f64 {
    match raw.and_then(|r| number(r)) {
        Some(v) if v != 0.0 => v,
        _ => 1.0,
    }
}

fn unit_or(raw: Option<&String>, default: Unit) -> Result<Unit, InputError> {
    match raw.map(|r| r.trim()) {
        None | Some("") => Ok(default),
        Some(r) => r.parse().map_err(InputError::Unit),
    }
}

fn patched_unit(raw: Option<&String>) -> Result<Option<Unit>, InputError> {
    match raw.map(|r| r.trim()) {
        None | Some("") => Ok(None),
        Some(r) => r.parse().map(Some).map_err(InputError::Unit),
    }
}

/// Empty or unreadable text means no override.
fn labor_override(raw: &str) -> Option<f64> {
    number(raw)
}

impl IngredientForm {
    pub fn into_new(self) -> Result<NewIngredient, InputError> {
        Ok(NewIngredient {
            unit: unit_or(self.unit.as_ref(), Unit::mass())?,
            purchase_price: price_or_zero(self.purchase_price.as_ref()),
            purchase_amount: amount_or_one(self.purchase_amount.as_ref()),
            name: self.name.unwrap_or_default(),
        })
    }

    pub fn into_patch(self) -> Result<IngredientPatch, InputError> {
        Ok(IngredientPatch {
            unit: patched_unit(self.unit.as_ref())?,
            purchase_price: self.purchase_price.as_ref().and_then(|r| number(r)),
            purchase_amount: self.purchase_amount.as_ref().and_then(|r| number(r)),
            name: self.name,
        })
    }
}

impl ProductForm {
    pub fn into_new(self) -> Result<NewProduct, InputError> {
        Ok(NewProduct {
            yield_unit: unit_or(self.yield_unit.as_ref(), Unit::count())?,
            yield_amount: amount_or_one(self.yield_amount.as_ref()),
            selling_price: price_or_zero(self.selling_price.as_ref()),
            labor_cost_override: self.labor_cost_override.as_ref().and_then(|r| labor_override(r)),
            is_available_as_ingredient: self.is_available_as_ingredient.unwrap_or(false),
            name: self.name.unwrap_or_default(),
        })
    }

    /// A given but empty labor override clears it.
    pub fn into_patch(self) -> Result<ProductPatch, InputError> {
        let labor_cost_override = match self.labor_cost_override.as_ref().map(|r| r.trim()) {
            None => None,
            Some("") => Some(None),
            Some(r) => number(r).map(Some),
        };
        Ok(ProductPatch {
            yield_unit: patched_unit(self.yield_unit.as_ref())?,
            yield_amount: self.yield_amount.as_ref().and_then(|r| number(r)),
            selling_price: self.selling_price.as_ref().and_then(|r| number(r)),
            labor_cost_override,
            is_available_as_ingredient: self.is_available_as_ingredient,
            ingredients: None,
            name: self.name,
        })
    }
}

impl RecipeLineForm {
    pub fn new(component: &str, amount: &str) -> Self {
        RecipeLineForm {
            component: component.to_string(),
            amount: amount.to_string(),
        }
    }

    /// Unlike the entity forms, a recipe amount has no fallback.
    pub fn parse(&self) -> Result<(Component, f64), InputError> {
        let component = self
            .component
            .trim()
            .parse()
            .map_err(InputError::Component)?;
        match number(&self.amount) {
            Some(amount) if amount > 0.0 => Ok((component, amount)),
            _ => Err(InputError::Amount(self.amount.clone())),
        }
    }
}
