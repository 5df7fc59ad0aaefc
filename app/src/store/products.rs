use log::*;

use infra::ids::Id;
use infra::persistence::Storage;

use super::{check_name, check_non_negative, check_positive, not_found, Store, StoreError};
use crate::catalog::{Component, Product, RecipeLine};
use crate::units::Unit;

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub yield_amount: f64,
    pub yield_unit: Unit,
    pub selling_price: f64,
    pub labor_cost_override: Option<f64>,
    pub is_available_as_ingredient: bool,
}

/// Fields to change on a product; `None` leaves a field alone.
/// `labor_cost_override: Some(None)` clears the override.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub yield_amount: Option<f64>,
    pub yield_unit: Option<Unit>,
    pub selling_price: Option<f64>,
    pub labor_cost_override: Option<Option<f64>>,
    pub is_available_as_ingredient: Option<bool>,
    pub ingredients: Option<Vec<RecipeLine>>,
}

impl NewProduct {
    pub fn new(name: &str, yield_amount: f64, yield_unit: Unit, selling_price: f64) -> Self {
        NewProduct {
            name: name.to_string(),
            yield_amount,
            yield_unit,
            selling_price,
            labor_cost_override: None,
            is_available_as_ingredient: false,
        }
    }

    pub fn with_labor_cost(mut self, labor_cost: f64) -> Self {
        self.labor_cost_override = Some(labor_cost);
        self
    }

    pub fn available_as_ingredient(mut self) -> Self {
        self.is_available_as_ingredient = true;
        self
    }
}

impl<S: Storage> Store<S> {
    /// New products start with an empty recipe.
    pub fn add_product(&mut self, new: NewProduct) -> Result<Product, StoreError> {
        let product = Product {
            id: self.idgen.generate(),
            name: check_name(&new.name)?,
            yield_amount: check_positive("yield amount", new.yield_amount)?,
            yield_unit: new.yield_unit,
            selling_price: check_non_negative("selling price", new.selling_price)?,
            labor_cost_override: check_labor(new.labor_cost_override)?,
            is_available_as_ingredient: new.is_available_as_ingredient,
            ingredients: Vec::new(),
        };
        debug!("Adding product {}: {:?}", product.id, product.name);

        self.workbook.products.push(product.clone());
        self.persist();
        Ok(product)
    }

    pub fn update_product(
        &mut self,
        id: &Id<Product>,
        patch: ProductPatch,
    ) -> Result<Product, StoreError> {
        let idx = self.product_index(id)?;
        let mut updated = self.workbook.products[idx].clone();

        if let Some(name) = patch.name {
            updated.name = check_name(&name)?;
        }
        if let Some(amount) = patch.yield_amount {
            updated.yield_amount = check_positive("yield amount", amount)?;
        }
        if let Some(unit) = patch.yield_unit {
            updated.yield_unit = unit;
        }
        if let Some(price) = patch.selling_price {
            updated.selling_price = check_non_negative("selling price", price)?;
        }
        if let Some(labor) = patch.labor_cost_override {
            updated.labor_cost_override = check_labor(labor)?;
        }
        if let Some(flag) = patch.is_available_as_ingredient {
            if !flag {
                self.check_unused(id)?;
            }
            updated.is_available_as_ingredient = flag;
        }
        if let Some(lines) = patch.ingredients {
            for line in lines.iter() {
                self.check_recipe_line(&updated, line)?;
            }
            updated.ingredients = lines;
        }
        debug!("Updating product {}: {:?}", id, updated);

        self.workbook.products[idx] = updated.clone();
        self.persist();
        Ok(updated)
    }

    /// Refused while another product's recipe uses this one. Deleting an
    /// unknown id succeeds and changes nothing.
    pub fn delete_product(&mut self, id: &Id<Product>) -> Result<(), StoreError> {
        self.check_unused(id)?;

        debug!("Deleting product {}", id);
        self.workbook.products.retain(|p| p.id != *id);
        self.persist();
        Ok(())
    }

    /// Appends a line, or adds `amount` to the existing line for the same
    /// component.
    pub fn add_recipe_line(
        &mut self,
        id: &Id<Product>,
        component: Component,
        amount: f64,
    ) -> Result<Product, StoreError> {
        let idx = self.product_index(id)?;
        let line = RecipeLine::new(component, amount);
        self.check_recipe_line(&self.workbook.products[idx], &line)?;

        let product = &mut self.workbook.products[idx];
        match product
            .ingredients
            .iter_mut()
            .find(|l| l.component == component)
        {
            Some(existing) => existing.amount += amount,
            None => product.ingredients.push(line),
        }
        let product = product.clone();
        debug!("Added {} x {} to {}", amount, component, id);

        self.persist();
        Ok(product)
    }

    pub fn remove_recipe_line(
        &mut self,
        id: &Id<Product>,
        index: usize,
    ) -> Result<RecipeLine, StoreError> {
        let idx = self.product_index(id)?;
        let product = &mut self.workbook.products[idx];
        if index >= product.ingredients.len() {
            return Err(StoreError::Validation(format!(
                "\"{}\" has no recipe line {}",
                product.name, index
            )));
        }
        let line = product.ingredients.remove(index);
        debug!("Removed {} from {}", line.component, id);

        self.persist();
        Ok(line)
    }

    pub fn set_available_as_ingredient(
        &mut self,
        id: &Id<Product>,
        available: bool,
    ) -> Result<Product, StoreError> {
        self.update_product(
            id,
            ProductPatch {
                is_available_as_ingredient: Some(available),
                ..ProductPatch::default()
            },
        )
    }

    fn product_index(&self, id: &Id<Product>) -> Result<usize, StoreError> {
        self.workbook
            .products
            .iter()
            .position(|p| p.id == *id)
            .ok_or_else(|| not_found(id))
    }

    /// Fails when a product other than `id` itself has `id` in its recipe.
    fn check_unused(&self, id: &Id<Product>) -> Result<(), StoreError> {
        let component = Component::Product(*id);
        let mut users = self.workbook.users_of(&component).filter(|p| p.id != *id);
        match users.next() {
            Some(user) => {
                info!("Product {} is still used by {}", id, user.id);
                Err(StoreError::InUse {
                    id: user.id,
                    name: user.name.clone(),
                })
            }
            None => Ok(()),
        }
    }

    fn check_recipe_line(&self, product: &Product, line: &RecipeLine) -> Result<(), StoreError> {
        check_positive("amount", line.amount)?;
        match line.component {
            Component::Ingredient(ref ingredient) => {
                if self.workbook.ingredient(ingredient).is_none() {
                    return Err(not_found(ingredient));
                }
            }
            Component::Product(ref sub) => {
                if *sub == product.id {
                    return Err(StoreError::Validation(format!(
                        "\"{}\" cannot be an ingredient of itself",
                        product.name
                    )));
                }
                let component = self.workbook.product(sub).ok_or_else(|| not_found(sub))?;
                if !component.is_available_as_ingredient {
                    return Err(StoreError::Validation(format!(
                        "\"{}\" is not available as an ingredient",
                        component.name
                    )));
                }
                if self.costing().depends_on(sub, &product.id) {
                    return Err(StoreError::CyclicRecipe {
                        product: product.name.clone(),
                        component: component.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_labor(labor: Option<f64>) -> Result<Option<f64>, StoreError> {
    labor
        .map(|l| check_non_negative("labor cost", l))
        .transpose()
}
