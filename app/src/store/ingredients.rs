use log::*;

use infra::ids::Id;
use infra::persistence::Storage;

use super::{check_name, check_non_negative, check_positive, not_found, Store, StoreError};
use crate::catalog::{Component, Ingredient};
use crate::units::Unit;

#[derive(Debug, Clone, PartialEq)]
pub struct NewIngredient {
    pub name: String,
    pub unit: Unit,
    pub purchase_price: f64,
    pub purchase_amount: f64,
}

/// Fields to change on an ingredient; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientPatch {
    pub name: Option<String>,
    pub unit: Option<Unit>,
    pub purchase_price: Option<f64>,
    pub purchase_amount: Option<f64>,
}

impl NewIngredient {
    pub fn new(name: &str, unit: Unit, purchase_price: f64, purchase_amount: f64) -> Self {
        NewIngredient {
            name: name.to_string(),
            unit,
            purchase_price,
            purchase_amount,
        }
    }
}

impl<S: Storage> Store<S> {
    pub fn add_ingredient(&mut self, new: NewIngredient) -> Result<Ingredient, StoreError> {
        let ingredient = Ingredient {
            id: self.idgen.generate(),
            name: check_name(&new.name)?,
            unit: new.unit,
            purchase_price: check_non_negative("purchase price", new.purchase_price)?,
            purchase_amount: check_positive("purchase amount", new.purchase_amount)?,
        };
        debug!("Adding ingredient {}: {:?}", ingredient.id, ingredient.name);

        self.workbook.ingredients.push(ingredient.clone());
        self.persist();
        Ok(ingredient)
    }

    pub fn update_ingredient(
        &mut self,
        id: &Id<Ingredient>,
        patch: IngredientPatch,
    ) -> Result<Ingredient, StoreError> {
        let idx = self
            .workbook
            .ingredients
            .iter()
            .position(|i| i.id == *id)
            .ok_or_else(|| not_found(id))?;

        let mut updated = self.workbook.ingredients[idx].clone();
        if let Some(name) = patch.name {
            updated.name = check_name(&name)?;
        }
        if let Some(unit) = patch.unit {
            updated.unit = unit;
        }
        if let Some(price) = patch.purchase_price {
            updated.purchase_price = check_non_negative("purchase price", price)?;
        }
        if let Some(amount) = patch.purchase_amount {
            updated.purchase_amount = check_positive("purchase amount", amount)?;
        }
        debug!("Updating ingredient {}: {:?}", id, updated);

        self.workbook.ingredients[idx] = updated.clone();
        self.persist();
        Ok(updated)
    }

    /// Refused while any recipe uses the ingredient. Deleting an unknown id
    /// succeeds and changes nothing.
    pub fn delete_ingredient(&mut self, id: &Id<Ingredient>) -> Result<(), StoreError> {
        let component = Component::Ingredient(*id);
        if let Some(user) = self.workbook.users_of(&component).next() {
            info!("Not deleting ingredient {}: used by {}", id, user.id);
            return Err(StoreError::InUse {
                id: user.id,
                name: user.name.clone(),
            });
        }

        debug!("Deleting ingredient {}", id);
        self.workbook.ingredients.retain(|i| i.id != *id);
        self.persist();
        Ok(())
    }
}
