//! The data store. It owns the workbook, checks every mutation, and writes
//! the whole workbook back to storage after each one.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use err_derive::Error;
use log::*;

use infra::ids::{Entity, Id, IdGen};
use infra::persistence::Storage;

use crate::catalog::{ComponentEntry, Ingredient, Product, Settings, Workbook, DEFAULT_CURRENCY};
use crate::costing::{CostBreakdown, Costing};
use crate::profit::{self, Dashboard, ProfitReport};

mod ingredients;
mod products;
mod snapshot;

pub use self::ingredients::{IngredientPatch, NewIngredient};
pub use self::products::{NewProduct, ProductPatch};

/// A rejected store operation. Nothing was changed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error(display = "{}", _0)]
    Validation(String),
    #[error(display = "{} {} not found", kind, id)]
    NotFound { kind: &'static str, id: String },
    #[error(display = "used in \"{}\"", name)]
    InUse { id: Id<Product>, name: String },
    #[error(
        display = "\"{}\" cannot use \"{}\": that would make the recipe include itself",
        product,
        component
    )]
    CyclicRecipe { product: String, component: String },
}

/// A rejected snapshot import. The store is left as it was.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(display = "Failed to parse JSON: {}", _0)]
    Parse(#[error(source)] serde_json::Error),
    #[error(display = "Invalid file format: missing ingredients or products.")]
    MissingCollections,
    #[error(display = "Invalid file format: {}", _0)]
    Shape(String),
}

#[derive(Debug)]
pub struct Store<S> {
    storage: S,
    workbook: Workbook,
    idgen: IdGen,
    persisted: bool,
}

pub fn export_filename(date: NaiveDate) -> String {
    format!("nightcalc_backup_{}.json", date.format("%Y-%m-%d"))
}

impl<S: Storage> Store<S> {
    /// Loads the saved workbook, or starts empty when there is none or it
    /// cannot be read.
    pub fn open(storage: S) -> Self {
        let workbook = match storage.load(&Workbook::id()) {
            Ok(Some(workbook)) => {
                info!(
                    "Loaded workbook with {} ingredients and {} products",
                    workbook.ingredients.len(),
                    workbook.products.len()
                );
                workbook
            }
            Ok(None) => {
                debug!("No saved workbook; starting empty");
                Workbook::default()
            }
            Err(e) => {
                error!("Failed to load saved workbook, starting empty: {:#}", e);
                Workbook::default()
            }
        };
        Store {
            storage,
            workbook,
            idgen: IdGen::new(),
            persisted: true,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn settings(&self) -> &Settings {
        &self.workbook.settings
    }

    pub fn costing(&self) -> Costing<'_> {
        Costing::new(&self.workbook)
    }

    /// Whether the most recent write reached storage.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    fn persist(&mut self) {
        match self.storage.save(&Workbook::id(), &self.workbook) {
            Ok(()) => self.persisted = true,
            Err(e) => {
                warn!("Failed to save workbook: {:#}", e);
                self.persisted = false;
            }
        }
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.workbook.ingredients
    }

    pub fn products(&self) -> &[Product] {
        &self.workbook.products
    }

    pub fn ingredient(&self, id: &Id<Ingredient>) -> Option<&Ingredient> {
        self.workbook.ingredient(id)
    }

    pub fn product(&self, id: &Id<Product>) -> Option<&Product> {
        self.workbook.product(id)
    }

    pub fn available_components(&self, excluding: Option<&Id<Product>>) -> Vec<ComponentEntry> {
        self.workbook.available_components(excluding)
    }

    pub fn search_components(
        &self,
        excluding: Option<&Id<Product>>,
        query: &str,
    ) -> Vec<ComponentEntry> {
        let query = query.trim();
        self.available_components(excluding)
            .into_iter()
            .filter(|e| e.matches(query))
            .collect()
    }

    pub fn product_cost(&self, id: &Id<Product>) -> CostBreakdown {
        self.costing().product_cost(id)
    }

    pub fn product_profit(&self, id: &Id<Product>) -> ProfitReport {
        profit::resolve_product_profit(&self.workbook, id)
    }

    pub fn dashboard(&self) -> Dashboard {
        profit::dashboard(&self.workbook)
    }

    /// Blank currency labels fall back to the default currency.
    pub fn save_settings(&mut self, settings: Settings) -> Result<&Settings, StoreError> {
        let global_labor_cost = check_non_negative("labor cost", settings.global_labor_cost)?;
        let currency = match settings.currency.trim() {
            "" => DEFAULT_CURRENCY.to_string(),
            c => c.to_string(),
        };
        self.workbook.settings = Settings {
            global_labor_cost,
            currency,
        };
        debug!("Saved settings: {:?}", self.workbook.settings);
        self.persist();
        Ok(&self.workbook.settings)
    }

    pub fn export_snapshot(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.workbook).context("encode workbook")
    }

    pub fn import_snapshot(&mut self, raw: &str) -> Result<&Workbook, ImportError> {
        let mut value: serde_json::Value =
            serde_json::from_str(raw).map_err(ImportError::Parse)?;
        let present = |key: &str| value.get(key).map_or(false, |v| !v.is_null());
        if !present("ingredients") || !present("products") {
            return Err(ImportError::MissingCollections);
        }
        snapshot::adopt_foreign_ids(&mut value);
        let workbook: Workbook =
            serde_json::from_value(value).map_err(|e| ImportError::Shape(e.to_string()))?;

        info!(
            "Importing workbook with {} ingredients and {} products",
            workbook.ingredients.len(),
            workbook.products.len()
        );
        self.workbook = workbook;
        self.persist();
        Ok(&self.workbook)
    }

    pub fn reset_to_defaults(&mut self) {
        info!("Resetting workbook");
        self.workbook = Workbook::default();
        self.persist();
    }
}

fn not_found<T: Entity>(id: &Id<T>) -> StoreError {
    StoreError::NotFound {
        kind: T::PREFIX,
        id: id.to_string(),
    }
}

fn check_name(name: &str) -> Result<String, StoreError> {
    match name.trim() {
        "" => Err(StoreError::Validation("Please enter a name.".to_string())),
        name => Ok(name.to_string()),
    }
}

fn check_non_negative(field: &str, value: f64) -> Result<f64, StoreError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(StoreError::Validation(format!(
            "{} must be zero or more, not {}",
            field, value
        )))
    }
}

fn check_positive(field: &str, value: f64) -> Result<f64, StoreError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(StoreError::Validation(format!(
            "{} must be greater than zero, not {}",
            field, value
        )))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::units::Unit;
    use infra::persistence::{FileStorage, MemoryStorage};

    fn store() -> Store<MemoryStorage> {
        Store::open(MemoryStorage::new())
    }

    #[test]
    fn opens_empty_without_saved_workbook() {
        let store = store();
        assert_eq!(store.workbook(), &Workbook::default());
        assert!(store.is_persisted());
    }

    #[test]
    fn opens_empty_when_saved_workbook_is_unreadable() {
        env_logger::try_init().unwrap_or_default();
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = FileStorage::new(dir.path());
        std::fs::write(
            dir.path().join(format!("{}.json", Workbook::id())),
            br#"{ "ingredients": 3 }"#,
        )
        .expect("write");

        let store = Store::open(storage);

        assert_eq!(store.workbook(), &Workbook::default());
    }

    #[test]
    fn save_settings_defaults_blank_currency() {
        let mut store = store();
        let saved = store
            .save_settings(Settings {
                global_labor_cost: 5.0,
                currency: "  ".into(),
            })
            .expect("save settings")
            .clone();

        assert_eq!(saved.currency, DEFAULT_CURRENCY);
        assert_eq!(store.settings().global_labor_cost, 5.0);
    }

    #[test]
    fn save_settings_rejects_negative_labor() {
        let mut store = store();
        let result = store.save_settings(Settings {
            global_labor_cost: -1.0,
            currency: "EUR".into(),
        });

        assert!(matches!(result, Err(StoreError::Validation(_))), "{:?}", result);
        assert_eq!(store.settings(), &Settings::default());
    }

    #[test]
    fn export_filename_is_date_stamped() {
        let date = NaiveDate::from_ymd(2024, 3, 9);
        assert_eq!(export_filename(date), "nightcalc_backup_2024-03-09.json");
    }

    #[test]
    fn import_requires_both_collections() {
        let mut store = store();
        store
            .add_ingredient(NewIngredient::new("Sugar", Unit::Gram, 40.0, 1000.0))
            .expect("add");
        let before = store.workbook().clone();

        for raw in &[
            r#"{"ingredients": []}"#,
            r#"{"products": []}"#,
            r#"{"ingredients": null, "products": []}"#,
            r#"[1, 2, 3]"#,
        ] {
            let result = store.import_snapshot(raw);
            assert!(
                matches!(result, Err(ImportError::MissingCollections)),
                "{}: {:?}",
                raw,
                result
            );
        }
        assert_eq!(store.workbook(), &before);
    }

    #[test]
    fn import_rejects_unparseable_text() {
        let mut store = store();
        let result = store.import_snapshot("{ nope");
        assert!(matches!(result, Err(ImportError::Parse(_))), "{:?}", result);
        assert!(result
            .unwrap_err()
            .to_string()
            .starts_with("Failed to parse JSON"));
    }

    #[test]
    fn import_rejects_malformed_entities() {
        let mut store = store();
        let result =
            store.import_snapshot(r#"{"ingredients": [{"name": "no id"}], "products": []}"#);
        assert!(matches!(result, Err(ImportError::Shape(_))), "{:?}", result);
        assert_eq!(store.workbook(), &Workbook::default());
    }

    #[test]
    fn import_reads_backups_with_free_form_ids() {
        env_logger::try_init().unwrap_or_default();
        let raw = r#"{
            "ingredients": [{
                "id": "id-lx3k9a-abc1234", "name": "Flour", "unit": "g",
                "purchasePrice": 100, "purchaseAmount": 1000
            }],
            "products": [{
                "id": "id-lx3k9b-def5678", "name": "Bread",
                "yieldAmount": 1, "yieldUnit": "piece", "sellingPrice": 100,
                "laborCostOverride": 5, "isAvailableAsIngredient": false,
                "ingredients": [
                    {"id": "id-lx3k9a-abc1234", "amount": 500},
                    {"id": "id-deleted-long-ago", "amount": 3}
                ]
            }]
        }"#;
        let mut store = store();

        let imported = store.import_snapshot(raw).expect("import").clone();

        let flour = Id::<Ingredient>::hashed("id-lx3k9a-abc1234");
        let bread = Id::<Product>::hashed("id-lx3k9b-def5678");
        assert_eq!(store.ingredient(&flour).map(|i| i.name.as_str()), Some("Flour"));
        assert_eq!(
            store.product(&bread).map(|p| p.ingredients[0].component),
            Some(crate::catalog::Component::Ingredient(flour))
        );
        let profit = store.product_profit(&bread);
        assert_eq!(profit.costs.ingredients_cost, 50.0);
        assert_eq!(profit.costs.total_cost, 55.0);
        assert_eq!(profit.margin, 45.0);

        let mut again = Store::open(MemoryStorage::new());
        again.import_snapshot(raw).expect("import again");
        assert_eq!(again.workbook(), &imported);
    }

    #[test]
    fn import_merges_settings_with_defaults() {
        let mut store = store();
        let imported = store
            .import_snapshot(
                r#"{"settings": {"globalLaborCost": 12}, "ingredients": [], "products": []}"#,
            )
            .expect("import")
            .clone();

        assert_eq!(imported.settings.global_labor_cost, 12.0);
        assert_eq!(imported.settings.currency, DEFAULT_CURRENCY);
        assert_eq!(imported.version, crate::catalog::WORKBOOK_VERSION);
    }

    #[test]
    fn reset_empties_the_workbook() {
        let mut store = store();
        store
            .add_ingredient(NewIngredient::new("Sugar", Unit::Gram, 40.0, 1000.0))
            .expect("add");
        store
            .save_settings(Settings {
                global_labor_cost: 3.0,
                currency: "EUR".into(),
            })
            .expect("settings");

        store.reset_to_defaults();

        assert_eq!(store.workbook(), &Workbook::default());
        let saved: Option<Workbook> = store.storage().load(&Workbook::id()).expect("load");
        assert_eq!(saved, Some(Workbook::default()));
    }

    #[test]
    fn search_matches_names_case_insensitively() {
        let mut store = store();
        store
            .add_ingredient(NewIngredient::new("Brown Sugar", Unit::Gram, 40.0, 1000.0))
            .expect("add");
        store
            .add_ingredient(NewIngredient::new("Salt", Unit::Gram, 10.0, 500.0))
            .expect("add");

        let found = store
            .search_components(None, " SUGAR ")
            .into_iter()
            .map(|e| e.name)
            .collect::<Vec<_>>();

        assert_eq!(found, vec!["Brown Sugar".to_string()]);
        assert_eq!(store.search_components(None, "").len(), 2);
    }
}
