use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use log::*;
use serde::Deserialize;
use structopt::StructOpt;

use infra::ids::Id;
use infra::persistence::FileStorage;
use nightcalc::catalog::{Ingredient, Product, Settings};
use nightcalc::config::{EnvLogger, EnvOverrides};
use nightcalc::input::{IngredientForm, ProductForm, RecipeLineForm};
use nightcalc::services::{
    Commandable, ExportFile, ImportFile, ListComponents, ListIngredients, ListProducts,
    Queryable, ShowDashboard, ShowProduct,
};
use nightcalc::units::{format_currency, format_display_unit};
use nightcalc::Store;

#[derive(Debug, StructOpt)]
#[structopt(name = "nc", about = "NightCalc cost and margin calculator")]
struct Opt {
    /// TOML configuration file
    #[structopt(short = "c", long = "config", parse(from_os_str))]
    config: Option<PathBuf>,
    /// Directory holding the saved workbook
    #[structopt(short = "d", long = "data-dir", parse(from_os_str))]
    data_dir: Option<PathBuf>,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "ingredient", about = "Manage raw ingredients")]
    Ingredient(IngredientCmd),
    #[structopt(name = "product", about = "Manage products")]
    Product(ProductCmd),
    #[structopt(name = "recipe", about = "Edit product recipes")]
    Recipe(RecipeCmd),
    #[structopt(name = "settings", about = "Show or change global settings")]
    Settings(SettingsOpt),
    #[structopt(name = "dashboard", about = "Summarise the workbook")]
    Dashboard,
    #[structopt(name = "export", about = "Write a JSON backup")]
    Export {
        #[structopt(parse(from_os_str))]
        path: Option<PathBuf>,
    },
    #[structopt(name = "import", about = "Replace everything with a JSON backup")]
    Import {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
    #[structopt(name = "reset", about = "Delete everything")]
    Reset {
        #[structopt(long = "yes", help = "Confirm that all data should be deleted")]
        yes: bool,
    },
}

#[derive(Debug, StructOpt)]
enum IngredientCmd {
    #[structopt(name = "add")]
    Add(IngredientFields),
    #[structopt(name = "update")]
    Update {
        id: Id<Ingredient>,
        #[structopt(flatten)]
        fields: IngredientFields,
    },
    #[structopt(name = "delete")]
    Delete { id: Id<Ingredient> },
    #[structopt(name = "list")]
    List,
}

#[derive(Debug, StructOpt)]
struct IngredientFields {
    #[structopt(long = "name")]
    name: Option<String>,
    /// g, ml or piece
    #[structopt(long = "unit")]
    unit: Option<String>,
    /// Price paid for one purchase
    #[structopt(long = "price")]
    price: Option<String>,
    /// Amount bought for that price, in the ingredient's unit
    #[structopt(long = "amount")]
    amount: Option<String>,
}

#[derive(Debug, StructOpt)]
enum ProductCmd {
    #[structopt(name = "add")]
    Add(ProductFields),
    #[structopt(name = "update")]
    Update {
        id: Id<Product>,
        #[structopt(flatten)]
        fields: ProductFields,
    },
    #[structopt(name = "delete")]
    Delete { id: Id<Product> },
    #[structopt(name = "list")]
    List,
    #[structopt(name = "show")]
    Show { id: Id<Product> },
}

#[derive(Debug, StructOpt)]
struct ProductFields {
    #[structopt(long = "name")]
    name: Option<String>,
    /// Units made per batch
    #[structopt(long = "yield")]
    yield_amount: Option<String>,
    #[structopt(long = "yield-unit")]
    yield_unit: Option<String>,
    /// Selling price per unit
    #[structopt(long = "price")]
    price: Option<String>,
    /// Labor cost per batch; empty to use the global default
    #[structopt(long = "labor")]
    labor: Option<String>,
    /// Whether other recipes may use this product
    #[structopt(long = "available")]
    available: Option<bool>,
}

#[derive(Debug, StructOpt)]
enum RecipeCmd {
    #[structopt(name = "add", about = "Add a component to a product's recipe")]
    Add {
        product: Id<Product>,
        component: String,
        amount: String,
    },
    #[structopt(name = "remove", about = "Remove a recipe line by its position")]
    Remove { product: Id<Product>, index: usize },
    #[structopt(name = "components", about = "List components a recipe may use")]
    Components {
        #[structopt(long = "for")]
        product: Option<Id<Product>>,
        #[structopt(default_value = "")]
        query: String,
    },
}

#[derive(Debug, StructOpt)]
struct SettingsOpt {
    #[structopt(long = "labor")]
    labor: Option<f64>,
    #[structopt(long = "currency")]
    currency: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct Config {
    #[serde(flatten)]
    nightcalc: nightcalc::config::Config,
    #[serde(default)]
    env_logger: EnvLogger,
}

impl From<IngredientFields> for IngredientForm {
    fn from(f: IngredientFields) -> Self {
        IngredientForm {
            name: f.name,
            unit: f.unit,
            purchase_price: f.price,
            purchase_amount: f.amount,
        }
    }
}

impl From<ProductFields> for ProductForm {
    fn from(f: ProductFields) -> Self {
        ProductForm {
            name: f.name,
            yield_amount: f.yield_amount,
            yield_unit: f.yield_unit,
            selling_price: f.price,
            labor_cost_override: f.labor,
            is_available_as_ingredient: f.available,
        }
    }
}

fn load_config(opt: &Opt) -> Result<Config> {
    let mut config = match opt.config.as_ref() {
        Some(path) => {
            let buf = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
            toml::from_str(&buf).with_context(|| format!("parse {:?}", path))?
        }
        None => Config::default(),
    };
    config.nightcalc.apply(&EnvOverrides::from_env()?);
    if let Some(dir) = opt.data_dir.as_ref() {
        config.nightcalc.storage.path = dir.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let opt = Opt::from_args();
    let config = load_config(&opt)?;
    config.env_logger.builder().init();
    debug!("Config: {:?}", config);

    let mut store = nightcalc::open(&config.nightcalc)?;
    run(&mut store, opt.command)?;

    if !store.is_persisted() {
        eprintln!("warning: changes could not be saved to disk");
    }
    Ok(())
}

fn run(store: &mut Store<FileStorage>, command: Commands) -> Result<()> {
    let currency = store.settings().currency.clone();
    match command {
        Commands::Ingredient(IngredientCmd::Add(fields)) => {
            let new = IngredientForm::from(fields).into_new()?;
            let ingredient = store.add_ingredient(new)?;
            println!("{}", ingredient.id);
        }
        Commands::Ingredient(IngredientCmd::Update { id, fields }) => {
            let patch = IngredientForm::from(fields).into_patch()?;
            store.update_ingredient(&id, patch)?;
        }
        Commands::Ingredient(IngredientCmd::Delete { id }) => {
            store
                .delete_ingredient(&id)
                .context("Cannot delete ingredient")?;
        }
        Commands::Ingredient(IngredientCmd::List) => {
            for view in store.query(ListIngredients)? {
                let i = &view.ingredient;
                println!(
                    "{}: {} ({} for {}, {} per {})",
                    i.id,
                    i.name,
                    format_currency(i.purchase_price, &currency),
                    format_display_unit(i.purchase_amount, i.unit),
                    format_currency(view.cost_per_unit, &currency),
                    i.unit
                );
            }
        }

        Commands::Product(ProductCmd::Add(fields)) => {
            let new = ProductForm::from(fields).into_new()?;
            let product = store.add_product(new)?;
            println!("{}", product.id);
        }
        Commands::Product(ProductCmd::Update { id, fields }) => {
            let patch = ProductForm::from(fields).into_patch()?;
            store.update_product(&id, patch)?;
        }
        Commands::Product(ProductCmd::Delete { id }) => {
            store.delete_product(&id).context("Cannot delete product")?;
        }
        Commands::Product(ProductCmd::List) => {
            for summary in store.query(ListProducts)? {
                let p = &summary.product;
                let tag = if p.is_sub_recipe() { " [sub-recipe]" } else { "" };
                println!(
                    "{}: {}{} (unit cost {}, margin {:.1}%)",
                    p.id,
                    p.name,
                    tag,
                    format_currency(summary.profit.costs.unit_cost, &currency),
                    summary.profit.margin
                );
            }
        }
        Commands::Product(ProductCmd::Show { id }) => {
            let view = match store.query(ShowProduct(id))? {
                Some(view) => view,
                None => bail!("No product {}", id),
            };
            let p = &view.product;
            let costs = &view.profit.costs;
            println!("{} ({})", p.name, p.id);
            println!(
                "  makes {} per batch, sells at {} each",
                format_display_unit(p.yield_amount, p.yield_unit),
                format_currency(p.selling_price, &currency)
            );
            for (n, line) in view.lines.iter().enumerate() {
                let amount = match line.unit {
                    Some(unit) => format_display_unit(line.line.amount, unit),
                    None => line.line.amount.to_string(),
                };
                println!(
                    "  {}. {} {} = {}",
                    n,
                    line.name.as_deref().unwrap_or("(missing)"),
                    amount,
                    format_currency(line.cost, &currency)
                );
            }
            println!(
                "  ingredients {} + labor {} = {} per batch, {} per unit",
                format_currency(costs.ingredients_cost, &currency),
                format_currency(costs.labor_cost, &currency),
                format_currency(costs.total_cost, &currency),
                format_currency(costs.unit_cost, &currency)
            );
            println!(
                "  profit {} per unit, {} per batch, margin {:.1}%",
                format_currency(view.profit.unit_profit, &currency),
                format_currency(view.profit.yield_profit, &currency),
                view.profit.margin
            );
            if costs.truncated {
                println!("  warning: recipe nests too deeply; cost is understated");
            }
        }

        Commands::Recipe(RecipeCmd::Add {
            product,
            component,
            amount,
        }) => {
            let (component, amount) = RecipeLineForm::new(&component, &amount).parse()?;
            store.add_recipe_line(&product, component, amount)?;
        }
        Commands::Recipe(RecipeCmd::Remove { product, index }) => {
            let line = store.remove_recipe_line(&product, index)?;
            println!("Removed {} x {}", line.amount, line.component);
        }
        Commands::Recipe(RecipeCmd::Components { product, query }) => {
            let entries = store.query(ListComponents {
                excluding: product,
                query,
            })?;
            for entry in entries {
                println!("{}: {}", entry.component, entry);
            }
        }

        Commands::Settings(SettingsOpt { labor, currency }) => {
            if labor.is_some() || currency.is_some() {
                let current = store.settings().clone();
                store.save_settings(Settings {
                    global_labor_cost: labor.unwrap_or(current.global_labor_cost),
                    currency: currency.unwrap_or(current.currency),
                })?;
            }
            let settings = store.settings();
            println!(
                "labor cost per batch: {}",
                format_currency(settings.global_labor_cost, &settings.currency)
            );
            println!("currency: {}", settings.currency);
        }
        Commands::Dashboard => {
            let board = store.query(ShowDashboard)?;
            println!("ingredients: {}", board.ingredient_count);
            println!("products: {}", board.product_count);
            println!("sub-recipes: {}", board.sub_recipe_count);
            if let Some(best) = board.best_margin() {
                println!("best margin: {:.1}%", best);
            }
            for (n, rank) in board.ranking.iter().enumerate() {
                println!(
                    "  {}. {} {:.1}% ({} per unit)",
                    n + 1,
                    rank.name,
                    rank.margin,
                    format_currency(rank.unit_profit, &currency)
                );
            }
            for name in board.empty_recipes.iter() {
                println!("warning: {} has no recipe", name);
            }
            for name in board.truncated.iter() {
                println!("warning: {} nests too deeply; its cost is understated", name);
            }
        }
        Commands::Export { path } => {
            let path = store.execute(ExportFile {
                path,
                today: Local::today().naive_local(),
            })?;
            println!("{}", path.display());
        }
        Commands::Import { path } => {
            let summary = store.execute(ImportFile(path))?;
            println!(
                "Imported {} ingredients and {} products",
                summary.ingredients, summary.products
            );
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("This deletes all data; pass --yes to confirm");
            }
            store.reset_to_defaults();
        }
    }
    Ok(())
}
