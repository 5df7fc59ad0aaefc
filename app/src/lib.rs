//! A cost and margin calculator for small food businesses: ingredients,
//! recipes that may nest other recipes, and what each product earns.

use anyhow::{Context, Result};
use log::*;

use infra::persistence::FileStorage;

pub mod catalog;
pub mod config;
pub mod costing;
pub mod input;
pub mod profit;
pub mod services;
pub mod store;
pub mod units;

#[cfg(test)]
mod test;

pub use crate::store::Store;

/// Opens the store described by `config`, creating its data directory if
/// needed.
pub fn open(config: &config::Config) -> Result<Store<FileStorage>> {
    let storage = config.storage.build().context("build storage")?;
    info!("Opening workbook in {:?}", storage.dir());
    Ok(Store::open(storage))
}
