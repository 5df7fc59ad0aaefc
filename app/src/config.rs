use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::*;
use serde::{Deserialize, Serialize};

use infra::persistence::FileStorage;

pub const ENV_PREFIX: &str = "NIGHTCALC_";

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub path: PathBuf,
}

/// Settings taken from `NIGHTCALC_*` environment variables. These win over
/// the config file.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
pub struct EnvOverrides {
    pub data_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct EnvLogger {
    level: Option<LogLevel>,
    modules: HashMap<String, LogLevel>,
    timestamp_nanos: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: PathBuf::from("nightcalc-data"),
        }
    }
}

impl Config {
    pub fn apply(&mut self, overrides: &EnvOverrides) {
        if let Some(dir) = overrides.data_dir.as_ref() {
            debug!("Data directory overridden to {:?}", dir);
            self.storage.path = dir.clone();
        }
    }
}

impl StorageConfig {
    pub fn build(&self) -> Result<FileStorage> {
        debug!("Build storage from {:?}", self);
        let storage = FileStorage::new(&self.path);
        storage
            .setup()
            .with_context(|| format!("set up storage at {:?}", self.path))?;
        Ok(storage)
    }
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_env()
            .context("read NIGHTCALC_* environment")
    }

    pub fn from_vars<I: IntoIterator<Item = (String, String)>>(vars: I) -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("read NIGHTCALC_* variables")
    }
}

impl LogLevel {
    fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl EnvLogger {
    /// Starts from `RUST_LOG`, then applies the configured levels on top.
    pub fn builder(&self) -> env_logger::Builder {
        let mut b = env_logger::Builder::from_default_env();
        if let Some(level) = self.level {
            b.filter_level(level.to_filter());
        }

        for (module, level) in self.modules.iter() {
            b.filter_module(module, level.to_filter());
        }

        if self.timestamp_nanos {
            b.format_timestamp_nanos();
        }

        b
    }
}
