use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::*;
use serde::{de::DeserializeOwned, Serialize};

use crate::ids::{Entity, Id};

/// Whole-document storage keyed by typed identifiers. Saving replaces
/// whatever was stored under the same id; the last write wins.
pub trait Storage {
    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>>;
    fn save<D: Serialize + Entity>(&self, id: &Id<D>, document: &D) -> Result<()>;
}

/// One pretty-printed JSON file per document inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    docs: RefCell<HashMap<String, serde_json::Value>>,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        FileStorage { dir: dir.into() }
    }

    pub fn setup(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create storage directory {:?}", self.dir))?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of<D: Entity>(&self, id: &Id<D>) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl Storage for FileStorage {
    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>> {
        let path = self.path_of(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No document at {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(e).with_context(|| format!("read {:?}", path)),
        };
        let doc = serde_json::from_slice(&bytes).with_context(|| format!("decode {:?}", path))?;
        Ok(Some(doc))
    }

    fn save<D: Serialize + Entity>(&self, id: &Id<D>, document: &D) -> Result<()> {
        let path = self.path_of(id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(document).context("encode document")?;
        fs::write(&tmp, &json).with_context(|| format!("write {:?}", tmp))?;
        fs::rename(&tmp, &path).with_context(|| format!("rename {:?} to {:?}", tmp, path))?;
        debug!("Saved {} ({} bytes) to {:?}", id, json.len(), path);
        Ok(())
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl Storage for MemoryStorage {
    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>> {
        let docs = self.docs.borrow();
        match docs.get(&id.to_string()) {
            Some(json) => {
                let doc = serde_json::from_value(json.clone()).context("decode document")?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    fn save<D: Serialize + Entity>(&self, id: &Id<D>, document: &D) -> Result<()> {
        let json = serde_json::to_value(document).context("encode document")?;
        self.docs.borrow_mut().insert(id.to_string(), json);
        trace!("Saved {} in memory", id);
        Ok(())
    }
}
