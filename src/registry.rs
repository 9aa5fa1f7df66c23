//! Driver registry
//!
//! Maps URL schemes to source and store constructors. Built once at startup
//! and handed to `Migrator::new`; registering a name twice is rejected.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{MigrateError, Result};
use crate::source::{FileSource, MigrationSource};
use crate::store::{ConfigStore, JsonStore, YamlStore};
use crate::url;

/// Builds a source from its URL
pub type SourceFactory = Box<dyn Fn(&str) -> Result<Arc<dyn MigrationSource>> + Send + Sync>;

/// Builds a store from its URL
pub type StoreFactory = Box<dyn Fn(&str) -> Result<Arc<dyn ConfigStore>> + Send + Sync>;

/// Scheme → driver lookup table
#[derive(Default)]
pub struct DriverRegistry {
    sources: HashMap<String, SourceFactory>,
    stores: HashMap<String, StoreFactory>,
}

impl DriverRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled drivers: `file` source, `json` and `yaml` stores
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.sources.insert(
            "file".to_string(),
            Box::new(|u: &str| Ok(Arc::new(FileSource::open(u)?) as Arc<dyn MigrationSource>)),
        );
        registry.stores.insert(
            "json".to_string(),
            Box::new(|u: &str| Ok(Arc::new(JsonStore::open(u)?) as Arc<dyn ConfigStore>)),
        );
        registry.stores.insert(
            "yaml".to_string(),
            Box::new(|u: &str| Ok(Arc::new(YamlStore::open(u)?) as Arc<dyn ConfigStore>)),
        );
        registry
    }

    /// Register a source driver under `name`
    pub fn register_source<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn(&str) -> Result<Arc<dyn MigrationSource>> + Send + Sync + 'static,
    {
        if self.sources.contains_key(name) {
            return Err(MigrateError::DuplicateDriver(name.to_string()));
        }
        self.sources.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Register a store driver under `name`
    pub fn register_store<F>(&mut self, name: &str, factory: F) -> Result<()>
    where
        F: Fn(&str) -> Result<Arc<dyn ConfigStore>> + Send + Sync + 'static,
    {
        if self.stores.contains_key(name) {
            return Err(MigrateError::DuplicateDriver(name.to_string()));
        }
        self.stores.insert(name.to_string(), Box::new(factory));
        Ok(())
    }

    /// Open a source by URL scheme
    pub fn open_source(&self, source_url: &str) -> Result<Arc<dyn MigrationSource>> {
        let (scheme, _) = url::split_scheme(source_url)?;
        let factory = self
            .sources
            .get(scheme)
            .ok_or_else(|| MigrateError::UnknownDriver(scheme.to_string()))?;
        factory(source_url).map_err(|e| MigrateError::driver(format!("{} source open", scheme), e))
    }

    /// Open a store by URL scheme
    pub fn open_store(&self, store_url: &str) -> Result<Arc<dyn ConfigStore>> {
        let (scheme, _) = url::split_scheme(store_url)?;
        let factory = self
            .stores
            .get(scheme)
            .ok_or_else(|| MigrateError::UnknownDriver(scheme.to_string()))?;
        factory(store_url).map_err(|e| MigrateError::driver(format!("{} store open", scheme), e))
    }

    /// Registered source names, sorted
    pub fn source_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered store names, sorted
    pub fn store_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("sources", &self.source_names())
            .field("stores", &self.store_names())
            .finish()
    }
}
