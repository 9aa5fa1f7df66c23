//! Source Module
//!
//! Ordered providers of migration scripts, indexed by version.
//!
//! ## Responsibilities
//! - Report the first version and step to the next/previous one
//! - Hand out the up or down script of a version
//!
//! A missing version or script is `Ok(None)`, never an error; the migrator
//! turns it into traversal decisions.

mod file;
mod memory;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::migration::{MigrationBody, Version};

pub use file::FileSource;
pub use memory::MemorySource;

/// Ordered provider of migration scripts
pub trait MigrationSource: Send + Sync {
    /// Earliest available version
    fn first(&self) -> Result<Option<Version>>;

    /// Version immediately before `version`
    fn prev(&self, version: Version) -> Result<Option<Version>>;

    /// Version immediately after `version`
    fn next(&self, version: Version) -> Result<Option<Version>>;

    /// Forward script of `version` and its identifier
    fn read_up(&self, version: Version) -> Result<Option<(MigrationBody, String)>>;

    /// Backward script of `version` and its identifier
    fn read_down(&self, version: Version) -> Result<Option<(MigrationBody, String)>>;

    /// Release any resources held by the source
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Up/down scripts registered for one version
#[derive(Debug, Clone)]
pub(crate) struct Scripts<T> {
    pub up: Option<(String, T)>,
    pub down: Option<(String, T)>,
}

impl<T> Default for Scripts<T> {
    fn default() -> Self {
        Self { up: None, down: None }
    }
}

/// Version-ordered index shared by the bundled sources
#[derive(Debug, Clone)]
pub(crate) struct ScriptIndex<T> {
    versions: BTreeMap<Version, Scripts<T>>,
}

impl<T> Default for ScriptIndex<T> {
    fn default() -> Self {
        Self {
            versions: BTreeMap::new(),
        }
    }
}

impl<T> ScriptIndex<T> {
    pub fn entry(&mut self, version: Version) -> &mut Scripts<T> {
        self.versions.entry(version).or_default()
    }

    pub fn first(&self) -> Option<Version> {
        self.versions.keys().next().copied()
    }

    pub fn prev(&self, version: Version) -> Option<Version> {
        self.versions.range(..version).next_back().map(|(v, _)| *v)
    }

    pub fn next(&self, version: Version) -> Option<Version> {
        use std::ops::Bound::{Excluded, Unbounded};
        self.versions
            .range((Excluded(version), Unbounded))
            .next()
            .map(|(v, _)| *v)
    }

    pub fn get(&self, version: Version) -> Option<&Scripts<T>> {
        self.versions.get(&version)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }
}
