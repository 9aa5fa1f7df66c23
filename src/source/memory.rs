//! In-memory source
//!
//! Scripts registered directly in code. Handy for embedding and tests.

use std::io::Cursor;

use bytes::Bytes;

use crate::error::Result;
use crate::migration::{MigrationBody, Version};

use super::{MigrationSource, ScriptIndex};

/// Migration source backed by in-memory scripts
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    index: ScriptIndex<Bytes>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the forward script of `version`
    pub fn up(mut self, version: Version, identifier: &str, body: impl Into<Bytes>) -> Self {
        self.index.entry(version).up = Some((identifier.to_string(), body.into()));
        self
    }

    /// Register the backward script of `version`
    pub fn down(mut self, version: Version, identifier: &str, body: impl Into<Bytes>) -> Self {
        self.index.entry(version).down = Some((identifier.to_string(), body.into()));
        self
    }

    /// Number of versions with at least one script
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.len() == 0
    }

    fn open(script: &Option<(String, Bytes)>) -> Option<(MigrationBody, String)> {
        script.as_ref().map(|(identifier, body)| {
            let reader: MigrationBody = Box::new(Cursor::new(body.clone()));
            (reader, identifier.clone())
        })
    }
}

impl MigrationSource for MemorySource {
    fn first(&self) -> Result<Option<Version>> {
        Ok(self.index.first())
    }

    fn prev(&self, version: Version) -> Result<Option<Version>> {
        Ok(self.index.prev(version))
    }

    fn next(&self, version: Version) -> Result<Option<Version>> {
        Ok(self.index.next(version))
    }

    fn read_up(&self, version: Version) -> Result<Option<(MigrationBody, String)>> {
        Ok(self.index.get(version).and_then(|s| Self::open(&s.up)))
    }

    fn read_down(&self, version: Version) -> Result<Option<(MigrationBody, String)>> {
        Ok(self.index.get(version).and_then(|s| Self::open(&s.down)))
    }
}
