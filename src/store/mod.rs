//! Store Module
//!
//! Persisted configuration documents and their version marker.
//!
//! ## Responsibilities
//! - Own the document; the store is its only writer
//! - Advisory locking around every mutation
//! - Apply one migration body via merge + quarantine
//!
//! ## On-disk layout
//! ```text
//! JSON                         YAML
//! {                            version: 3
//!     "version": 3,            db:
//!     "db": { ... },             pool: 5
//!     "_legacy": "kept"        '#legacy': kept
//! }
//! ```
//! The `version` key is absent exactly when nothing was ever applied.

mod document_store;
mod json;
mod yaml;

use std::sync::atomic::AtomicBool;

use crate::error::Result;
use crate::migration::Version;

pub use document_store::{DocumentFormat, DocumentStore};
pub use json::{JsonFormat, JsonStore};
pub use yaml::{YamlFormat, YamlStore};

/// A persisted configuration document with a version marker
///
/// All methods take `&self`; implementations synchronize internally.
pub trait ConfigStore: Send + Sync {
    /// Take the advisory lock
    ///
    /// Returns `Locked` if this instance already holds it. May block while
    /// another holder keeps it.
    fn lock(&self) -> Result<()>;

    /// Take the advisory lock unless `cancel` is raised first
    ///
    /// Gives up with `LockTimeout` once `cancel` is set, leaving the store
    /// unlocked. The default ignores `cancel` and blocks in `lock`.
    fn lock_cancellable(&self, cancel: &AtomicBool) -> Result<()> {
        let _ = cancel;
        self.lock()
    }

    /// Whether `lock_cancellable` returns promptly after `cancel` is raised
    fn supports_cancel(&self) -> bool {
        false
    }

    /// Release the advisory lock
    fn unlock(&self) -> Result<()>;

    /// Apply one migration body and record `version` as current
    fn run(&self, migration: &[u8], version: Version) -> Result<()>;

    /// Record `version` without touching the rest of the document
    fn set_version(&self, version: Version) -> Result<()>;

    /// Current version, or `NIL_VERSION` for an empty store
    fn version(&self) -> Result<Version>;

    /// Erase all persisted content; the store must be reopened afterwards
    fn drop_all(&self) -> Result<()>;

    /// Release file handles
    fn close(&self) -> Result<()>;
}
