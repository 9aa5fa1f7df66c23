//! Error types for cfgmigrate
//!
//! Provides a unified error type for all operations.

use std::fmt;

use thiserror::Error;

/// Result type alias using MigrateError
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Unified error type for cfgmigrate operations
#[derive(Debug, Error)]
pub enum MigrateError {
    // -------------------------------------------------------------------------
    // Outcome Signals
    // -------------------------------------------------------------------------
    /// Target equals the current version, or nothing left to apply
    #[error("no change")]
    NoChange,

    /// The store has never been migrated
    #[error("no migration applied yet")]
    NilVersion,

    /// A bounded run exhausted the source before the requested count
    #[error("short limit: {remaining} migration(s) could not be applied")]
    ShortLimit { remaining: u64 },

    /// Explicit run called without any migration
    #[error("no migration given")]
    NoMigration,

    // -------------------------------------------------------------------------
    // Locking Errors
    // -------------------------------------------------------------------------
    #[error("store is already locked")]
    Locked,

    #[error("timed out acquiring store lock")]
    LockTimeout,

    // -------------------------------------------------------------------------
    // Source Errors
    // -------------------------------------------------------------------------
    #[error("version {0} not found in source")]
    VersionNotFound(i64),

    #[error("Source error: {0}")]
    Source(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("store is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Driver Errors
    // -------------------------------------------------------------------------
    #[error("driver {0:?} is already registered")]
    DuplicateDriver(String),

    #[error("no driver registered for scheme {0:?}")]
    UnknownDriver(String),

    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A driver call failed; names the call
    #[error("{call} failed: {source}")]
    Driver {
        call: String,
        #[source]
        source: Box<MigrateError>,
    },

    // -------------------------------------------------------------------------
    // I/O and Serialization Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Aggregation
    // -------------------------------------------------------------------------
    #[error("{}", JoinedErrors(.0))]
    Multiple(Vec<MigrateError>),
}

impl MigrateError {
    /// Wrap an error with the name of the driver call that produced it
    pub fn driver(call: impl Into<String>, source: MigrateError) -> Self {
        MigrateError::Driver {
            call: call.into(),
            source: Box::new(source),
        }
    }

    /// Combine two optional errors, keeping both when both are present
    pub fn combine(first: Option<MigrateError>, second: Option<MigrateError>) -> Option<MigrateError> {
        match (first, second) {
            (None, None) => None,
            (Some(e), None) | (None, Some(e)) => Some(e),
            (Some(MigrateError::Multiple(mut list)), Some(e)) => {
                list.push(e);
                Some(MigrateError::Multiple(list))
            }
            (Some(a), Some(b)) => Some(MigrateError::Multiple(vec![a, b])),
        }
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(e: serde_json::Error) -> Self {
        MigrateError::Serialization(format!("json: {}", e))
    }
}

impl From<serde_yaml::Error> for MigrateError {
    fn from(e: serde_yaml::Error) -> Self {
        MigrateError::Serialization(format!("yaml: {}", e))
    }
}

struct JoinedErrors<'a>(&'a [MigrateError]);

impl fmt::Display for JoinedErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}
