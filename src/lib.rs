//! # cfgmigrate
//!
//! Versioned migrations for live configuration documents:
//! - Ordered schema patches applied like database migrations
//! - JSON and YAML file stores with an integer `version` marker
//! - Operator-added keys are quarantined, never deleted
//! - Read-ahead of migration scripts, strictly ordered application
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Migrator                            │
//! │         (lock with timeout, traversal, graceful stop)       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Source    │          │    Store    │
//!   │ (scripts by │          │ (JSON/YAML  │
//!   │  version)   │          │  document)  │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Document   │
//!                           │ (merge +    │
//!                           │ quarantine) │
//!                           └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use cfgmigrate::{Config, DriverRegistry, Migrator};
//!
//! let registry = DriverRegistry::builtin();
//! let migrator = Migrator::new(&registry, "file://migrations", "yaml://app.yaml", Config::default())?;
//! migrator.up()?;
//! println!("at version {}", migrator.version()?);
//! # Ok::<(), cfgmigrate::MigrateError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod url;

pub mod document;
pub mod migration;
pub mod source;
pub mod store;
pub mod registry;
pub mod migrator;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MigrateError, Result};
pub use config::Config;
pub use migration::{Migration, Version, NIL_VERSION};
pub use migrator::{Migrator, StopHandle};
pub use registry::DriverRegistry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cfgmigrate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
