//! Document Module
//!
//! The in-memory shape of a configuration document and the reconciliation
//! that folds a migration's schema patch into a live document.
//!
//! ## Responsibilities
//! - Tagged value tree shared by every text format (JSON, YAML)
//! - Deep merge of schema defaults with operator values
//! - Quarantine of keys the schema no longer declares
//!
//! ## Reconciliation
//! ```text
//!   schema patch S          current document C
//!          │                        │
//!          └──────────┬─────────────┘
//!                     ▼
//!             merge: S, then C on top
//!                     │
//!                     ▼
//!          drop the `version` header key
//!                     │
//!                     ▼
//!     quarantine: keys not in S get a marker
//!                     │
//!                     ▼
//!              reconciled document
//! ```

mod reconcile;
mod value;

pub use reconcile::{merge, quarantine, reconcile, VERSION_KEY};
pub use value::{ConfigValue, Map};
