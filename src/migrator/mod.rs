//! Migrator Module
//!
//! The orchestration engine that drives a source and a store.
//!
//! ## Responsibilities
//! - Hold the store lock (bounded wait) around every mutating call
//! - Compute traversal plans from the store's current version
//! - Read scripts ahead of application, apply them strictly in order
//! - Honour graceful stop requests between migrations
//!
//! ## Pipeline
//! ```text
//!  producer thread                  bounded channel            caller thread
//! ┌────────────────┐   Migration   ┌───────────────┐  recv   ┌───────────────┐
//! │   Traversal    │──────────────▶│  prefetch N   │────────▶│  apply loop   │
//! │ (source reads) │               └───────────────┘         │ (store.run)   │
//! └───────┬────────┘                                         └───────────────┘
//!         │ spawn per migration
//!         ▼
//!   buffering threads (read body → Bytes)
//! ```

mod stop;
mod traversal;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{after, bounded, select, Receiver, SendError};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::migration::{Migration, Version, NIL_VERSION};
use crate::registry::DriverRegistry;
use crate::source::MigrationSource;
use crate::store::ConfigStore;

use stop::StopSignal;
use traversal::Traversal;

pub use stop::StopHandle;

/// Applies migrations from a source to a config store
///
/// ## Concurrency Model
///
/// - **Writes**: only the calling thread calls `store.run`, one migration at
///   a time, in traversal order
/// - **Reads**: the producer thread walks the source; one short-lived thread
///   per migration buffers its body
/// - **Lock flag**: `is_locked` is read before a lock attempt and written
///   after it; a pending attempt never holds it
pub struct Migrator {
    /// Migrator configuration
    config: Config,

    /// Where migration scripts come from
    source: Arc<dyn MigrationSource>,

    /// The document being migrated
    store: Arc<dyn ConfigStore>,

    /// Whether this migrator currently holds the store lock
    is_locked: Mutex<bool>,

    /// Latched graceful stop request
    stop: Arc<StopSignal>,
}

impl Migrator {
    /// Build a migrator from a source URL and a store URL
    pub fn new(registry: &DriverRegistry, source_url: &str, store_url: &str, config: Config) -> Result<Self> {
        let source = registry.open_source(source_url)?;
        let store = registry.open_store(store_url)?;
        Ok(Self::with_instances(source, store, config))
    }

    /// Build a migrator from a ready source and a store URL
    pub fn with_source(
        registry: &DriverRegistry,
        source: Arc<dyn MigrationSource>,
        store_url: &str,
        config: Config,
    ) -> Result<Self> {
        let store = registry.open_store(store_url)?;
        Ok(Self::with_instances(source, store, config))
    }

    /// Build a migrator from a source URL and a store the caller manages
    pub fn with_store(
        registry: &DriverRegistry,
        source_url: &str,
        store: Arc<dyn ConfigStore>,
        config: Config,
    ) -> Result<Self> {
        let source = registry.open_source(source_url)?;
        Ok(Self::with_instances(source, store, config))
    }

    /// Build a migrator from ready driver instances
    pub fn with_instances(source: Arc<dyn MigrationSource>, store: Arc<dyn ConfigStore>, config: Config) -> Self {
        Self {
            config,
            source,
            store,
            is_locked: Mutex::new(false),
            stop: Arc::new(StopSignal::new()),
        }
    }

    /// Handle for requesting a graceful stop from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.handle()
    }

    // =========================================================================
    // Public Operations
    // =========================================================================

    /// Migrate up or down to `version`
    pub fn migrate(&self, version: Version) -> Result<()> {
        self.with_lock(|| {
            let current = self.current_version()?;
            self.execute(move |t| t.read(current, version))
        })
    }

    /// Apply `n` migrations: forward when positive, backward when negative
    pub fn steps(&self, n: i64) -> Result<()> {
        if n == 0 {
            return Err(MigrateError::NoChange);
        }

        self.with_lock(|| {
            let current = self.current_version()?;
            let limit = Some(n.unsigned_abs());
            if n > 0 {
                self.execute(move |t| t.read_up(current, limit))
            } else {
                self.execute(move |t| t.read_down(current, limit))
            }
        })
    }

    /// Apply every pending forward migration
    pub fn up(&self) -> Result<()> {
        self.with_lock(|| {
            let current = self.current_version()?;
            self.execute(move |t| t.read_up(current, None))
        })
    }

    /// Roll back every applied migration
    pub fn down(&self) -> Result<()> {
        self.with_lock(|| {
            let current = self.current_version()?;
            self.execute(move |t| t.read_down(current, None))
        })
    }

    /// Apply the given migrations in order, ignoring the source
    pub fn run(&self, migrations: Vec<Migration>) -> Result<()> {
        if migrations.is_empty() {
            return Err(MigrateError::NoMigration);
        }

        self.with_lock(|| self.execute(move |t| t.replay(migrations)))
    }

    /// Record `version` without running anything
    pub fn force(&self, version: Version) -> Result<()> {
        if version < NIL_VERSION {
            return Err(MigrateError::VersionNotFound(version));
        }

        self.with_lock(|| {
            self.store
                .set_version(version)
                .map_err(|e| MigrateError::driver("store set version", e))
        })
    }

    /// Erase everything in the store
    pub fn drop_store(&self) -> Result<()> {
        self.with_lock(|| self.store.drop_all().map_err(|e| MigrateError::driver("store drop", e)))
    }

    /// Currently applied version
    ///
    /// Fails with `NilVersion` when nothing was ever applied.
    pub fn version(&self) -> Result<Version> {
        match self.current_version()? {
            NIL_VERSION => Err(MigrateError::NilVersion),
            version => Ok(version),
        }
    }

    /// Close source and store
    pub fn close(&self) -> Result<()> {
        let source = self.source.close().err().map(|e| MigrateError::driver("source close", e));
        let store = self.store.close().err().map(|e| MigrateError::driver("store close", e));
        match MigrateError::combine(source, store) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Whether this migrator holds the store lock right now
    pub fn is_locked(&self) -> bool {
        *self.is_locked.lock()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Run a traversal plan on the producer thread and apply what it yields
    fn execute<F>(&self, plan: F) -> Result<()>
    where
        F: FnOnce(&Traversal) + Send + 'static,
    {
        let (tx, rx) = bounded(self.config.channel_capacity());
        let traversal = Traversal::new(Arc::clone(&self.source), Arc::clone(&self.stop), tx);

        let producer = thread::Builder::new()
            .name("cfgmigrate-traversal".to_string())
            .spawn(move || plan(&traversal))?;

        let result = self.apply_all(&rx);

        // Unblocks a producer waiting on a full channel
        drop(rx);
        if producer.join().is_err() {
            let panicked = MigrateError::Source("traversal thread panicked".to_string());
            return Err(match result {
                Ok(()) => panicked,
                Err(e) => MigrateError::Multiple(vec![e, panicked]),
            });
        }

        result
    }

    /// Drain the channel in arrival order
    fn apply_all(&self, rx: &Receiver<Result<Migration>>) -> Result<()> {
        let mut applied = 0usize;

        for item in rx.iter() {
            if self.stop.should_stop() {
                tracing::info!(applied, "stopped after current migration");
                return Ok(());
            }

            let mut migration = item?;
            self.apply(&mut migration)?;
            applied += 1;
        }

        if applied > 0 {
            tracing::info!(applied, "migrations applied");
        }
        Ok(())
    }

    fn apply(&self, migration: &mut Migration) -> Result<()> {
        match migration.wait_buffered()? {
            Some(body) => self
                .store
                .run(&body, migration.target_version)
                .map_err(|e| MigrateError::driver(format!("store run {}", migration), e))?,
            None => self
                .store
                .set_version(migration.target_version)
                .map_err(|e| MigrateError::driver(format!("store set version {}", migration), e))?,
        }

        tracing::debug!(migration = %migration, target = migration.target_version, "applied");
        Ok(())
    }

    fn current_version(&self) -> Result<Version> {
        self.store.version().map_err(|e| MigrateError::driver("store version", e))
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Lock, run `f`, unlock; unlock errors are kept alongside `f`'s
    fn with_lock<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        self.lock()?;
        let result = f();
        self.unlock_err(result)
    }

    /// Race the store lock against the timeout
    ///
    /// `is_locked` is only held to check it and to set it, never across the
    /// race itself.
    fn lock(&self) -> Result<()> {
        if *self.is_locked.lock() {
            return Err(MigrateError::Locked);
        }

        let (tx, rx) = bounded::<Result<()>>(0);
        let cancel = Arc::new(AtomicBool::new(false));
        let store = Arc::clone(&self.store);
        let attempt_cancel = Arc::clone(&cancel);
        thread::Builder::new()
            .name("cfgmigrate-lock".to_string())
            .spawn(move || {
                let acquired = store.lock_cancellable(&attempt_cancel);
                // Nobody is waiting any more: the timeout won
                if let Err(SendError(Ok(()))) = tx.send(acquired) {
                    tracing::warn!("releasing store lock acquired after timeout");
                    if let Err(e) = store.unlock() {
                        tracing::warn!(error = %e, "failed to release late store lock");
                    }
                }
            })?;

        let raced = select! {
            recv(rx) -> result => Some(result.unwrap_or_else(|_| {
                Err(MigrateError::Storage("lock attempt ended without a result".to_string()))
            })),
            recv(after(self.config.lock_timeout)) -> _ => None,
        };
        let acquired = match raced {
            Some(acquired) => acquired,
            None => self.abandon_lock(&cancel, rx),
        };

        match acquired {
            Ok(()) => {
                *self.is_locked.lock() = true;
                Ok(())
            }
            Err(e @ (MigrateError::LockTimeout | MigrateError::Locked)) => Err(e),
            Err(e) => Err(MigrateError::driver("store lock", e)),
        }
    }

    /// Cancel a lock attempt that lost the race
    ///
    /// Cancellable stores are waited for, so the store is unlocked again when
    /// this returns. Other stores release a late lock from the attempt thread.
    fn abandon_lock(&self, cancel: &AtomicBool, rx: Receiver<Result<()>>) -> Result<()> {
        cancel.store(true, Ordering::SeqCst);
        if !self.store.supports_cancel() {
            return Err(MigrateError::LockTimeout);
        }

        // Granted right before the cancel was seen
        if let Ok(Ok(())) = rx.recv() {
            if let Err(e) = self.store.unlock() {
                return Err(MigrateError::Multiple(vec![
                    MigrateError::LockTimeout,
                    MigrateError::driver("store unlock", e),
                ]));
            }
        }
        Err(MigrateError::LockTimeout)
    }

    fn unlock(&self) -> Result<()> {
        let mut is_locked = self.is_locked.lock();
        self.store.unlock().map_err(|e| MigrateError::driver("store unlock", e))?;
        *is_locked = false;
        Ok(())
    }

    fn unlock_err(&self, previous: Result<()>) -> Result<()> {
        let unlocked = self.unlock().err();
        match MigrateError::combine(previous.err(), unlocked) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
