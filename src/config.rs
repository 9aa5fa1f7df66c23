//! Configuration for cfgmigrate
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

/// Main configuration for a Migrator instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Pipeline Configuration
    // -------------------------------------------------------------------------
    /// How many migrations may be read ahead of the one being applied
    pub prefetch_migrations: usize,

    // -------------------------------------------------------------------------
    // Locking Configuration
    // -------------------------------------------------------------------------
    /// Max time to wait for the store lock
    pub lock_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefetch_migrations: 10,
            lock_timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Channel capacity for the prefetch pipeline (never zero)
    pub(crate) fn channel_capacity(&self) -> usize {
        self.prefetch_migrations.max(1)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of migrations buffered ahead of application
    pub fn prefetch_migrations(mut self, count: usize) -> Self {
        self.config.prefetch_migrations = count;
        self
    }

    /// Set the lock acquisition timeout
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.config.lock_timeout = timeout;
        self
    }

    /// Set the lock acquisition timeout (in milliseconds)
    pub fn lock_timeout_ms(mut self, ms: u64) -> Self {
        self.config.lock_timeout = Duration::from_millis(ms);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
