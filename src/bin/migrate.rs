//! cfgmigrate CLI
//!
//! Applies configuration migrations from the command line.

use std::time::Duration;

use clap::{Parser, Subcommand};
use cfgmigrate::{Config, DriverRegistry, MigrateError, Migrator};
use tracing_subscriber::{fmt, EnvFilter};

/// cfgmigrate
#[derive(Parser, Debug)]
#[command(name = "cfgmigrate")]
#[command(about = "Versioned migrations for JSON/YAML configuration files")]
#[command(version)]
struct Args {
    /// Migration source URL (e.g. file://migrations)
    #[arg(short, long)]
    source: String,

    /// Config store URL (e.g. yaml://config.yaml)
    #[arg(short = 'c', long)]
    store: String,

    /// Migrations read ahead of the one being applied
    #[arg(long, default_value = "10")]
    prefetch: usize,

    /// Seconds to wait for the store lock
    #[arg(long, default_value = "15")]
    lock_timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply all or N up migrations
    Up {
        /// Number of migrations to apply
        n: Option<u64>,
    },

    /// Roll back all or N migrations
    Down {
        /// Number of migrations to roll back
        n: Option<u64>,
    },

    /// Migrate to a specific version
    Goto {
        /// Target version
        version: i64,
    },

    /// Set the version without running migrations
    Force {
        /// Version to record (-1 for none)
        #[arg(allow_hyphen_values = true)]
        version: i64,
    },

    /// Print the current version
    Version,

    /// Erase the config store
    Drop,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cfgmigrate=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::debug!("cfgmigrate v{}", cfgmigrate::VERSION);
    tracing::debug!("Source: {}", args.source);
    tracing::debug!("Store: {}", args.store);

    let config = Config::builder()
        .prefetch_migrations(args.prefetch)
        .lock_timeout(Duration::from_secs(args.lock_timeout_secs))
        .build();

    let registry = DriverRegistry::builtin();
    let migrator = match Migrator::new(&registry, &args.source, &args.store, config) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to open drivers: {}", e);
            std::process::exit(1);
        }
    };

    let result = match args.command {
        Commands::Up { n: None } => migrator.up(),
        Commands::Up { n: Some(n) } => steps(&migrator, n, 1),
        Commands::Down { n: None } => migrator.down(),
        Commands::Down { n: Some(n) } => steps(&migrator, n, -1),
        Commands::Goto { version } => migrator.migrate(version),
        Commands::Force { version } => migrator.force(version),
        Commands::Drop => migrator.drop_store(),
        Commands::Version => migrator.version().map(|v| println!("{}", v)),
    };

    let closed = migrator.close();

    match result {
        Ok(()) => {}
        Err(MigrateError::NoChange) => tracing::info!("no change"),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }

    if let Err(e) = closed {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn steps(migrator: &Migrator, n: u64, sign: i64) -> cfgmigrate::Result<()> {
    let n = i64::try_from(n).map_err(|_| MigrateError::ShortLimit { remaining: n })?;
    migrator.steps(sign * n)
}
