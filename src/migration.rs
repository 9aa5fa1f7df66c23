//! Migration value object
//!
//! One versioned step plus its body. Buffering runs on a background thread
//! so the next script can be read while the previous one is being applied.

use std::fmt;
use std::io::Read;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{bounded, Receiver};

use crate::error::{MigrateError, Result};

/// Version number of a migration; non-negative, or `NIL_VERSION`
pub type Version = i64;

/// No migration has ever been applied
pub const NIL_VERSION: Version = -1;

/// Readable migration script as handed out by a source
pub type MigrationBody = Box<dyn Read + Send>;

/// Direction of a migration relative to its source version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A single versioned step
pub struct Migration {
    /// Name taken from the script (e.g. `add_feature_flags`)
    pub identifier: String,

    /// Version whose script this is
    pub version: Version,

    /// Version the store holds after this step
    pub target_version: Version,

    has_body: bool,
    body: Option<MigrationBody>,
    buffered: Option<Receiver<Result<Buffered>>>,
    scheduled: Instant,
}

struct Buffered {
    body: Bytes,
    elapsed: Duration,
}

impl Migration {
    /// Create a migration from an optional body
    pub fn new(
        body: Option<MigrationBody>,
        identifier: impl Into<String>,
        version: Version,
        target_version: Version,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            version,
            target_version,
            has_body: body.is_some(),
            body,
            buffered: None,
            scheduled: Instant::now(),
        }
    }

    /// Create a migration whose body is already in memory
    pub fn from_bytes(
        body: impl Into<Bytes>,
        identifier: impl Into<String>,
        version: Version,
        target_version: Version,
    ) -> Self {
        let reader: MigrationBody = Box::new(std::io::Cursor::new(body.into()));
        Self::new(Some(reader), identifier, version, target_version)
    }

    /// A body-less step; only moves the version marker
    pub fn empty(version: Version, target_version: Version) -> Self {
        Self::new(None, "", version, target_version)
    }

    pub fn has_body(&self) -> bool {
        self.has_body
    }

    pub fn direction(&self) -> Direction {
        if self.target_version >= self.version {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// Start reading the body on a background thread
    ///
    /// Does nothing for body-less migrations or if buffering already started.
    pub(crate) fn start_buffering(&mut self) {
        let Some(mut body) = self.body.take() else {
            return;
        };

        let (tx, rx) = bounded(1);
        let started = Instant::now();
        let label = self.to_string();

        let spawned = thread::Builder::new()
            .name("cfgmigrate-buffer".to_string())
            .spawn(move || {
                let mut buf = Vec::new();
                let result = body
                    .read_to_end(&mut buf)
                    .map(|_| Buffered {
                        body: Bytes::from(buf),
                        elapsed: started.elapsed(),
                    })
                    .map_err(MigrateError::from);
                // The receiver is gone when the run was aborted
                let _ = tx.send(result);
            });

        match spawned {
            Ok(_) => {
                tracing::debug!(migration = %label, "started buffering");
                self.buffered = Some(rx);
            }
            Err(e) => {
                let (tx, rx) = bounded(1);
                let _ = tx.send(Err(MigrateError::Io(e)));
                self.buffered = Some(rx);
            }
        }
    }

    /// Block until the body is fully buffered
    ///
    /// Returns `None` for body-less migrations. Starts buffering first if
    /// nothing started it yet.
    pub(crate) fn wait_buffered(&mut self) -> Result<Option<Bytes>> {
        if !self.has_body {
            return Ok(None);
        }
        if self.buffered.is_none() {
            self.start_buffering();
        }

        let rx = self
            .buffered
            .take()
            .ok_or_else(|| MigrateError::Source(format!("migration {} has no body", self)))?;
        let buffered = rx
            .recv()
            .map_err(|_| MigrateError::Source(format!("buffering of {} was interrupted", self)))??;

        tracing::debug!(
            migration = %self,
            bytes = buffered.body.len(),
            buffering_ms = buffered.elapsed.as_millis() as u64,
            waited_ms = self.scheduled.elapsed().as_millis() as u64,
            "finished buffering"
        );

        Ok(Some(buffered.body))
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction() {
            Direction::Up => "u",
            Direction::Down => "d",
        };
        write!(f, "{}/{} {}", self.version, direction, self.identifier)
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("identifier", &self.identifier)
            .field("version", &self.version)
            .field("target_version", &self.target_version)
            .field("has_body", &self.has_body)
            .finish()
    }
}
