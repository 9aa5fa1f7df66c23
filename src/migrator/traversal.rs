//! Traversal
//!
//! Computes which migrations lie between two versions and streams them into
//! the prefetch channel, starting each one's buffering as it is found.
//!
//! Runs on the producer thread. Every plan ends either by exhausting its
//! steps (channel closes) or by sending exactly one error.

use std::sync::Arc;

use crossbeam::channel::Sender;

use crate::error::{MigrateError, Result};
use crate::migration::{Migration, Version, NIL_VERSION};
use crate::source::MigrationSource;

use super::stop::StopSignal;

/// Producer stopped: plan complete, error sent, stop requested, or the
/// consumer went away
struct Halt;

type Step<T = ()> = std::result::Result<T, Halt>;

pub(crate) struct Traversal {
    source: Arc<dyn MigrationSource>,
    stop: Arc<StopSignal>,
    tx: Sender<Result<Migration>>,
}

impl Traversal {
    pub fn new(source: Arc<dyn MigrationSource>, stop: Arc<StopSignal>, tx: Sender<Result<Migration>>) -> Self {
        Self { source, stop, tx }
    }

    /// Everything between `from` and `to`
    pub fn read(&self, from: Version, to: Version) {
        let _ = self.read_to(from, to);
    }

    /// Up to `limit` steps forward; `None` runs until the source is exhausted
    pub fn read_up(&self, from: Version, limit: Option<u64>) {
        let _ = self.step_up(from, limit);
    }

    /// Up to `limit` steps backward; `None` runs back to `NIL_VERSION`
    pub fn read_down(&self, from: Version, limit: Option<u64>) {
        let _ = self.step_down(from, limit);
    }

    /// Stream caller-supplied migrations as they are
    pub fn replay(&self, migrations: Vec<Migration>) {
        for migration in migrations {
            if self.emit(migration).is_err() {
                return;
            }
        }
    }

    // =========================================================================
    // Plans
    // =========================================================================

    fn read_to(&self, mut from: Version, to: Version) -> Step {
        if from >= 0 {
            self.ensure_exists(from)?;
        }
        if to >= 0 {
            self.ensure_exists(to)?;
        }

        if from == to {
            return self.fail(MigrateError::NoChange);
        }

        if from < to {
            if from == NIL_VERSION {
                self.check_stop()?;
                let first = self.first()?;
                self.schedule(first, first)?;
                from = first;
            }

            while from < to {
                self.check_stop()?;
                let next = match self.call("source next", self.source.next(from))? {
                    Some(next) => next,
                    None => return self.fail(MigrateError::VersionNotFound(to)),
                };
                self.schedule(next, next)?;
                from = next;
            }
        } else {
            while from > to && from >= 0 {
                self.check_stop()?;
                match self.call("source prev", self.source.prev(from))? {
                    Some(prev) => {
                        self.schedule(from, prev)?;
                        from = prev;
                    }
                    None if to == NIL_VERSION => return self.unmigrate(from),
                    None => return self.fail(MigrateError::VersionNotFound(to)),
                }
            }
        }

        Ok(())
    }

    fn step_up(&self, mut from: Version, limit: Option<u64>) -> Step {
        if limit == Some(0) {
            return self.fail(MigrateError::NoChange);
        }

        let mut count = 0u64;
        while limit.map_or(true, |limit| count < limit) {
            self.check_stop()?;

            if from == NIL_VERSION {
                let first = match self.call("source first", self.source.first())? {
                    Some(first) => first,
                    None => return self.exhausted(limit, count),
                };
                self.schedule(first, first)?;
                from = first;
                count += 1;
                continue;
            }

            match self.call("source next", self.source.next(from))? {
                Some(next) => {
                    self.schedule(next, next)?;
                    from = next;
                    count += 1;
                }
                None => return self.exhausted(limit, count),
            }
        }

        Ok(())
    }

    fn step_down(&self, mut from: Version, limit: Option<u64>) -> Step {
        match (limit, from) {
            (Some(0), _) | (None, NIL_VERSION) => return self.fail(MigrateError::NoChange),
            (Some(limit), NIL_VERSION) => return self.fail(MigrateError::ShortLimit { remaining: limit }),
            _ => {}
        }

        let mut count = 0u64;
        while limit.map_or(true, |limit| count < limit) {
            self.check_stop()?;

            match self.call("source prev", self.source.prev(from))? {
                Some(prev) => {
                    self.schedule(from, prev)?;
                    from = prev;
                    count += 1;
                }
                None => {
                    self.unmigrate(from)?;
                    count += 1;
                    if let Some(limit) = limit.filter(|limit| count < *limit) {
                        return self.fail(MigrateError::ShortLimit { remaining: limit - count });
                    }
                    return Ok(());
                }
            }
        }

        Ok(())
    }

    /// Source ran dry while stepping forward
    fn exhausted(&self, limit: Option<u64>, count: u64) -> Step {
        match limit {
            None if count == 0 => self.fail(MigrateError::NoChange),
            None => Err(Halt),
            Some(limit) => self.fail(MigrateError::ShortLimit { remaining: limit - count }),
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn first(&self) -> Step<Version> {
        match self.call("source first", self.source.first())? {
            Some(first) => Ok(first),
            None => self.fail(MigrateError::Source("source has no migrations".to_string())),
        }
    }

    /// A version exists when it has an up or a down script
    fn ensure_exists(&self, version: Version) -> Step {
        if self.call("source read up", self.source.read_up(version))?.is_some() {
            return Ok(());
        }
        if self.call("source read down", self.source.read_down(version))?.is_some() {
            return Ok(());
        }
        self.fail(MigrateError::VersionNotFound(version))
    }

    /// Build the migration from `version` to `target`, start buffering, send
    fn schedule(&self, version: Version, target: Version) -> Step {
        let script = if target >= version {
            self.call("source read up", self.source.read_up(version))?
        } else {
            self.call("source read down", self.source.read_down(version))?
        };

        let migration = match script {
            Some((body, identifier)) => Migration::new(Some(body), identifier, version, target),
            None => Migration::empty(version, target),
        };
        self.emit(migration)
    }

    /// Step from the first version to `NIL_VERSION`
    ///
    /// Never runs a script: the step only clears the version marker, so a
    /// full rollback leaves the live document as the last down script left it.
    fn unmigrate(&self, first: Version) -> Step {
        self.emit(Migration::empty(first, NIL_VERSION))
    }

    fn emit(&self, mut migration: Migration) -> Step {
        migration.start_buffering();
        tracing::trace!(migration = %migration, "scheduled");
        self.tx.send(Ok(migration)).map_err(|_| Halt)
    }

    fn fail<T>(&self, error: MigrateError) -> Step<T> {
        let _ = self.tx.send(Err(error));
        Err(Halt)
    }

    fn call<T>(&self, call: &str, result: Result<T>) -> Step<T> {
        result.or_else(|e| self.fail(MigrateError::driver(call, e)))
    }

    fn check_stop(&self) -> Step {
        if self.stop.should_stop() {
            Err(Halt)
        } else {
            Ok(())
        }
    }
}
