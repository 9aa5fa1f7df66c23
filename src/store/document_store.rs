//! File-backed document store
//!
//! One local file, one whole-file advisory lock. The text format (JSON or
//! YAML) is plugged in through `DocumentFormat`; everything else is shared.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use parking_lot::Mutex;

use crate::document::{reconcile, ConfigValue, Map, VERSION_KEY};
use crate::error::{MigrateError, Result};
use crate::migration::{Version, NIL_VERSION};
use crate::url;

use super::ConfigStore;

/// Pause between attempts of a cancellable lock
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Text format of a document store
pub trait DocumentFormat: Send + Sync + 'static {
    /// Driver name, also the URL scheme
    const NAME: &'static str;

    /// Prefix for quarantined keys
    const MARKER: char;

    /// File name used when the URL points at a directory
    const DEFAULT_FILE: &'static str;

    /// Parse a document or a migration body
    fn parse(text: &str) -> Result<ConfigValue>;

    /// Serialize a document, with the version header first when given
    fn render(version: Option<Version>, document: &Map) -> Result<String>;
}

/// Configuration store persisted as a single local file
///
/// ## Concurrency:
/// - `file`: handle behind a Mutex, cloned out as `Arc<File>` per call so a
///   blocked `lock()` never holds the mutex
/// - `locked`: whether this instance holds (or is acquiring) the file lock
pub struct DocumentStore<F: DocumentFormat> {
    path: PathBuf,
    file: Mutex<Option<Arc<File>>>,
    locked: AtomicBool,
    _format: PhantomData<fn() -> F>,
}

impl<F: DocumentFormat> DocumentStore<F> {
    /// Open a `scheme://path` URL, creating the file if needed
    pub fn open(url: &str) -> Result<Self> {
        let mut path = url::resolve_path(url)?;
        if path.is_dir() {
            path = path.join(F::DEFAULT_FILE);
        }
        Self::open_path(&path)
    }

    /// Open a document file directly
    pub fn open_path(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        tracing::debug!(store = F::NAME, path = %path.display(), "opened config store");

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(Some(Arc::new(file))),
            locked: AtomicBool::new(false),
            _format: PhantomData,
        })
    }

    /// Path of the document file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the whole document
    ///
    /// Returns the document without its `version` key.
    pub fn read(&self) -> Result<(Version, Map)> {
        let file = self.handle()?;
        Self::read_document(&file)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn handle(&self) -> Result<Arc<File>> {
        self.file.lock().as_ref().map(Arc::clone).ok_or(MigrateError::Closed)
    }

    fn read_document(file: &File) -> Result<(Version, Map)> {
        let mut reader = file;
        reader.seek(SeekFrom::Start(0))?;
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        if text.trim().is_empty() {
            return Ok((NIL_VERSION, Map::new()));
        }

        let mut document = F::parse(&text)?.into_object().ok_or_else(|| {
            MigrateError::Storage(format!("{} document root must be a mapping", F::NAME))
        })?;

        let version = match document.remove(VERSION_KEY) {
            None => NIL_VERSION,
            Some(value) => value.as_i64().filter(|v| *v >= 0).ok_or_else(|| {
                MigrateError::Storage(format!("invalid version marker: {:?}", value))
            })?,
        };

        Ok((version, document))
    }

    /// Truncate, rewind, write
    fn write_document(file: &File, text: &str) -> Result<()> {
        let mut writer = file;
        writer.set_len(0)?;
        writer.seek(SeekFrom::Start(0))?;
        writer.write_all(text.as_bytes())?;
        writer.sync_data()?;
        Ok(())
    }

    fn parse_patch(body: &[u8]) -> Result<Map> {
        let text = std::str::from_utf8(body)
            .map_err(|e| MigrateError::Serialization(format!("migration is not UTF-8: {}", e)))?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        F::parse(text)?.into_object().ok_or_else(|| {
            MigrateError::Serialization("migration body must be a mapping".to_string())
        })
    }

    /// Mark this instance as locking, then take the file lock with `take`
    ///
    /// The mark is cleared again when `take` fails.
    fn acquire<L>(&self, take: L) -> Result<()>
    where
        L: FnOnce(&File) -> Result<()>,
    {
        if self.locked.swap(true, Ordering::SeqCst) {
            return Err(MigrateError::Locked);
        }

        let acquired = self.handle().and_then(|file| take(file.as_ref()));
        if acquired.is_err() {
            self.locked.store(false, Ordering::SeqCst);
        }
        acquired
    }

    fn header(version: Version) -> Option<Version> {
        (version != NIL_VERSION).then_some(version)
    }
}

impl<F: DocumentFormat> ConfigStore for DocumentStore<F> {
    fn lock(&self) -> Result<()> {
        self.acquire(|file| FileExt::lock_exclusive(file).map_err(MigrateError::from))
    }

    /// Polls a non-blocking lock so a raised `cancel` is noticed
    fn lock_cancellable(&self, cancel: &AtomicBool) -> Result<()> {
        let contended = fs2::lock_contended_error().raw_os_error();
        self.acquire(|file| loop {
            match FileExt::try_lock_exclusive(file) {
                Ok(()) => return Ok(()),
                Err(e) if e.raw_os_error() == contended => {}
                Err(e) => return Err(e.into()),
            }
            if cancel.load(Ordering::SeqCst) {
                return Err(MigrateError::LockTimeout);
            }
            thread::sleep(LOCK_POLL_INTERVAL);
        })
    }

    fn supports_cancel(&self) -> bool {
        true
    }

    fn unlock(&self) -> Result<()> {
        if !self.locked.load(Ordering::SeqCst) {
            return Ok(());
        }

        // A closed handle already released its lock
        if let Some(file) = self.file.lock().as_ref() {
            FileExt::unlock(&**file)?;
        }
        self.locked.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn run(&self, migration: &[u8], version: Version) -> Result<()> {
        let schema = Self::parse_patch(migration)?;
        let file = self.handle()?;
        let (previous, current) = Self::read_document(&file)?;

        let document = reconcile(&schema, &current, F::MARKER);
        let text = F::render(Self::header(version), &document)?;
        Self::write_document(&file, &text)?;

        tracing::debug!(
            store = F::NAME,
            from = previous,
            to = version,
            keys = document.len(),
            "applied migration body"
        );
        Ok(())
    }

    fn set_version(&self, version: Version) -> Result<()> {
        let file = self.handle()?;
        let (_, document) = Self::read_document(&file)?;
        let text = F::render(Self::header(version), &document)?;
        Self::write_document(&file, &text)
    }

    fn version(&self) -> Result<Version> {
        self.read().map(|(version, _)| version)
    }

    fn drop_all(&self) -> Result<()> {
        // Dropping the handle also drops any lock held through it
        let handle = self.file.lock().take();
        drop(handle);
        self.locked.store(false, Ordering::SeqCst);

        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        tracing::info!(store = F::NAME, path = %self.path.display(), "dropped config store");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.file.lock().take();
        Ok(())
    }
}
