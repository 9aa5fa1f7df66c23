//! Directory source
//!
//! Reads scripts named `{version}_{title}.{up|down}.{ext}` from a directory.
//! Files that don't follow the pattern are ignored.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::{MigrateError, Result};
use crate::migration::{MigrationBody, Version};
use crate::url;

use super::{MigrationSource, ScriptIndex};

/// Migration source backed by a directory of script files
#[derive(Debug)]
pub struct FileSource {
    dir: PathBuf,
    index: ScriptIndex<PathBuf>,
}

#[derive(Debug, PartialEq)]
struct ScriptName<'a> {
    version: Version,
    title: &'a str,
    up: bool,
}

impl FileSource {
    /// Open a `file://` URL
    pub fn open(url: &str) -> Result<Self> {
        let dir = url::resolve_path(url)?;
        Self::open_dir(&dir)
    }

    /// Scan a directory for migration scripts
    pub fn open_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(MigrateError::Source(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut index: ScriptIndex<PathBuf> = ScriptIndex::default();
        let mut found = 0usize;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(parsed) = parse_script_name(name) else {
                tracing::trace!(file = %name, "skipping non-migration file");
                continue;
            };

            let scripts = index.entry(parsed.version);
            let slot = if parsed.up { &mut scripts.up } else { &mut scripts.down };
            if let Some((_, existing)) = slot.as_ref() {
                return Err(MigrateError::Source(format!(
                    "duplicate migration file: {} and {}",
                    existing.display(),
                    path.display()
                )));
            }
            *slot = Some((parsed.title.to_string(), path));
            found += 1;
        }

        tracing::debug!(dir = %dir.display(), scripts = found, "opened migration directory");

        Ok(Self {
            dir: dir.to_path_buf(),
            index,
        })
    }

    /// Directory the scripts were read from
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn open_script(script: &Option<(String, PathBuf)>) -> Result<Option<(MigrationBody, String)>> {
        match script {
            Some((identifier, path)) => {
                let body: MigrationBody = Box::new(File::open(path)?);
                Ok(Some((body, identifier.clone())))
            }
            None => Ok(None),
        }
    }
}

impl MigrationSource for FileSource {
    fn first(&self) -> Result<Option<Version>> {
        Ok(self.index.first())
    }

    fn prev(&self, version: Version) -> Result<Option<Version>> {
        Ok(self.index.prev(version))
    }

    fn next(&self, version: Version) -> Result<Option<Version>> {
        Ok(self.index.next(version))
    }

    fn read_up(&self, version: Version) -> Result<Option<(MigrationBody, String)>> {
        match self.index.get(version) {
            Some(scripts) => Self::open_script(&scripts.up),
            None => Ok(None),
        }
    }

    fn read_down(&self, version: Version) -> Result<Option<(MigrationBody, String)>> {
        match self.index.get(version) {
            Some(scripts) => Self::open_script(&scripts.down),
            None => Ok(None),
        }
    }
}

/// "0002_add_cache.up.yaml" → version 2, title "add_cache", up
fn parse_script_name(name: &str) -> Option<ScriptName<'_>> {
    let (digits, rest) = name.split_once('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let version = Version::try_from(digits.parse::<u64>().ok()?).ok()?;

    // The last direction marker wins, so titles may contain dots
    let up = rest.rfind(".up.").map(|i| (i, true));
    let down = rest.rfind(".down.").map(|i| (i, false));
    let (at, up) = match (up, down) {
        (Some(u), Some(d)) => u.max(d),
        (Some(found), None) | (None, Some(found)) => found,
        (None, None) => return None,
    };

    Some(ScriptName {
        version,
        title: &rest[..at],
        up,
    })
}
