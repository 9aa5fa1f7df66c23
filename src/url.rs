//! Driver URLs
//!
//! Every driver is addressed as `scheme://path`. The scheme picks the driver
//! in the registry; the path is resolved against the working directory.

use std::env;
use std::path::PathBuf;

use crate::error::{MigrateError, Result};

/// Split `scheme://rest` into its two halves
pub fn split_scheme(url: &str) -> Result<(&str, &str)> {
    let (scheme, rest) = url.split_once("://").ok_or_else(|| MigrateError::InvalidUrl {
        url: url.to_string(),
        reason: "missing scheme".to_string(),
    })?;

    if scheme.is_empty() {
        return Err(MigrateError::InvalidUrl {
            url: url.to_string(),
            reason: "empty scheme".to_string(),
        });
    }

    Ok((scheme, rest))
}

/// Resolve the path part of a driver URL to an absolute path
///
/// "." means the working directory; relative paths are joined onto it.
/// A URL without a scheme is treated as a bare path.
pub fn resolve_path(url: &str) -> Result<PathBuf> {
    let raw = match split_scheme(url) {
        Ok((_, rest)) => rest,
        Err(_) => url,
    };

    if raw.is_empty() {
        return Err(MigrateError::InvalidUrl {
            url: url.to_string(),
            reason: "empty path".to_string(),
        });
    }

    let cwd = env::current_dir()?;
    let path = if raw == "." {
        cwd
    } else {
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            path
        } else {
            cwd.join(path)
        }
    };

    Ok(path)
}
