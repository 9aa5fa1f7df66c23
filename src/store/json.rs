//! JSON store
//!
//! `json://path/to/config.json`. Pretty-printed with 4-space indentation,
//! `version` always the first field, quarantined keys prefixed with `_`.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::document::{ConfigValue, Map};
use crate::error::{MigrateError, Result};
use crate::migration::Version;

use super::{DocumentFormat, DocumentStore};

/// JSON document store
pub type JsonStore = DocumentStore<JsonFormat>;

/// JSON text format
pub struct JsonFormat;

#[derive(Serialize)]
struct Versioned<'a> {
    version: Version,
    #[serde(flatten)]
    document: &'a Map,
}

impl DocumentFormat for JsonFormat {
    const NAME: &'static str = "json";
    const MARKER: char = '_';
    const DEFAULT_FILE: &'static str = "config.json";

    fn parse(text: &str) -> Result<ConfigValue> {
        Ok(serde_json::from_str(text)?)
    }

    fn render(version: Option<Version>, document: &Map) -> Result<String> {
        if version.is_none() && document.is_empty() {
            return Ok(String::new());
        }

        let mut out = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
        match version {
            Some(version) => Versioned { version, document }.serialize(&mut serializer)?,
            None => document.serialize(&mut serializer)?,
        }

        let mut text = String::from_utf8(out)
            .map_err(|e| MigrateError::Serialization(format!("json output is not UTF-8: {}", e)))?;
        text.push('\n');
        Ok(text)
    }
}
