//! YAML store
//!
//! `yaml://path/to/config.yaml`. The first line is always `version: N`;
//! quarantined keys are prefixed with `#`.

use crate::document::{ConfigValue, Map};
use crate::error::Result;
use crate::migration::Version;

use super::{DocumentFormat, DocumentStore};

/// YAML document store
pub type YamlStore = DocumentStore<YamlFormat>;

/// YAML text format
pub struct YamlFormat;

impl DocumentFormat for YamlFormat {
    const NAME: &'static str = "yaml";
    const MARKER: char = '#';
    const DEFAULT_FILE: &'static str = "config.yaml";

    fn parse(text: &str) -> Result<ConfigValue> {
        Ok(serde_yaml::from_str(text)?)
    }

    fn render(version: Option<Version>, document: &Map) -> Result<String> {
        let body = if document.is_empty() {
            String::new()
        } else {
            normalize(serde_yaml::to_string(document)?)
        };

        Ok(match version {
            Some(version) => format!("version: {}\n{}", version, body),
            None => body,
        })
    }
}

/// Strip single quotes and bare `null` scalars from serialized YAML
///
/// A line is only rewritten when it still means the same thing afterwards;
/// quoting that protects a `#` key or a typed-looking string stays.
fn normalize(raw: String) -> String {
    let mut out = String::with_capacity(raw.len());
    for line in raw.lines() {
        let candidate = strip_null(line).replace('\'', "");
        if candidate != line && same_meaning(line, &candidate) {
            out.push_str(&candidate);
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    if same_meaning(&raw, &out) {
        out
    } else {
        tracing::debug!("keeping quoted yaml output");
        raw
    }
}

fn same_meaning(a: &str, b: &str) -> bool {
    let parse = |text: &str| serde_yaml::from_str::<ConfigValue>(text.trim_start()).ok();
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn strip_null(line: &str) -> String {
    let trimmed = line.trim_end();
    if let Some(key) = trimmed.strip_suffix(": null") {
        return format!("{}:", key);
    }

    let indent = trimmed.len() - trimmed.trim_start().len();
    match &trimmed[indent..] {
        "- null" => format!("{}-", &trimmed[..indent]),
        "null" => String::new(),
        _ => line.to_string(),
    }
}
