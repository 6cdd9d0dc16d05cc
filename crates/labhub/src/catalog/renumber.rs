//! Re-sort and re-number existing catalog files in place
//!
//! Works on untyped JSON so that files written by older indexers (with a
//! different record layout) can still be renumbered: the only field that
//! matters is `name`. Key order inside each record is preserved, with `id`
//! moved to the front.

use super::error::{CatalogError, Result};
use super::types::Family;
use super::writer::{to_json_bytes, write_atomic};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of renumbering one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenumberOutcome {
    /// Lists renumbered and total record count
    Renumbered { lists: usize, records: usize },
    Missing,
    Empty,
}

/// Renumber one catalog file.
///
/// A JSON array is one family list; a JSON object is a merged catalog whose
/// values are family lists.
pub fn renumber_file(path: &Path) -> Result<RenumberOutcome> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(RenumberOutcome::Missing),
        Err(e) => return Err(CatalogError::io(path, e)),
    };
    if content.iter().all(u8::is_ascii_whitespace) {
        return Ok(RenumberOutcome::Empty);
    }

    let mut value: Value = serde_json::from_slice(&content).map_err(|e| invalid(path, e.to_string()))?;
    let (lists, records) = match &mut value {
        Value::Array(list) => (1, renumber_list(path, list)?),
        Value::Object(map) => {
            let mut records = 0;
            for (key, list) in map.iter_mut() {
                if Family::from_merged_key(key).is_none() {
                    warn!(path = %path.display(), key = %key, "Unknown family key in merged catalog");
                }
                let Value::Array(list) = list else {
                    return Err(invalid(path, "merged catalog values must be arrays".to_string()));
                };
                records += renumber_list(path, list)?;
            }
            (map.len(), records)
        }
        _ => return Err(invalid(path, "expected a JSON array or object".to_string())),
    };

    write_atomic(path, &to_json_bytes(&value)?)?;
    info!(path = %path.display(), lists, records, "Renumbered catalog");
    Ok(RenumberOutcome::Renumbered { lists, records })
}

/// Stable sort by `name`, then assign ids 1..N.
pub fn renumber_list(path: &Path, list: &mut Vec<Value>) -> Result<usize> {
    let mut entries = Vec::with_capacity(list.len());
    for item in list.drain(..) {
        let Value::Object(map) = item else {
            return Err(invalid(path, "catalog entries must be objects".to_string()));
        };
        let Some(name) = map.get("name").and_then(Value::as_str).map(str::to_string) else {
            return Err(invalid(path, "catalog entry without a string 'name'".to_string()));
        };
        entries.push((name, map));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));

    for (idx, (_, map)) in entries.into_iter().enumerate() {
        let mut numbered = Map::with_capacity(map.len() + 1);
        numbered.insert("id".to_string(), Value::from(idx as u64 + 1));
        numbered.extend(map.into_iter().filter(|(key, _)| key != "id"));
        list.push(Value::Object(numbered));
    }
    Ok(list.len())
}

fn invalid(path: &Path, message: String) -> CatalogError {
    CatalogError::InvalidCatalog {
        path: path.to_path_buf(),
        message,
    }
}
