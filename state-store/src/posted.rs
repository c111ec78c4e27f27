use crate::write_atomic;
use chrono::{SecondsFormat, Utc};
use radar_core::StateError;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct PostedFile<'a> {
    posted_ids: Vec<&'a str>,
    last_updated: String,
}

/// Accept either a bare array of ids or an object with a `posted_ids` array.
/// Non-string entries are skipped; any other shape is rejected.
pub fn parse_posted_ids(raw: &str) -> Option<HashSet<String>> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("posted_ids") {
            Some(Value::Array(entries)) => entries,
            _ => return None,
        },
        _ => return None,
    };

    Some(
        entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::String(id) => Some(id),
                _ => None,
            })
            .collect(),
    )
}

/// Durable set of ids that have already been delivered.
#[derive(Debug)]
pub struct PostedStore {
    path: PathBuf,
    ids: HashSet<String>,
}

impl PostedStore {
    /// Load the store at `path`. A missing, unreadable or malformed file
    /// yields an empty set.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match fs::read_to_string(&path) {
            Ok(raw) => parse_posted_ids(&raw).unwrap_or_else(|| {
                warn!(
                    "Posted-id store {} is malformed, starting from an empty set",
                    path.display()
                );
                HashSet::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No posted-id store at {}, starting fresh", path.display());
                HashSet::new()
            }
            Err(e) => {
                warn!(
                    "Could not read posted-id store {}: {}, starting from an empty set",
                    path.display(),
                    e
                );
                HashSet::new()
            }
        };

        debug!(count = ids.len(), "Loaded posted ids");
        Self { path, ids }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Add `id` and persist immediately. Returns `false` without touching the
    /// file when the id was already recorded.
    pub fn record(&mut self, id: &str) -> Result<bool, StateError> {
        if self.ids.contains(id) {
            return Ok(false);
        }

        self.ids.insert(id.to_string());
        if let Err(e) = self.save() {
            self.ids.remove(id);
            return Err(e);
        }

        info!(id = %id, "Recorded posted id");
        Ok(true)
    }

    pub fn save(&self) -> Result<(), StateError> {
        let file = PostedFile {
            posted_ids: self.ids(),
            last_updated: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        };
        let body = serde_json::to_vec_pretty(&file).map_err(|source| StateError::EncodeFailed {
            path: self.path.display().to_string(),
            source,
        })?;

        write_atomic(&self.path, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let ids = parse_posted_ids(r#"["1", "2", 3, null, "2"]"#).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("1") && ids.contains("2"));
    }

    #[test]
    fn test_parse_object_form() {
        let ids = parse_posted_ids(
            r#"{"posted_ids": ["a", {"nested": true}], "last_updated": "2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["a".to_string()]);
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        assert!(parse_posted_ids("not json").is_none());
        assert!(parse_posted_ids(r#""just a string""#).is_none());
        assert!(parse_posted_ids(r#"{"ids": ["a"]}"#).is_none());
        assert!(parse_posted_ids(r#"{"posted_ids": "a"}"#).is_none());
        assert!(parse_posted_ids("42").is_none());
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_posted_ids("[]").unwrap().is_empty());
    }
}
