use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

const CURRENT_PARAM: &str = "q";
const NEGATIVE_PARAM: &str = "n";

/// The two ordered id lists that survive a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSelection {
    #[serde(default, rename = "current_selection_ids")]
    pub current: Vec<String>,
    #[serde(default, rename = "negative_selection_ids")]
    pub negative: Vec<String>,
}

impl PersistedSelection {
    pub fn is_empty(&self) -> bool {
        self.current.is_empty() && self.negative.is_empty()
    }
}

pub trait SelectionStore: Send {
    /// Returns `None` when nothing has been stored yet.
    fn load(&self) -> Result<Option<PersistedSelection>>;
    fn save(&mut self, selection: &PersistedSelection) -> Result<()>;
}

/// Keeps the selection as a single JSON document on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SelectionStore for JsonFileStore {
    fn load(&self) -> Result<Option<PersistedSelection>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let selection = serde_json::from_str(&raw)
            .with_context(|| format!("invalid selection JSON in {}", self.path.display()))?;
        Ok(Some(selection))
    }

    fn save(&mut self, selection: &PersistedSelection) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(selection).context("failed to encode selection")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

/// Encodes the selection as repeated `q=` and `n=` parameters.
pub fn to_query(selection: &PersistedSelection) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for id in &selection.current {
        query.append_pair(CURRENT_PARAM, id);
    }
    for id in &selection.negative {
        query.append_pair(NEGATIVE_PARAM, id);
    }
    query.finish()
}

/// Parses a query string produced by [`to_query`]. Unrelated parameters are
/// skipped; a leading `?` is accepted.
pub fn from_query(query: &str) -> PersistedSelection {
    let mut selection = PersistedSelection::default();
    let query = query.strip_prefix('?').unwrap_or(query);

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            CURRENT_PARAM => selection.current.push(value.into_owned()),
            NEGATIVE_PARAM => selection.negative.push(value.into_owned()),
            _ => {}
        }
    }

    selection
}

/// Picks the startup selection: a query that names any id wins over the
/// store.
pub fn initial_selection(
    query: Option<&str>,
    store: Option<&dyn SelectionStore>,
) -> Result<PersistedSelection> {
    if let Some(query) = query {
        let parsed = from_query(query);
        if !parsed.is_empty() {
            return Ok(parsed);
        }
    }

    match store {
        Some(store) => Ok(store.load()?.unwrap_or_default()),
        None => Ok(PersistedSelection::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PersistedSelection {
        PersistedSelection {
            current: vec!["x".to_owned(), "y".to_owned()],
            negative: vec!["z".to_owned()],
        }
    }

    #[test]
    fn serde_uses_stored_key_names() {
        let raw = serde_json::to_value(sample()).unwrap();
        assert_eq!(raw["current_selection_ids"], serde_json::json!(["x", "y"]));
        assert_eq!(raw["negative_selection_ids"], serde_json::json!(["z"]));

        let missing: PersistedSelection =
            serde_json::from_str(r#"{"current_selection_ids":["a"]}"#).unwrap();
        assert_eq!(missing.current, vec!["a"]);
        assert!(missing.negative.is_empty());
    }

    #[test]
    fn query_round_trip_keeps_order_and_reserved_bytes() {
        let selection = PersistedSelection {
            current: vec!["b 2".to_owned(), "a&c=d".to_owned()],
            negative: vec!["100%/ü".to_owned()],
        };
        let query = to_query(&selection);
        assert_eq!(query, "q=b+2&q=a%26c%3Dd&n=100%25%2F%C3%BC");
        assert_eq!(from_query(&query), selection);
        assert_eq!(from_query(&format!("?{query}")), selection);
    }

    #[test]
    fn from_query_skips_unrelated_and_empty_parameters() {
        let parsed = from_query("page=2&q=&q=a&n=b+c&flag&n=%zz");
        assert_eq!(parsed.current, vec!["a"]);
        assert_eq!(parsed.negative, vec!["b c", "%zz"]);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("nested").join("selection.json"));
        assert_eq!(store.load().unwrap(), None);

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), Some(sample()));
    }

    #[test]
    fn file_store_reports_corrupt_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection.json");
        fs::write(&path, "{not json").unwrap();
        let error = JsonFileStore::new(&path).load().unwrap_err();
        assert!(error.to_string().contains("invalid selection JSON"));
    }

    #[test]
    fn query_takes_precedence_over_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonFileStore::new(dir.path().join("selection.json"));
        store.save(&sample()).unwrap();

        let from_query = initial_selection(Some("n=w"), Some(&store)).unwrap();
        assert!(from_query.current.is_empty());
        assert_eq!(from_query.negative, vec!["w"]);

        let from_store = initial_selection(Some("page=1"), Some(&store)).unwrap();
        assert_eq!(from_store, sample());

        assert!(initial_selection(None, None).unwrap().is_empty());
    }
}
