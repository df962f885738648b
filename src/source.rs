use crate::api::models::{top_facets, FacetCount, PlayRecord};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maximum number of date facet values shown, as in the time-period menu.
pub const DATE_FACET_LIMIT: usize = 10;

/// Free-text query plus an optional date facet selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayQuery {
    pub text: String,
    pub date: Option<String>,
}

impl PlayQuery {
    pub fn new(text: &str, date: Option<&str>) -> Self {
        PlayQuery {
            text: text.trim().to_string(),
            date: date.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        }
    }

    /// Stable file-name friendly key for the result cache.
    pub fn cache_key(&self) -> String {
        let raw = format!(
            "{}__{}",
            if self.text.is_empty() { "all" } else { &self.text },
            self.date.as_deref().unwrap_or("any")
        );
        raw.chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c.to_ascii_lowercase() } else { '_' })
            .collect()
    }

    /// Applies the query to a record locally.
    pub fn matches(&self, record: &PlayRecord) -> bool {
        if let Some(date) = &self.date {
            if record.date.as_deref() != Some(date.as_str()) {
                return false;
            }
        }
        self.matches_text(record)
    }

    fn matches_text(&self, record: &PlayRecord) -> bool {
        if self.text.is_empty() {
            return true;
        }
        let needle = self.text.to_lowercase();
        [&record.hero, &record.villain, &record.team_composition]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// The complete set of plays matching one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSet {
    pub query: PlayQuery,
    pub records: Vec<PlayRecord>,
    /// Hits the source reported, which can exceed `records` when paging was capped.
    pub total_hits: usize,
    /// False when the source stopped before delivering every matching play.
    #[serde(default = "complete_by_default")]
    pub complete: bool,
}

fn complete_by_default() -> bool {
    true
}

impl ResultSet {
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Something that can answer play queries.
pub trait QuerySource {
    fn fetch_all(&self, query: &PlayQuery) -> Result<ResultSet, AppError>;

    /// Date facet values for plays matching the text part of `query`.
    fn date_facets(&self, query: &PlayQuery) -> Result<Vec<FacetCount>, AppError>;
}

/// Plays exported to a JSON file: either an array of hits or `{ "hits": [...] }`.
pub struct FileSource {
    path: PathBuf,
    records: Vec<PlayRecord>,
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            AppError::JsonError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        let hits = match value {
            Value::Array(hits) => hits,
            Value::Object(mut map) => match map.remove("hits") {
                Some(Value::Array(hits)) => hits,
                _ => {
                    return Err(AppError::JsonError(format!(
                        "{} has no 'hits' array",
                        path.display()
                    )))
                }
            },
            _ => {
                return Err(AppError::JsonError(format!(
                    "{} must contain an array of plays",
                    path.display()
                )))
            }
        };

        let records = PlayRecord::from_values(hits);
        info!(path = %path.display(), records = records.len(), "loaded plays from file");

        Ok(FileSource {
            path: path.to_path_buf(),
            records,
        })
    }
}

impl QuerySource for FileSource {
    fn fetch_all(&self, query: &PlayQuery) -> Result<ResultSet, AppError> {
        let records: Vec<PlayRecord> = self
            .records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();

        debug!(path = %self.path.display(), ?query, matched = records.len(), "filtered plays");

        Ok(ResultSet {
            query: query.clone(),
            total_hits: records.len(),
            records,
            complete: true,
        })
    }

    fn date_facets(&self, query: &PlayQuery) -> Result<Vec<FacetCount>, AppError> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in self.records.iter().filter(|r| query.matches_text(r)) {
            if let Some(date) = &record.date {
                *counts.entry(date.clone()).or_insert(0) += 1;
            }
        }
        Ok(top_facets(counts, DATE_FACET_LIMIT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_plays(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("plays.json");
        fs::write(&path, body).unwrap();
        path
    }

    const PLAYS: &str = r#"[
        { "hero": "Spider-Man", "villain": "Rhino", "win": true, "date": "2024-01-01" },
        { "hero": "Iron Man", "villain": "Klaw", "win": false, "date": "2024-01-01" },
        { "hero": "Spider-Man", "villain": "Ultron", "win": false, "date": "2024-01-02",
          "teamComposition": "Spider-Man, Black Widow" },
        "garbage"
    ]"#;

    #[test]
    fn empty_query_returns_everything() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::open(&write_plays(dir.path(), PLAYS)).unwrap();

        let result = source.fetch_all(&PlayQuery::default()).unwrap();
        assert_eq!(result.records.len(), 3);
        assert!(result.is_complete());
    }

    #[test]
    fn text_query_matches_any_side_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::open(&write_plays(dir.path(), PLAYS)).unwrap();

        let result = source.fetch_all(&PlayQuery::new("spider", None)).unwrap();
        assert_eq!(result.records.len(), 2);

        let result = source.fetch_all(&PlayQuery::new("widow", None)).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].villain.as_deref(), Some("Ultron"));
    }

    #[test]
    fn date_filter_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::open(&write_plays(dir.path(), PLAYS)).unwrap();

        let result = source
            .fetch_all(&PlayQuery::new("spider", Some("2024-01-01")))
            .unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].villain.as_deref(), Some("Rhino"));
    }

    #[test]
    fn date_facets_ignore_date_selection() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::open(&write_plays(dir.path(), PLAYS)).unwrap();

        let facets = source
            .date_facets(&PlayQuery::new("", Some("2024-01-02")))
            .unwrap();
        assert_eq!(
            facets,
            vec![
                FacetCount { value: "2024-01-01".to_string(), count: 2 },
                FacetCount { value: "2024-01-02".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn accepts_hits_wrapper_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plays(dir.path(), r#"{ "hits": [{ "hero": "A", "villain": "X" }] }"#);
        let source = FileSource::open(&path).unwrap();
        assert_eq!(source.fetch_all(&PlayQuery::default()).unwrap().records.len(), 1);
    }

    #[test]
    fn rejects_non_list_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_plays(dir.path(), r#"{ "plays": 3 }"#);
        assert!(matches!(FileSource::open(&path), Err(AppError::JsonError(_))));

        let path = write_plays(dir.path(), "not json");
        assert!(matches!(FileSource::open(&path), Err(AppError::JsonError(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileSource::open(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(AppError::IoError(_))));
    }

    #[test]
    fn result_sets_without_flag_read_as_complete() {
        let result: ResultSet =
            serde_json::from_str(r#"{ "query": { "text": "", "date": null }, "records": [], "total_hits": 0 }"#)
                .unwrap();
        assert!(result.is_complete());
    }

    #[test]
    fn cache_keys_are_file_safe() {
        assert_eq!(PlayQuery::default().cache_key(), "all__any");
        assert_eq!(
            PlayQuery::new(" Spider Man ", Some("2024/01")).cache_key(),
            "spider_man__2024_01"
        );
    }
}
