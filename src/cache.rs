use crate::error::AppError;
use crate::source::{PlayQuery, ResultSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Last result set fetched for one query, kept on disk between runs.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResultCache {
    pub app_id: String,
    pub index: String,
    pub fetched_at: DateTime<Utc>,
    pub result: ResultSet,
}

impl ResultCache {
    pub fn new(app_id: &str, index: &str, result: ResultSet) -> Self {
        ResultCache {
            app_id: app_id.to_string(),
            index: index.to_string(),
            fetched_at: Utc::now(),
            result,
        }
    }

    pub fn cache_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".play_stats")
    }

    /// One file per application, index and query.
    pub fn get_cache_path(dir: &Path, app_id: &str, index: &str, query: &PlayQuery) -> PathBuf {
        dir.join(format!(
            "{}__{}__{}.json",
            file_safe(app_id),
            file_safe(index),
            query.cache_key()
        ))
    }

    /// Cached result for `query`, or `None` if nothing usable is on disk.
    pub fn load(
        dir: &Path,
        app_id: &str,
        index: &str,
        query: &PlayQuery,
    ) -> Result<Option<Self>, AppError> {
        let path = Self::get_cache_path(dir, app_id, index, query);

        match fs::read_to_string(&path) {
            Ok(content) => {
                let cache: ResultCache = serde_json::from_str(&content).map_err(|e| {
                    AppError::JsonError(format!("Failed to parse cache: {}", e))
                })?;
                if cache.result.query != *query || cache.app_id != app_id || cache.index != index {
                    debug!(path = %path.display(), "cache file belongs to another query");
                    return Ok(None);
                }
                Ok(Some(cache))
            }
            // Cache doesn't exist yet
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, dir: &Path) -> Result<(), AppError> {
        fs::create_dir_all(dir)?;
        let path = Self::get_cache_path(dir, &self.app_id, &self.index, &self.result.query);
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            AppError::JsonError(format!("Failed to serialize cache: {}", e))
        })?;

        fs::write(&path, json)?;
        debug!(path = %path.display(), records = self.result.records.len(), "saved result cache");

        Ok(())
    }

    pub fn is_stale(&self, max_age_mins: u64) -> bool {
        let age = Utc::now().signed_duration_since(self.fetched_at);
        age.num_minutes() >= max_age_mins as i64
    }
}

fn file_safe(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c.to_ascii_lowercase() } else { '_' })
        .collect()
}
