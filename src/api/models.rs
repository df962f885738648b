use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Values below this are treated as epoch seconds, above as epoch milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// One hero vs. villain play, as stored in the search index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayRecord {
    #[serde(default, deserialize_with = "lenient_name")]
    pub hero: Option<String>,
    #[serde(default, deserialize_with = "lenient_name")]
    pub villain: Option<String>,
    /// Whether the hero side won.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub win: bool,
    /// Raw date as indexed; doubles as the date facet value.
    #[serde(default, deserialize_with = "lenient_name")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_name")]
    pub team_composition: Option<String>,
}

impl PlayRecord {
    pub fn new(hero: &str, villain: &str, win: bool) -> Self {
        PlayRecord {
            hero: Some(hero.to_string()),
            villain: Some(villain.to_string()),
            win,
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    /// Epoch milliseconds of the play, if the date parses.
    pub fn timestamp(&self) -> Option<i64> {
        self.date.as_deref().and_then(parse_timestamp)
    }

    /// Converts raw search hits, dropping anything that isn't an object.
    pub fn from_values(values: Vec<Value>) -> Vec<PlayRecord> {
        let total = values.len();
        let records: Vec<PlayRecord> = values
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "skipping malformed play record");
                    None
                }
            })
            .collect();

        if records.len() < total {
            warn!(
                dropped = total - records.len(),
                kept = records.len(),
                "some play records could not be read"
            );
        }

        records
    }
}

pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();

    if let Ok(epoch) = raw.parse::<i64>() {
        if epoch <= 0 {
            return None;
        }
        return Some(if epoch < EPOCH_MILLIS_THRESHOLD {
            epoch * 1000
        } else {
            epoch
        });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn lenient_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "win" | "victory"
        ),
        _ => false,
    })
}

// Query API response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<Value>,
    #[serde(default)]
    pub nb_hits: usize,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub nb_pages: usize,
    #[serde(default)]
    pub facets: HashMap<String, HashMap<String, usize>>,
}

// Browse API response; `cursor` is absent on the last page
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseResponse {
    #[serde(default)]
    pub hits: Vec<Value>,
    #[serde(default)]
    pub nb_hits: usize,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Most frequent facet values first, ties broken alphabetically.
pub fn top_facets(counts: HashMap<String, usize>, limit: usize) -> Vec<FacetCount> {
    let mut facets: Vec<FacetCount> = counts
        .into_iter()
        .map(|(value, count)| FacetCount { value, count })
        .collect();

    facets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    facets.truncate(limit);
    facets
}
