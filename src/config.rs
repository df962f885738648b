use crate::error::AppError;
use std::env;
use std::str::FromStr;

pub const DEFAULT_INDEX: &str = "plays";
pub const DEFAULT_HITS_PER_PAGE: usize = 1000;
pub const DEFAULT_MAX_PAGES: usize = 50;
pub const DEFAULT_CACHE_MINUTES: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub app_id: String,
    pub api_key: String,
    pub index_name: String,
    /// Large enough that a single query usually returns the whole filtered set.
    pub hits_per_page: usize,
    pub max_pages: usize,
    pub cache_minutes: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let app_id = env::var("PLAY_STATS_APP_ID").map_err(|_| {
            AppError::ConfigError("PLAY_STATS_APP_ID not found in environment or .env file".to_string())
        })?;

        let api_key = env::var("PLAY_STATS_API_KEY").map_err(|_| {
            AppError::ConfigError("PLAY_STATS_API_KEY not found in environment or .env file".to_string())
        })?;

        let index_name =
            env::var("PLAY_STATS_INDEX").unwrap_or_else(|_| DEFAULT_INDEX.to_string());

        Ok(Config {
            app_id,
            api_key,
            index_name,
            hits_per_page: parse_var("PLAY_STATS_HITS_PER_PAGE", DEFAULT_HITS_PER_PAGE)?,
            max_pages: parse_var("PLAY_STATS_MAX_PAGES", DEFAULT_MAX_PAGES)?,
            cache_minutes: parse_var("PLAY_STATS_CACHE_MINUTES", DEFAULT_CACHE_MINUTES)?,
        })
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::ConfigError(format!("{} must be a number, got '{}'", key, raw)))
}
