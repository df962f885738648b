use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Search index error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded, please try again later")]
    RateLimited,

    #[error("No plays matched the current search")]
    NoResults,

    #[error("No plays recorded for {side} '{name}'")]
    UnknownSubject { side: String, name: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
