use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandrailError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Reasoning service error: {0}")]
    Reasoning(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

pub type HandrailResult<T> = Result<T, HandrailError>;
