use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Failed to parse {field} from {value:?}")]
    Parse { field: &'static str, value: String },

    #[error("Fetching {url} failed: {message}")]
    Fetch { url: String, message: String },

    #[error("Sink error: {message}")]
    Sink { message: String },
}

impl ScraperError {
    pub fn parse(field: &'static str, value: impl Into<String>) -> Self {
        ScraperError::Parse {
            field,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
