use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parsing failed: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Digital Library API error ({status}): {message}")]
    Undl { status: u16, message: String },

    #[error("Graph query failed: {message}")]
    Graph { message: String },

    #[error("Could not connect to the GraphDB at {uri} as {user}: {message}")]
    GraphUnavailable {
        uri: String,
        user: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Upstream error bodies are cut to this many characters
pub const MAX_ERROR_BODY: usize = 512;

/// Trim an upstream response body for inclusion in an error message
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
