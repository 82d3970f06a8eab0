use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriveError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[cfg(feature = "http")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credentials file not found: {0} (authorize once and save the token there)")]
    MissingCredentials(PathBuf),

    #[error("cannot refresh access token: {0}")]
    TokenRefresh(String),

    #[error("response is missing '{0}'")]
    MissingField(&'static str),
}
