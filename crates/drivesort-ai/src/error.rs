use std::time::Duration;

use thiserror::Error;

/// Failure talking to, or understanding, a language model.
///
/// Never escapes a classifier stage: stages log it and degrade to a failure
/// result.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("no JSON object found in model response")]
    NoJsonObject,

    #[error("model response is missing '{0}'")]
    MissingField(&'static str),

    #[error("unusable confidence value: {0}")]
    InvalidConfidence(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("cascade needs at least one stage")]
    EmptyCascade,

    #[error("cannot build model client: {0}")]
    Client(#[from] InferenceError),
}
