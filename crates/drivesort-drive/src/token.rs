//! OAuth "authorized user" credentials: a saved refresh token plus the
//! short-lived access token derived from it.
//!
//! The file format is the one Google's client libraries write after an
//! interactive consent flow. Unknown fields are carried through untouched so
//! the file stays readable by those libraries after a refresh.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::DriveError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the recorded expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// Current access token, if one has been issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Option<i64>,
}

impl AuthorizedUser {
    /// Load credentials. A missing file is reported as
    /// [`DriveError::MissingCredentials`].
    pub fn load(path: &Path) -> Result<Self, DriveError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DriveError::MissingCredentials(path.to_path_buf())
            } else {
                DriveError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), DriveError> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|e| DriveError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Access token usable at `now`, if any.
    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<&str> {
        let token = self.token.as_deref()?;
        match self.expiry {
            Some(expiry) if expiry - TimeDelta::seconds(EXPIRY_MARGIN_SECS) <= now => None,
            _ => Some(token),
        }
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh(&mut self, client: &reqwest::Client) -> Result<(), DriveError> {
        info!(token_uri = %self.token_uri, "refreshing Drive access token");
        let resp = client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefresh(format!("{status}: {body}")));
        }

        let body: RefreshResponse = resp.json().await?;
        self.expiry = body
            .expires_in
            .map(|secs| Utc::now() + TimeDelta::seconds(secs));
        self.token = Some(body.access_token);
        debug!(expiry = ?self.expiry, "access token refreshed");
        Ok(())
    }
}

/// Credentials bound to the file they were loaded from.
pub struct TokenStore {
    path: PathBuf,
    creds: AuthorizedUser,
}

impl TokenStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DriveError> {
        let path = path.into();
        let creds = AuthorizedUser::load(&path)?;
        Ok(Self { path, creds })
    }

    /// A valid access token, refreshing and re-saving the file if needed.
    pub async fn access_token(&mut self, client: &reqwest::Client) -> Result<String, DriveError> {
        if let Some(token) = self.creds.valid_token(Utc::now()) {
            return Ok(token.to_string());
        }
        self.creds.refresh(client).await?;
        if let Err(e) = self.creds.save(&self.path) {
            warn!(path = %self.path.display(), error = %e, "cannot save refreshed token");
        }
        self.creds
            .token
            .clone()
            .ok_or(DriveError::MissingField("access_token"))
    }
}
