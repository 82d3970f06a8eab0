//! Organizer configuration: built-in defaults, optionally overridden by a TOML file.
//!
//! The binary layers command-line flags and environment variables on top and
//! then treats the result as read-only for the rest of the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::category::{DEFAULT_CATEGORIES, DEFAULT_FALLBACK, Taxonomy};
use crate::rules::RuleTable;

pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 70;
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 800;
pub const DEFAULT_LOCAL_MODEL: &str = "tinyllama";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_AUDIT_LOG: &str = "ollama_requests.log";
/// Pause between files; keeps a 15 requests/minute free-tier quota happy.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(4);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no categories configured")]
    NoCategories,

    #[error("duplicate category: {0}")]
    DuplicateCategory(String),

    #[error("category '{0}' has the same name as the fallback category")]
    FallbackCollision(String),

    #[error("rule references unknown category '{0}'")]
    UnknownRuleCategory(String),

    #[error("{0}")]
    Invalid(String),
}

/// On-disk shape of the TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    categories: Option<Vec<String>>,
    fallback_category: Option<String>,
    rules: Option<Vec<FileRule>>,
    confidence_threshold: Option<u8>,
    max_text_length: Option<usize>,
    local_model: Option<String>,
    ollama_url: Option<String>,
    gemini_model: Option<String>,
    dry_run: Option<bool>,
    request_delay_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    audit_log: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileRule {
    category: String,
    keywords: Vec<String>,
}

/// Everything the organizer needs to know, fixed for the lifetime of a run.
#[derive(Clone)]
pub struct OrganizerConfig {
    pub taxonomy: Taxonomy,
    pub rules: RuleTable,
    /// Minimum model confidence (inclusive) accepted as a confident verdict.
    pub confidence_threshold: u8,
    /// Maximum snippet length in characters handed to any classifier.
    pub max_text_length: usize,
    pub local_model: String,
    pub ollama_url: String,
    pub gemini_model: String,
    /// Presence enables the cloud stage.
    pub gemini_api_key: Option<String>,
    pub dry_run: bool,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub audit_log: PathBuf,
}

impl Default for OrganizerConfig {
    fn default() -> Self {
        let taxonomy = Taxonomy::default();
        let rules = RuleTable::defaults(&taxonomy);
        Self {
            taxonomy,
            rules,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
            local_model: DEFAULT_LOCAL_MODEL.to_string(),
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_api_key: None,
            dry_run: false,
            request_delay: DEFAULT_REQUEST_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
        }
    }
}

impl fmt::Debug for OrganizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrganizerConfig")
            .field("taxonomy", &self.taxonomy)
            .field("rules", &self.rules.len())
            .field("confidence_threshold", &self.confidence_threshold)
            .field("max_text_length", &self.max_text_length)
            .field("local_model", &self.local_model)
            .field("ollama_url", &self.ollama_url)
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("dry_run", &self.dry_run)
            .field("request_delay", &self.request_delay)
            .field("request_timeout", &self.request_timeout)
            .field("audit_log", &self.audit_log)
            .finish()
    }
}

impl OrganizerConfig {
    /// Load a TOML config file on top of the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse TOML config text on top of the defaults.
    ///
    /// When `categories` is overridden but `rules` is not, the built-in rules
    /// are kept for whichever of their categories are still configured.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text)?;
        let mut config = Self::default();

        if file.categories.is_some() || file.fallback_category.is_some() {
            let names: Vec<String> = file.categories.unwrap_or_else(|| {
                DEFAULT_CATEGORIES.iter().map(|s| s.to_string()).collect()
            });
            let fallback = file.fallback_category.as_deref().unwrap_or(DEFAULT_FALLBACK);
            config.taxonomy = Taxonomy::new(names, fallback)?;
        }

        config.rules = match file.rules {
            Some(rules) => RuleTable::new(
                &config.taxonomy,
                rules.into_iter().map(|r| (r.category, r.keywords)),
            )?,
            None => RuleTable::defaults(&config.taxonomy),
        };

        if let Some(v) = file.confidence_threshold {
            config.confidence_threshold = v;
        }
        if let Some(v) = file.max_text_length {
            config.max_text_length = v;
        }
        if let Some(v) = file.local_model {
            config.local_model = v;
        }
        if let Some(v) = file.ollama_url {
            config.ollama_url = v;
        }
        if let Some(v) = file.gemini_model {
            config.gemini_model = v;
        }
        if let Some(v) = file.dry_run {
            config.dry_run = v;
        }
        if let Some(v) = file.request_delay_secs {
            config.request_delay = Duration::from_secs(v);
        }
        if let Some(v) = file.request_timeout_secs {
            config.request_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.audit_log {
            config.audit_log = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints. Call again after applying overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confidence_threshold > 100 {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be 0-100, got {}",
                self.confidence_threshold
            )));
        }
        if self.max_text_length == 0 {
            return Err(ConfigError::Invalid("max_text_length must be positive".into()));
        }
        if self.local_model.trim().is_empty() {
            return Err(ConfigError::Invalid("local_model is empty".into()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request_timeout must be positive".into()));
        }
        Ok(())
    }

    /// Whether the cloud classification stage should run.
    pub fn cloud_enabled(&self) -> bool {
        self.gemini_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}
