//! Core types shared by the drivesort crates: the closed category set,
//! classification requests/results, the keyword rule table, and configuration.

pub mod category;
pub mod classification;
pub mod config;
pub mod rules;

pub use category::{Category, Taxonomy};
pub use classification::{ClassificationRequest, ClassificationResult, Method, truncate_chars};
pub use config::{ConfigError, OrganizerConfig};
pub use rules::RuleTable;
