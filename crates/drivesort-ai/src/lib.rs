//! Classification cascade: keyword rules first, then cloud inference (Gemini)
//! when configured, then local inference (Ollama) as the last resort.

pub mod audit;
pub mod cascade;
pub mod cloud;
mod error;
pub mod gemini;
pub mod local;
pub mod ollama;
pub mod parse;
pub mod prompt;
pub mod rules;

pub use audit::PromptAuditLog;
pub use cascade::{Cascade, ClassifierStage, StageOutcome};
pub use cloud::{CloudModel, CloudStage};
pub use error::{AiError, InferenceError};
pub use gemini::GeminiClient;
pub use local::{LocalModel, LocalStage};
pub use ollama::OllamaClient;
pub use rules::RuleStage;
