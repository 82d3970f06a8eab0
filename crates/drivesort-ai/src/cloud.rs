//! Cloud classification stage.
//!
//! Optional, higher-quality middle stage. A category outside the configured
//! set is replaced by the fallback and still accepted. Any error, or
//! confidence under the threshold, yields `Gemini (Failed)` and the cascade
//! moves on to the local model.

use std::time::Duration;

use async_trait::async_trait;
use drivesort_core::{ClassificationRequest, ClassificationResult, Method, Taxonomy};
use tracing::{info, warn};

use crate::cascade::{ClassifierStage, StageOutcome};
use crate::parse::{Verdict, parse_verdict};
use crate::prompt::{PromptStyle, build_prompt};
use crate::InferenceError;

/// Prompt-in, JSON-text-out generation backend.
#[async_trait]
pub trait CloudModel: Send + Sync {
    /// Generate a response constrained to JSON output.
    async fn generate_json(&self, prompt: &str) -> Result<String, InferenceError>;
}

pub struct CloudStage {
    model: Box<dyn CloudModel>,
    taxonomy: Taxonomy,
    threshold: u8,
    deadline: Duration,
}

impl CloudStage {
    pub fn new(
        model: Box<dyn CloudModel>,
        taxonomy: Taxonomy,
        threshold: u8,
        deadline: Duration,
    ) -> Self {
        Self {
            model,
            taxonomy,
            threshold,
            deadline,
        }
    }

    async fn ask(&self, request: &ClassificationRequest) -> Result<Verdict, InferenceError> {
        let prompt = build_prompt(&self.taxonomy, request, PromptStyle::Cloud);
        let text = tokio::time::timeout(self.deadline, self.model.generate_json(&prompt))
            .await
            .map_err(|_| InferenceError::Timeout(self.deadline))??;
        parse_verdict(text.trim())
    }

    fn failed(&self) -> StageOutcome {
        StageOutcome::Continue(ClassificationResult::failed(
            self.taxonomy.fallback(),
            Method::CloudFailed,
        ))
    }
}

#[async_trait]
impl ClassifierStage for CloudStage {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn attempt(&self, request: &ClassificationRequest) -> StageOutcome {
        info!(file = request.file_name(), "classifying with Gemini");
        let verdict = match self.ask(request).await {
            Ok(v) => v,
            Err(e) => {
                warn!(file = request.file_name(), error = %e, "Gemini classification failed");
                return self.failed();
            }
        };

        let sanitized = verdict.sanitize(&self.taxonomy, self.threshold);
        if sanitized.confidence < self.threshold {
            info!(
                file = request.file_name(),
                category = %verdict.category,
                confidence = verdict.confidence,
                threshold = self.threshold,
                "Gemini verdict below confidence threshold"
            );
            return self.failed();
        }
        if sanitized.category.is_fallback() {
            info!(
                file = request.file_name(),
                category = %verdict.category,
                "Gemini returned an unknown category; using fallback"
            );
        }

        StageOutcome::Accept(ClassificationResult::new(
            sanitized.category,
            sanitized.confidence,
            Method::Cloud,
        ))
    }
}
