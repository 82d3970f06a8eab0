//! Local classification stage, the last resort.
//!
//! Small local models wrap their JSON in prose, so the object is cut out of
//! the response before parsing. A parsed verdict is always accepted: when it
//! is not confident the category becomes the fallback but the model's
//! confidence and name are kept. Only transport errors and unparseable output
//! produce `Ollama (Failed)`.

use std::time::Duration;

use async_trait::async_trait;
use drivesort_core::{ClassificationRequest, ClassificationResult, Method, Taxonomy};
use tracing::{info, warn};

use crate::audit::PromptAuditLog;
use crate::cascade::{ClassifierStage, StageOutcome};
use crate::parse::{Verdict, extract_json_object, parse_verdict};
use crate::prompt::{PromptStyle, build_prompt};
use crate::InferenceError;

/// Prompt-in, free-text-out chat backend.
#[async_trait]
pub trait LocalModel: Send + Sync {
    /// Model identifier, shown in the result's method label.
    fn model_name(&self) -> &str;

    async fn chat(&self, prompt: &str) -> Result<String, InferenceError>;
}

pub struct LocalStage {
    model: Box<dyn LocalModel>,
    taxonomy: Taxonomy,
    threshold: u8,
    deadline: Duration,
    audit: Option<PromptAuditLog>,
}

impl LocalStage {
    pub fn new(
        model: Box<dyn LocalModel>,
        taxonomy: Taxonomy,
        threshold: u8,
        deadline: Duration,
    ) -> Self {
        Self {
            model,
            taxonomy,
            threshold,
            deadline,
            audit: None,
        }
    }

    /// Record every prompt to `audit` before it is sent.
    pub fn with_audit_log(mut self, audit: PromptAuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    async fn ask(&self, request: &ClassificationRequest) -> Result<Verdict, InferenceError> {
        let prompt = build_prompt(&self.taxonomy, request, PromptStyle::Local);

        if let Some(audit) = &self.audit
            && let Err(e) = audit.record(request.file_name(), &prompt)
        {
            warn!(path = %audit.path().display(), error = %e, "cannot write prompt audit log");
        }

        let text = tokio::time::timeout(self.deadline, self.model.chat(&prompt))
            .await
            .map_err(|_| InferenceError::Timeout(self.deadline))??;
        let json = extract_json_object(&text).ok_or(InferenceError::NoJsonObject)?;
        parse_verdict(json)
    }
}

#[async_trait]
impl ClassifierStage for LocalStage {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn attempt(&self, request: &ClassificationRequest) -> StageOutcome {
        let model = self.model.model_name();
        info!(file = request.file_name(), model, "classifying with Ollama");

        let verdict = match self.ask(request).await {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    file = request.file_name(),
                    model,
                    error = %e,
                    "Ollama classification failed"
                );
                return StageOutcome::Continue(ClassificationResult::failed(
                    self.taxonomy.fallback(),
                    Method::LocalFailed,
                ));
            }
        };

        let sanitized = verdict.sanitize(&self.taxonomy, self.threshold);
        let category = if sanitized.confident {
            sanitized.category
        } else {
            info!(
                file = request.file_name(),
                category = %verdict.category,
                confidence = verdict.confidence,
                "Ollama verdict not confident; using fallback category"
            );
            self.taxonomy.fallback().clone()
        };

        StageOutcome::Accept(ClassificationResult::new(
            category,
            sanitized.confidence,
            Method::Local {
                model: model.to_string(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct MockLocal {
        reply: Result<&'static str, ()>,
        delay: Duration,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl MockLocal {
        fn replying(text: &'static str) -> Self {
            Self {
                reply: Ok(text),
                delay: Duration::ZERO,
                prompts: Arc::default(),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                delay: Duration::ZERO,
                prompts: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl LocalModel for MockLocal {
        fn model_name(&self) -> &str {
            "tinyllama"
        }

        async fn chat(&self, prompt: &str) -> Result<String, InferenceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            tokio::time::sleep(self.delay).await;
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(InferenceError::Server {
                    status: 500,
                    body: "model not loaded".into(),
                }),
            }
        }
    }

    fn stage(model: MockLocal) -> LocalStage {
        LocalStage::new(
            Box::new(model),
            Taxonomy::default(),
            70,
            Duration::from_millis(200),
        )
    }

    fn request() -> ClassificationRequest {
        ClassificationRequest::new("scan.pdf", "lorem ipsum", 800)
    }

    fn accepted(outcome: StageOutcome) -> ClassificationResult {
        match outcome {
            StageOutcome::Accept(r) => r,
            StageOutcome::Continue(r) => panic!("expected accept, got {r:?}"),
        }
    }

    fn failed(outcome: StageOutcome) -> ClassificationResult {
        match outcome {
            StageOutcome::Continue(r) => {
                assert_eq!(r.method, Method::LocalFailed);
                assert!(r.category.is_fallback());
                assert_eq!(r.confidence, 0);
                r
            }
            StageOutcome::Accept(r) => panic!("expected failure, got {r:?}"),
        }
    }

    #[tokio::test]
    async fn json_inside_prose_is_extracted() {
        let model = MockLocal::replying(
            r#"Sure! {"category": "Finance", "confidence": 95} Hope that helps."#,
        );
        let r = accepted(stage(model).attempt(&request()).await);
        assert_eq!(r.category.as_str(), "Finance");
        assert_eq!(r.confidence, 95);
        assert_eq!(r.method.to_string(), "Ollama (tinyllama)");
    }

    #[tokio::test]
    async fn threshold_boundary_keeps_model_method() {
        let at = MockLocal::replying(r#"{"category": "HR", "confidence": 70}"#);
        let r = accepted(stage(at).attempt(&request()).await);
        assert_eq!(r.category.as_str(), "HR");

        let below = MockLocal::replying(r#"{"category": "HR", "confidence": 69}"#);
        let r = accepted(stage(below).attempt(&request()).await);
        assert!(r.category.is_fallback());
        assert_eq!(r.confidence, 69);
        assert_eq!(
            r.method,
            Method::Local {
                model: "tinyllama".into()
            }
        );
    }

    #[tokio::test]
    async fn hallucinated_category_becomes_fallback() {
        let model = MockLocal::replying(r#"{"category": "Bananas", "confidence": 99}"#);
        let r = accepted(stage(model).attempt(&request()).await);
        assert!(r.category.is_fallback());
        assert_eq!(r.method.to_string(), "Ollama (tinyllama)");
    }

    #[tokio::test]
    async fn no_json_object_fails() {
        let model = MockLocal::replying("I think this is about money.");
        failed(stage(model).attempt(&request()).await);
    }

    #[tokio::test]
    async fn unparseable_object_fails() {
        let model = MockLocal::replying("{category: Finance, confidence: high}");
        failed(stage(model).attempt(&request()).await);
    }

    #[tokio::test]
    async fn transport_error_fails() {
        failed(stage(MockLocal::failing()).attempt(&request()).await);
    }

    #[tokio::test]
    async fn deadline_expiry_fails() {
        let mut model = MockLocal::replying(r#"{"category": "HR", "confidence": 90}"#);
        model.delay = Duration::from_secs(5);
        failed(stage(model).attempt(&request()).await);
    }

    #[tokio::test]
    async fn prompt_is_audited_before_call_even_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("ollama_requests.log");
        let model = MockLocal::failing();
        let prompts = model.prompts.clone();

        let stage = stage(model).with_audit_log(PromptAuditLog::new(&log_path));
        failed(stage.attempt(&request()).await);

        let logged = std::fs::read_to_string(&log_path).unwrap();
        let sent = prompts.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(logged.contains("FILE: scan.pdf"));
        assert!(logged.contains(&sent[0]));
    }

    #[tokio::test]
    async fn unwritable_audit_log_does_not_block_classification() {
        let dir = tempfile::tempdir().unwrap();
        let log = PromptAuditLog::new(dir.path().join("missing").join("log.txt"));
        let model = MockLocal::replying(r#"{"category": "HR", "confidence": 90}"#);
        let r = accepted(stage(model).with_audit_log(log).attempt(&request()).await);
        assert_eq!(r.category.as_str(), "HR");
    }
}
