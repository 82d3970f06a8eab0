//! The classification cascade: an ordered chain of classifier stages.
//!
//! Each stage either accepts the file with a result or hands it on. The first
//! accepting stage wins; if every stage hands it on, the last stage's failure
//! result is returned. Stages never error: failures are results too.

use async_trait::async_trait;
use drivesort_core::{ClassificationRequest, ClassificationResult, OrganizerConfig};
use tracing::{debug, info};

use crate::audit::PromptAuditLog;
use crate::cloud::CloudStage;
use crate::gemini::GeminiClient;
use crate::local::LocalStage;
use crate::ollama::OllamaClient;
use crate::rules::RuleStage;
use crate::AiError;

/// What a stage decided about one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Final answer; later stages are not consulted.
    Accept(ClassificationResult),
    /// Not confident. The result records why, for reporting if no later stage accepts.
    Continue(ClassificationResult),
}

/// One strategy in the cascade.
#[async_trait]
pub trait ClassifierStage: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    /// Classify an already-truncated request. Must not panic or block indefinitely.
    async fn attempt(&self, request: &ClassificationRequest) -> StageOutcome;
}

pub struct Cascade {
    stages: Vec<Box<dyn ClassifierStage>>,
    max_text_length: usize,
}

impl Cascade {
    pub fn new(
        stages: Vec<Box<dyn ClassifierStage>>,
        max_text_length: usize,
    ) -> Result<Self, AiError> {
        if stages.is_empty() {
            return Err(AiError::EmptyCascade);
        }
        Ok(Self {
            stages,
            max_text_length,
        })
    }

    /// Standard cascade: rules, then Gemini if an API key is configured, then Ollama.
    pub fn from_config(config: &OrganizerConfig) -> Result<Self, AiError> {
        let taxonomy = &config.taxonomy;
        let mut stages: Vec<Box<dyn ClassifierStage>> = vec![Box::new(RuleStage::new(
            config.rules.clone(),
            taxonomy.fallback().clone(),
        ))];

        if let Some(api_key) = config.gemini_api_key.as_deref()
            && config.cloud_enabled()
        {
            let client =
                GeminiClient::new(api_key, &config.gemini_model, config.request_timeout)?;
            stages.push(Box::new(CloudStage::new(
                Box::new(client),
                taxonomy.clone(),
                config.confidence_threshold,
                config.request_timeout,
            )));
            info!(model = %config.gemini_model, "cloud classification enabled");
        } else {
            info!("no Gemini API key; cloud classification disabled");
        }

        let client =
            OllamaClient::new(&config.ollama_url, &config.local_model, config.request_timeout)?;
        stages.push(Box::new(
            LocalStage::new(
                Box::new(client),
                taxonomy.clone(),
                config.confidence_threshold,
                config.request_timeout,
            )
            .with_audit_log(PromptAuditLog::new(&config.audit_log)),
        ));

        Self::new(stages, config.max_text_length)
    }

    /// Stage names in the order they are tried.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Classify one file from its name and raw (untruncated) text.
    pub async fn classify(&self, file_name: &str, raw_text: &str) -> ClassificationResult {
        let request = ClassificationRequest::new(file_name, raw_text, self.max_text_length);
        self.classify_request(&request).await
    }

    pub async fn classify_request(&self, request: &ClassificationRequest) -> ClassificationResult {
        let mut last = None;
        for stage in &self.stages {
            match stage.attempt(request).await {
                StageOutcome::Accept(result) => {
                    debug!(
                        stage = stage.name(),
                        file = request.file_name(),
                        category = %result.category,
                        confidence = result.confidence,
                        "stage accepted"
                    );
                    return result;
                }
                StageOutcome::Continue(result) => {
                    debug!(
                        stage = stage.name(),
                        file = request.file_name(),
                        method = %result.method,
                        "stage passed, trying next"
                    );
                    last = Some(result);
                }
            }
        }
        last.unwrap_or_else(|| unreachable!("cascade is never empty"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivesort_core::{Method, RuleTable, Taxonomy};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scripted stage that records every snippet it sees.
    struct ScriptedStage {
        name: &'static str,
        outcome: StageOutcome,
        seen: Arc<Mutex<Vec<String>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedStage {
        fn new(name: &'static str, outcome: StageOutcome) -> Self {
            Self {
                name,
                outcome,
                seen: Arc::default(),
                calls: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl ClassifierStage for ScriptedStage {
        fn name(&self) -> &str {
            self.name
        }

        async fn attempt(&self, request: &ClassificationRequest) -> StageOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.snippet().to_string());
            self.outcome.clone()
        }
    }

    fn tax() -> Taxonomy {
        Taxonomy::default()
    }

    fn accept(cat: &str, confidence: u8, method: Method) -> StageOutcome {
        StageOutcome::Accept(ClassificationResult::new(tax().resolve(cat), confidence, method))
    }

    fn pass(method: Method) -> StageOutcome {
        StageOutcome::Continue(ClassificationResult::failed(tax().fallback(), method))
    }

    fn two_stage(cloud: ScriptedStage, local: ScriptedStage) -> Cascade {
        let stages: Vec<Box<dyn ClassifierStage>> = vec![Box::new(cloud), Box::new(local)];
        Cascade::new(stages, 800).unwrap()
    }

    #[test]
    fn empty_cascade_is_rejected() {
        assert!(matches!(Cascade::new(vec![], 800), Err(AiError::EmptyCascade)));
    }

    #[tokio::test]
    async fn rule_hit_short_circuits() {
        let cloud = ScriptedStage::new("cloud", accept("HR", 99, Method::Cloud));
        let local = ScriptedStage::new(
            "local",
            accept("HR", 99, Method::Local { model: "m".into() }),
        );
        let (cloud_calls, local_calls) = (cloud.calls.clone(), local.calls.clone());

        let rules = RuleStage::new(RuleTable::defaults(&tax()), tax().fallback().clone());
        let stages: Vec<Box<dyn ClassifierStage>> =
            vec![Box::new(rules), Box::new(cloud), Box::new(local)];
        let cascade = Cascade::new(stages, 800).unwrap();

        let r = cascade.classify("receipt.pdf", "").await;
        assert_eq!(r.category.as_str(), "Finance");
        assert_eq!(r.confidence, 90);
        assert_eq!(r.method, Method::RuleBased);
        assert_eq!(cloud_calls.load(Ordering::SeqCst), 0);
        assert_eq!(local_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cloud_failure_falls_through_with_same_text() {
        let cloud = ScriptedStage::new("cloud", pass(Method::CloudFailed));
        let local = ScriptedStage::new(
            "local",
            accept("Personal", 75, Method::Local { model: "m".into() }),
        );
        let (cloud_seen, local_seen) = (cloud.seen.clone(), local.seen.clone());
        let local_calls = local.calls.clone();

        let cascade = two_stage(cloud, local);
        let r = cascade.classify("holiday.txt", "beach photos list").await;

        assert_eq!(r.category.as_str(), "Personal");
        assert_eq!(local_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*cloud_seen.lock().unwrap(), *local_seen.lock().unwrap());
    }

    #[tokio::test]
    async fn cloud_success_skips_local() {
        let cloud = ScriptedStage::new("cloud", accept("Academics", 88, Method::Cloud));
        let local = ScriptedStage::new("local", pass(Method::LocalFailed));
        let local_calls = local.calls.clone();

        let cascade = two_stage(cloud, local);
        let r = cascade.classify("notes.txt", "lecture").await;

        assert_eq!(r.method, Method::Cloud);
        assert_eq!(local_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_cascade_returns_last_failure() {
        let cloud = ScriptedStage::new("cloud", pass(Method::CloudFailed));
        let local = ScriptedStage::new("local", pass(Method::LocalFailed));

        let cascade = two_stage(cloud, local);
        let r = cascade.classify("x.bin", "").await;

        assert_eq!(r.method, Method::LocalFailed);
        assert!(r.category.is_fallback());
        assert_eq!(r.confidence, 0);
    }

    #[tokio::test]
    async fn stages_see_truncated_text() {
        let cloud = ScriptedStage::new("cloud", pass(Method::CloudFailed));
        let local = ScriptedStage::new("local", pass(Method::LocalFailed));
        let (cloud_seen, local_seen) = (cloud.seen.clone(), local.seen.clone());

        let cascade = two_stage(cloud, local);
        cascade.classify("long.txt", &"z".repeat(2000)).await;

        assert_eq!(cloud_seen.lock().unwrap()[0].chars().count(), 800);
        assert_eq!(local_seen.lock().unwrap()[0].chars().count(), 800);
    }

    #[test]
    fn from_config_without_key_has_no_cloud_stage() {
        let cascade = Cascade::from_config(&OrganizerConfig::default()).unwrap();
        assert_eq!(cascade.stage_names(), vec!["rules", "ollama"]);
    }

    #[test]
    fn from_config_with_key_adds_cloud_stage() {
        let config = OrganizerConfig {
            gemini_api_key: Some("test-key".into()),
            ..OrganizerConfig::default()
        };
        let cascade = Cascade::from_config(&config).unwrap();
        assert_eq!(cascade.stage_names(), vec!["rules", "gemini", "ollama"]);
    }
}
