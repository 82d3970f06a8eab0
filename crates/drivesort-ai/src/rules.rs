//! Keyword rule stage: the cheap deterministic first pass.

use async_trait::async_trait;
use drivesort_core::{Category, ClassificationRequest, ClassificationResult, Method, RuleTable};
use tracing::debug;

use crate::cascade::{ClassifierStage, StageOutcome};

/// Confidence assigned to every rule hit.
pub const RULE_CONFIDENCE: u8 = 90;

/// First rule with a keyword occurring anywhere in `haystack`.
///
/// Plain substring search, no word boundaries: `"ad"` matches `"read"`.
/// `haystack` must already be lowercased.
pub fn match_rules<'a>(rules: &'a RuleTable, haystack: &str) -> Option<(&'a Category, &'a str)> {
    rules.iter().find_map(|rule| {
        rule.keywords
            .iter()
            .find(|kw| haystack.contains(kw.as_str()))
            .map(|kw| (&rule.category, kw.as_str()))
    })
}

pub struct RuleStage {
    rules: RuleTable,
    fallback: Category,
}

impl RuleStage {
    pub fn new(rules: RuleTable, fallback: Category) -> Self {
        Self { rules, fallback }
    }
}

#[async_trait]
impl ClassifierStage for RuleStage {
    fn name(&self) -> &str {
        "rules"
    }

    async fn attempt(&self, request: &ClassificationRequest) -> StageOutcome {
        match match_rules(&self.rules, &request.haystack()) {
            Some((category, keyword)) => {
                debug!(file = request.file_name(), %category, keyword, "keyword rule matched");
                StageOutcome::Accept(ClassificationResult::new(
                    category.clone(),
                    RULE_CONFIDENCE,
                    Method::RuleBased,
                ))
            }
            None => StageOutcome::Continue(ClassificationResult::failed(
                &self.fallback,
                Method::RuleBased,
            )),
        }
    }
}
