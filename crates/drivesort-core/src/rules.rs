//! Keyword rule table: category → lowercase keywords, in declaration order.
//!
//! Declaration order is the tie-break when a file contains keywords of several
//! categories: the first declared category with any matching keyword wins.

use tracing::debug;

use crate::category::{Category, Taxonomy};
use crate::config::ConfigError;

/// Built-in rules, in the order they are tried.
pub const DEFAULT_RULES: &[(&str, &[&str])] = &[
    (
        "Finance",
        &["invoice", "receipt", "salary", "tax", "statement", "budget", "expense"],
    ),
    (
        "HR",
        &["resume", "offer letter", "contract", "agreement", "hiring", "onboarding"],
    ),
    (
        "Academics",
        &["thesis", "homework", "assignment", "report", "study", "exam", "grade"],
    ),
    (
        "Marketing",
        &["campaign", "social media", "ad", "flyer", "brochure", "promotion"],
    ),
    ("Projects", &["project", "timeline", "plan", "roadmap"]),
];

/// One category's keyword list.
#[derive(Debug, Clone)]
pub struct Rule {
    pub category: Category,
    /// Lowercased, non-empty.
    pub keywords: Vec<String>,
}

/// Immutable, ordered rule table. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Build a rule table, validating every category against `taxonomy`.
    ///
    /// Keywords are trimmed and lowercased. Rules may not target the fallback
    /// category, and blank keywords are rejected since they would match every file.
    pub fn new<I, K>(taxonomy: &Taxonomy, rules: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, K)>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let mut table = Vec::new();
        for (name, keywords) in rules {
            let category = taxonomy
                .get(name.trim())
                .cloned()
                .ok_or_else(|| ConfigError::UnknownRuleCategory(name.clone()))?;

            let mut lowered = Vec::new();
            for kw in keywords {
                let kw = kw.as_ref().trim().to_lowercase();
                if kw.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "blank keyword in rule for '{category}'"
                    )));
                }
                lowered.push(kw);
            }

            table.push(Rule {
                category,
                keywords: lowered,
            });
        }
        Ok(Self { rules: table })
    }

    /// The built-in rules, restricted to categories present in `taxonomy`.
    pub fn defaults(taxonomy: &Taxonomy) -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .filter_map(|(name, keywords)| match taxonomy.get(name) {
                Some(category) => Some(Rule {
                    category: category.clone(),
                    keywords: keywords.iter().map(|k| k.to_string()).collect(),
                }),
                None => {
                    debug!(category = *name, "skipping default rule for unconfigured category");
                    None
                }
            })
            .collect();
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
