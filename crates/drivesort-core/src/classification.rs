//! Classification request/result types and method provenance.

use std::fmt;

use crate::category::Category;

/// Which strategy produced a [`ClassificationResult`].
///
/// The `Display` form is the audit label shown to operators, e.g.
/// `Rule-Based` or `Ollama (tinyllama)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    RuleBased,
    Cloud,
    /// Cloud stage errored or was not confident; the cascade moves on.
    CloudFailed,
    Local { model: String },
    /// Local stage errored or produced no JSON object.
    LocalFailed,
}

impl Method {
    /// Failure variants carry no usable verdict.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::CloudFailed | Self::LocalFailed)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RuleBased => f.write_str("Rule-Based"),
            Self::Cloud => f.write_str("Gemini (Cloud)"),
            Self::CloudFailed => f.write_str("Gemini (Failed)"),
            Self::Local { model } => write!(f, "Ollama ({model})"),
            Self::LocalFailed => f.write_str("Ollama (Failed)"),
        }
    }
}

/// Input to the classification cascade for one file.
///
/// The snippet is truncated at construction, so no classifier ever sees more
/// than `max_text_length` characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationRequest {
    file_name: String,
    snippet: String,
}

impl ClassificationRequest {
    pub fn new(file_name: impl Into<String>, raw_text: &str, max_text_length: usize) -> Self {
        Self {
            file_name: file_name.into(),
            snippet: truncate_chars(raw_text, max_text_length).to_string(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn snippet(&self) -> &str {
        &self.snippet
    }

    /// Lowercased `"<file name> <snippet>"`, the text keyword rules match against.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.file_name, self.snippet).to_lowercase()
    }
}

/// Outcome of classifying one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub category: Category,
    /// 0–100.
    pub confidence: u8,
    pub method: Method,
}

impl ClassificationResult {
    pub fn new(category: Category, confidence: u8, method: Method) -> Self {
        Self {
            category,
            confidence: confidence.min(100),
            method,
        }
    }

    /// A failure result: fallback category, zero confidence.
    pub fn failed(fallback: &Category, method: Method) -> Self {
        Self {
            category: fallback.clone(),
            confidence: 0,
            method,
        }
    }
}

/// Cut `text` to at most `max_chars` characters (not bytes).
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Taxonomy;

    #[test]
    fn method_labels() {
        assert_eq!(Method::RuleBased.to_string(), "Rule-Based");
        assert_eq!(Method::Cloud.to_string(), "Gemini (Cloud)");
        assert_eq!(Method::CloudFailed.to_string(), "Gemini (Failed)");
        assert_eq!(
            Method::Local {
                model: "tinyllama".into()
            }
            .to_string(),
            "Ollama (tinyllama)"
        );
        assert_eq!(Method::LocalFailed.to_string(), "Ollama (Failed)");
    }

    #[test]
    fn failure_variants() {
        assert!(Method::CloudFailed.is_failure());
        assert!(Method::LocalFailed.is_failure());
        assert!(!Method::RuleBased.is_failure());
        assert!(!Method::Local { model: "m".into() }.is_failure());
    }

    #[test]
    fn request_truncates_to_max_length() {
        let raw = "x".repeat(2000);
        let req = ClassificationRequest::new("notes.txt", &raw, 800);
        assert_eq!(req.snippet().chars().count(), 800);
    }

    #[test]
    fn request_keeps_short_text() {
        let req = ClassificationRequest::new("a.txt", "short", 800);
        assert_eq!(req.snippet(), "short");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let text = "ééééé";
        assert_eq!(truncate_chars(text, 3), "ééé");
        assert_eq!(truncate_chars(text, 10), text);
        assert_eq!(truncate_chars(text, 0), "");
    }

    #[test]
    fn haystack_is_lowercased_name_and_snippet() {
        let req = ClassificationRequest::new("Q3 Budget.xlsx", "Totals BY Region", 800);
        assert_eq!(req.haystack(), "q3 budget.xlsx totals by region");
    }

    #[test]
    fn result_clamps_confidence() {
        let tax = Taxonomy::default();
        let r = ClassificationResult::new(tax.resolve("HR"), 250, Method::Cloud);
        assert_eq!(r.confidence, 100);
    }

    #[test]
    fn failed_result_uses_fallback() {
        let tax = Taxonomy::default();
        let r = ClassificationResult::failed(tax.fallback(), Method::CloudFailed);
        assert!(r.category.is_fallback());
        assert_eq!(r.confidence, 0);
    }
}
