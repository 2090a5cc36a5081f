//! Shared types for the classification pipeline.

use serde::{Deserialize, Serialize};

// ── Input ───────────────────────────────────────────────────────────

/// The parts of an email the classifier looks at.
///
/// Missing fields deserialize as empty strings and never match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailInput {
    pub subject: String,
    /// Raw "From" header, e.g. `Name <addr@domain>` or bare `addr@domain`.
    pub from: String,
    pub snippet: String,
    pub body: String,
}

impl EmailInput {
    pub fn new(
        subject: impl Into<String>,
        from: impl Into<String>,
        snippet: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            from: from.into(),
            snippet: snippet.into(),
            body: body.into(),
        }
    }
}

// ── Per-category results ────────────────────────────────────────────

/// Outcome of weighted keyword scoring for one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    pub score: f64,
    pub matched_keywords: Vec<String>,
    pub matched_phrases: Vec<String>,
    /// `matched_keywords.len() + matched_phrases.len()`.
    pub match_count: usize,
}

/// Plain occurrence totals from [`super::sender::count_keyword_matches`] or
/// [`super::sender::match_phrases`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TermCount {
    /// Number of distinct terms that matched.
    pub count: usize,
    pub matched: Vec<String>,
    pub score: f64,
}

/// Which sender rule produced a [`SenderMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SenderMethod {
    /// Hard-coded per-category heuristic.
    SpecificSender,
    /// Configured regex name pattern.
    NamePattern,
    /// Configured sender-domain pattern.
    SenderDomain,
    /// Configured sender-name pattern.
    SenderName,
}

impl SenderMethod {
    /// Short label used in decision methods.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SpecificSender => "specific-sender",
            Self::NamePattern => "name-pattern",
            Self::SenderDomain => "sender-domain",
            Self::SenderName => "sender-name",
        }
    }
}

/// A sender-derived confidence for one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SenderMatch {
    pub category: String,
    pub confidence: f64,
    pub method: SenderMethod,
    pub matched_pattern: String,
    pub matched_value: String,
}

// ── Output ──────────────────────────────────────────────────────────

/// Final label for one email, with the rule path that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationDecision {
    pub label: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    /// Which rule path fired, e.g. `subject-category-keyword`, `sender-specific-sender`,
    /// `keyword-body-keyword+phrase`, `keyword-no-match`.
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_phrases: Vec<String>,
    /// Raw body score of the winning keyword match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_score: Option<f64>,
    /// Error text when the pipeline fell back because of bad configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClassificationDecision {
    /// A decision carrying only label, confidence and method.
    pub fn bare(label: impl Into<String>, confidence: f64, method: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            confidence,
            method: method.into(),
            matched_pattern: None,
            matched_value: None,
            matched_keywords: Vec::new(),
            matched_phrases: Vec::new(),
            keyword_score: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_input_missing_fields_default_to_empty() {
        let email: EmailInput = serde_json::from_str(r#"{"subject": "Hi"}"#).unwrap();
        assert_eq!(email.subject, "Hi");
        assert!(email.from.is_empty());
        assert!(email.body.is_empty());
    }

    #[test]
    fn decision_serialization_omits_empty_fields() {
        let decision = ClassificationDecision::bare("Other", 0.5, "keyword-no-match");
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["label"], "Other");
        assert_eq!(json["method"], "keyword-no-match");
        assert!(json.get("matched_keywords").is_none());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn sender_method_labels() {
        assert_eq!(SenderMethod::SpecificSender.label(), "specific-sender");
        assert_eq!(SenderMethod::SenderDomain.label(), "sender-domain");
        assert_eq!(
            serde_json::to_value(SenderMethod::NamePattern).unwrap(),
            "name-pattern"
        );
    }
}
