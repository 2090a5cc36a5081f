//! Category rule tables.
//!
//! A [`RuleBook`] maps category names to hand-curated [`CategoryRuleSet`]s plus
//! the category and content weight tables used by the keyword scorer. Books are
//! immutable once loaded; a reload builds a new book and swaps it in whole.
//!
//! The default table ships embedded in the binary (`default_rules.json`) and
//! any replacement file must follow the same schema.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

const DEFAULT_RULES_JSON: &str = include_str!("default_rules.json");

/// Evaluation tier of a category. Controls ordering only, never scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Sort rank of the tier (high first).
    pub fn rank(self) -> u32 {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

/// Sender allow/deny lists for one category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SenderPatterns {
    /// Exact or `*`-wildcard domain patterns.
    #[serde(default)]
    pub sender_domains: Vec<String>,
    /// Case-insensitive substrings of the sender display name.
    #[serde(default)]
    pub sender_names: Vec<String>,
    #[serde(default)]
    pub exclude_domains: Vec<String>,
    #[serde(default)]
    pub exclude_names: Vec<String>,
    /// Regular expressions tested against the raw sender string.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_patterns: Vec<String>,
}

/// Keyword, phrase and sender rules for a single category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRuleSet {
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub primary_keywords: Vec<String>,
    #[serde(default)]
    pub secondary_keywords: Vec<String>,
    #[serde(default)]
    pub phrases: Vec<String>,
    #[serde(default)]
    pub exclusion_keywords: Vec<String>,
    #[serde(default)]
    pub patterns: SenderPatterns,
    #[serde(skip)]
    compiled: OnceLock<CompiledTerms>,
}

/// Regexes derived from a rule set, built on first use and shared read-only.
#[derive(Debug, Clone)]
pub(crate) struct CompiledTerms {
    pub primary: Vec<Option<Regex>>,
    pub secondary: Vec<Option<Regex>>,
    pub name_patterns: Vec<Regex>,
}

impl CategoryRuleSet {
    /// Empty rule set with the given name and tier.
    pub fn new(name: impl Into<String>, priority: Priority) -> Self {
        Self {
            name: name.into(),
            priority,
            ..Default::default()
        }
    }

    pub(crate) fn compiled(&self) -> &CompiledTerms {
        self.compiled.get_or_init(|| CompiledTerms {
            primary: self.primary_keywords.iter().map(|k| word_regex(k)).collect(),
            secondary: self
                .secondary_keywords
                .iter()
                .map(|k| word_regex(k))
                .collect(),
            name_patterns: self
                .patterns
                .name_patterns
                .iter()
                .filter_map(|p| match Regex::new(p) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!(category = %self.name, pattern = %p, error = %e, "Ignoring invalid name pattern");
                        None
                    }
                })
                .collect(),
        })
    }

    /// Compiled regex name patterns (invalid entries are dropped).
    pub fn name_patterns(&self) -> &[Regex] {
        &self.compiled().name_patterns
    }

    fn keyword_count(&self) -> usize {
        self.primary_keywords.len() + self.secondary_keywords.len()
    }
}

/// Case-insensitive, word-bounded literal matcher for a configured term.
///
/// Returns `None` if the term cannot be compiled; such a term never matches.
pub fn word_regex(term: &str) -> Option<Regex> {
    let source = format!(r"\b{}\b", regex::escape(&term.to_lowercase()));
    match RegexBuilder::new(&source).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(term, error = %e, "Keyword could not be compiled, treating as non-match");
            None
        }
    }
}

/// Field and tier multipliers for keyword scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentWeights {
    pub subject: f64,
    pub snippet: f64,
    pub body: f64,
    pub phrase: f64,
    pub primary_keyword: f64,
    pub secondary_keyword: f64,
}

impl Default for ContentWeights {
    fn default() -> Self {
        Self {
            subject: 2.0,
            snippet: 1.5,
            body: 1.0,
            phrase: 1.5,
            primary_keyword: 1.2,
            secondary_keyword: 1.0,
        }
    }
}

impl ContentWeights {
    /// Named view of every multiplier, for validation.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("subject", self.subject),
            ("snippet", self.snippet),
            ("body", self.body),
            ("phrase", self.phrase),
            ("primary_keyword", self.primary_keyword),
            ("secondary_keyword", self.secondary_keyword),
        ]
    }
}

/// The full category → rule set table with its weight tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleBook {
    /// Rule sets in declaration order.
    pub categories: Vec<CategoryRuleSet>,
    /// Multiplier applied to keyword-derived scores, keyed by category name.
    #[serde(default)]
    pub category_weights: HashMap<String, f64>,
    #[serde(default)]
    pub content_weights: ContentWeights,
}

/// Counts reported by [`RuleBook::summary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleBookSummary {
    pub categories: usize,
    pub keywords: usize,
    pub phrases: usize,
    pub names: Vec<String>,
}

impl RuleBook {
    /// The rule table shipped with the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(DEFAULT_RULES_JSON)
    }

    /// Parse a rule table from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let book: Self = serde_json::from_str(json)?;
        if book.categories.is_empty() {
            return Err(ConfigError::Empty("rule table defines no categories".into()));
        }
        Ok(book)
    }

    /// Read and parse a rule table file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let book = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            categories = book.categories.len(),
            "Loaded rule table"
        );
        Ok(book)
    }

    /// Rule set for a category, if configured.
    pub fn get(&self, name: &str) -> Option<&CategoryRuleSet> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Category names in declaration order.
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    /// Keyword score multiplier for a category (1.0 when unlisted).
    pub fn category_weight(&self, name: &str) -> f64 {
        self.category_weights.get(name).copied().unwrap_or(1.0)
    }

    pub fn summary(&self) -> RuleBookSummary {
        RuleBookSummary {
            categories: self.categories.len(),
            keywords: self.categories.iter().map(|c| c.keyword_count()).sum(),
            phrases: self.categories.iter().map(|c| c.phrases.len()).sum(),
            names: self.category_names(),
        }
    }

    /// Sanity checks for hand-edited tables. Returns human-readable warnings;
    /// none of them prevent the table from being used.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for category in &self.categories {
            if !seen.insert(category.name.as_str()) {
                warnings.push(format!("duplicate category '{}'", category.name));
            }
            if category.primary_keywords.is_empty() {
                warnings.push(format!("category '{}' has no primary keywords", category.name));
            }
            if category.secondary_keywords.is_empty() {
                warnings.push(format!(
                    "category '{}' has no secondary keywords",
                    category.name
                ));
            }
            for pattern in &category.patterns.name_patterns {
                if let Err(e) = Regex::new(pattern) {
                    warnings.push(format!(
                        "category '{}' has invalid name pattern '{}': {}",
                        category.name, pattern, e
                    ));
                }
            }
            let blank = category
                .primary_keywords
                .iter()
                .chain(&category.secondary_keywords)
                .chain(&category.phrases)
                .any(|t| t.trim().is_empty());
            if blank {
                warnings.push(format!("category '{}' has a blank term", category.name));
            }
        }

        let mut weighted: Vec<_> = self.category_weights.iter().collect();
        weighted.sort_by(|a, b| a.0.cmp(b.0));
        for (name, weight) in weighted {
            if !seen.contains(name.as_str()) {
                warnings.push(format!("weight given for unknown category '{}'", name));
            }
            if !weight.is_finite() || *weight <= 0.0 {
                warnings.push(format!("category '{}' has non-positive weight {}", name, weight));
            }
        }

        for (field, weight) in self.content_weights.entries() {
            if !weight.is_finite() || weight <= 0.0 {
                warnings.push(format!("content weight '{}' is non-positive: {}", field, weight));
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_parses() {
        let book = RuleBook::builtin().unwrap();
        let summary = book.summary();
        assert_eq!(summary.categories, 8);
        assert!(summary.keywords > 500);
        for name in [
            "Placement",
            "NPTEL",
            "HOD",
            "E-Zone",
            "Promotions",
            "Whats happening",
            "Professor",
            "Other",
        ] {
            assert!(book.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn builtin_categories_keep_declaration_order() {
        let book = RuleBook::builtin().unwrap();
        assert_eq!(
            book.category_names(),
            vec![
                "Placement",
                "NPTEL",
                "HOD",
                "E-Zone",
                "Promotions",
                "Whats happening",
                "Professor",
                "Other",
            ]
        );
    }

    #[test]
    fn builtin_table_is_clean() {
        let book = RuleBook::builtin().unwrap();
        assert!(book.validate().is_empty(), "{:?}", book.validate());
    }

    #[test]
    fn builtin_priorities_and_weights() {
        let book = RuleBook::builtin().unwrap();
        assert_eq!(book.get("HOD").unwrap().priority, Priority::High);
        assert_eq!(book.get("Other").unwrap().priority, Priority::Normal);
        assert_eq!(book.category_weight("Other"), 0.5);
        assert_eq!(book.category_weight("E-Zone"), 1.5);
        assert_eq!(book.category_weight("Unlisted"), 1.0);
        assert_eq!(book.content_weights, ContentWeights::default());
    }

    #[test]
    fn professor_name_patterns_compile() {
        let book = RuleBook::builtin().unwrap();
        let professor = book.get("Professor").unwrap();
        assert_eq!(professor.name_patterns().len(), 3);
        assert!(professor.name_patterns()[0].is_match("Dr. Kanika Singla"));
    }

    #[test]
    fn missing_fields_default() {
        let book = RuleBook::from_json_str(
            r#"{"categories": [{"name": "Alerts", "primary_keywords": ["alert"]}]}"#,
        )
        .unwrap();
        let alerts = book.get("Alerts").unwrap();
        assert_eq!(alerts.priority, Priority::Normal);
        assert!(alerts.phrases.is_empty());
        assert!(alerts.patterns.exclude_domains.is_empty());
        assert_eq!(book.content_weights.subject, 2.0);
    }

    #[test]
    fn empty_table_is_rejected() {
        let err = RuleBook::from_json_str(r#"{"categories": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Empty(_)));
    }

    #[test]
    fn invalid_name_pattern_is_dropped_and_reported() {
        let book = RuleBook::from_json_str(
            r#"{"categories": [{"name": "X", "primary_keywords": ["a"], "secondary_keywords": ["b"],
                "patterns": {"name_patterns": ["(unclosed", "ok"]}}]}"#,
        )
        .unwrap();
        assert_eq!(book.get("X").unwrap().name_patterns().len(), 1);
        let warnings = book.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("invalid name pattern"));
    }

    #[test]
    fn validate_flags_weights_and_duplicates() {
        let mut book = RuleBook::default();
        let mut a = CategoryRuleSet::new("A", Priority::High);
        a.primary_keywords = vec!["x".into()];
        a.secondary_keywords = vec!["y".into()];
        book.categories = vec![a.clone(), a];
        book.category_weights.insert("Ghost".into(), 1.0);
        book.category_weights.insert("A".into(), 0.0);

        let warnings = book.validate();
        assert!(warnings.iter().any(|w| w.contains("duplicate category 'A'")));
        assert!(warnings.iter().any(|w| w.contains("unknown category 'Ghost'")));
        assert!(warnings.iter().any(|w| w.contains("non-positive weight")));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, r#"{"categories": [{"name": "Only"}]}"#).unwrap();
        let book = RuleBook::from_path(&path).unwrap();
        assert_eq!(book.category_names(), vec!["Only".to_string()]);

        let missing = RuleBook::from_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Read { .. }));
    }

    #[test]
    fn word_regex_escapes_punctuation() {
        let re = word_regex("rs.").unwrap();
        assert!(!re.is_match("rsx"));
        let re = word_regex("c++ dev").unwrap();
        assert!(re.is_match("Senior C++ Dev role"));
    }
}
