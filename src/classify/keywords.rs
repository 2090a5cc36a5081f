//! Weighted keyword scoring.
//!
//! Each keyword is tested independently against subject, snippet and body on
//! word boundaries. Every field it occurs in contributes
//! `occurrences × tier weight × field weight`, so a term present in two fields
//! counts twice. Phrases are scored once against the concatenated text.

use regex::Regex;

use super::sender::{count_keyword_matches, match_phrases};
use super::types::{EmailInput, MatchResult, TermCount};
use crate::rules::{CategoryRuleSet, ContentWeights, RuleBook};

/// Score one category's keywords and phrases against an email's text fields.
pub fn match_weighted(
    subject: &str,
    snippet: &str,
    body: &str,
    rules: &CategoryRuleSet,
    weights: &ContentWeights,
) -> MatchResult {
    let fields = [
        (subject.to_lowercase(), weights.subject),
        (snippet.to_lowercase(), weights.snippet),
        (body.to_lowercase(), weights.body),
    ];
    let compiled = rules.compiled();

    let mut result = MatchResult::default();
    let tiers = [
        (&rules.primary_keywords, &compiled.primary, weights.primary_keyword),
        (&rules.secondary_keywords, &compiled.secondary, weights.secondary_keyword),
    ];
    for (keywords, regexes, tier_weight) in tiers {
        for (keyword, regex) in keywords.iter().zip(regexes) {
            let Some(regex) = regex else {
                continue;
            };
            if let Some(score) = score_keyword(regex, &fields, tier_weight) {
                result.matched_keywords.push(keyword.clone());
                result.score += score;
            }
        }
    }

    let combined = format!("{subject} {snippet} {body}");
    let phrases = match_phrases(&combined, &rules.phrases);
    if phrases.count > 0 {
        result.score += phrases.score * weights.phrase;
        result.matched_phrases = phrases.matched;
    }

    result.match_count = result.matched_keywords.len() + result.matched_phrases.len();
    result
}

/// Weighted contribution of one keyword across all fields, `None` if absent everywhere.
fn score_keyword(regex: &Regex, fields: &[(String, f64)], tier_weight: f64) -> Option<f64> {
    let mut score = 0.0;
    let mut matched = false;
    for (text, field_weight) in fields {
        if text.is_empty() {
            continue;
        }
        let hits = regex.find_iter(text).count();
        if hits > 0 {
            score += hits as f64 * tier_weight * field_weight;
            matched = true;
        }
    }
    matched.then_some(score)
}

/// Unweighted per-category totals, for diagnostics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CategoryTotals {
    pub category: String,
    pub keywords: TermCount,
    pub phrases: TermCount,
}

/// Plain keyword and phrase totals for every category over the whole email,
/// without field or tier weighting.
pub fn keyword_totals(email: &EmailInput, book: &RuleBook) -> Vec<CategoryTotals> {
    let text = format!("{} {} {}", email.subject, email.snippet, email.body);
    book.categories
        .iter()
        .map(|rules| {
            let all_keywords: Vec<String> = rules
                .primary_keywords
                .iter()
                .chain(&rules.secondary_keywords)
                .cloned()
                .collect();
            CategoryTotals {
                category: rules.name.clone(),
                keywords: count_keyword_matches(&text, &all_keywords),
                phrases: match_phrases(&text, &rules.phrases),
            }
        })
        .collect()
}
