//! Classification orchestrator.
//!
//! A single linear pipeline per email with early returns:
//! 1. Subject identity keyword → that category at 0.98.
//! 2. Category sender override (Professor) → that category.
//! 3. Order categories by tier, then by high-tier rank.
//! 4. Per category: skip if excluded; return on a sender match ≥ 0.90;
//!    otherwise collect sender and body-keyword candidates.
//! 5. No candidates → fallback (or the ServiceNow catch-all).
//! 6. Pick the best candidate, rejecting it below the minimum confidence.
//!
//! Pure computation over borrowed, immutable inputs: safe to call from any
//! number of threads at once.

use tracing::{debug, warn};

use super::exclusion::is_excluded;
use super::keywords::match_weighted;
use super::profiles::{self, is_service_now_domain};
use super::sender::{SenderContext, extract_domain, match_sender_patterns};
use super::types::{ClassificationDecision, EmailInput, SenderMatch};
use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::rules::{CategoryRuleSet, Priority, RuleBook};

/// Confidence of a subject identity-keyword decision.
pub const SUBJECT_KEYWORD_CONFIDENCE: f64 = 0.98;
/// Sender matches at or above this return immediately from the category loop.
pub const SENDER_SHORT_CIRCUIT: f64 = 0.90;

const SCORE_NORMALIZER: f64 = 10.0;
const KEYWORD_CONFIDENCE_FLOOR: f64 = 0.75;
const KEYWORD_CONFIDENCE_CEILING: f64 = 0.90;
const SERVICE_NOW_CONFIDENCE: f64 = 0.90;
/// Candidates this close to the best are decided in favour of sender matches.
const TIE_TOLERANCE: f64 = 0.05;

/// Classify one email. Never fails: configuration problems produce the
/// fallback decision with method `keyword-error`.
pub fn classify(
    email: &EmailInput,
    active: &[String],
    book: &RuleBook,
    config: &ClassifierConfig,
) -> ClassificationDecision {
    match try_classify(email, active, book, config) {
        Ok(decision) => decision,
        Err(e) => {
            warn!(error = %e, subject = %email.subject, "Classification failed, using fallback");
            let mut decision = fallback(config, "keyword-error");
            decision.error = Some(e.to_string());
            decision
        }
    }
}

/// The pipeline itself, surfacing configuration errors.
pub fn try_classify(
    email: &EmailInput,
    active: &[String],
    book: &RuleBook,
    config: &ClassifierConfig,
) -> Result<ClassificationDecision, ClassifyError> {
    config.validate()?;
    check_weights(active, book)?;

    // Active names without a rule set (e.g. an "All" meta category) are ignored.
    let categories: Vec<&CategoryRuleSet> =
        active.iter().filter_map(|name| book.get(name)).collect();
    if categories.is_empty() {
        return Ok(fallback(config, "keyword-default"));
    }

    if let Some(decision) = subject_keyword_decision(email, &categories) {
        return Ok(decision);
    }

    if let Some(decision) = sender_override_decision(email, &categories, config) {
        return Ok(decision);
    }

    let ordered = evaluation_order(&email.from, categories);
    let mut candidates = Vec::new();

    for rules in ordered {
        if is_excluded(&email.from, &email.subject, &email.snippet, rules) {
            debug!(category = %rules.name, subject = %email.subject, "Category excluded");
            continue;
        }

        if let Some(sender) = match_sender_patterns(&email.from, rules, config) {
            if sender.confidence >= SENDER_SHORT_CIRCUIT {
                debug!(
                    category = %rules.name,
                    confidence = sender.confidence,
                    "High-confidence sender match"
                );
                return Ok(sender_decision(sender));
            }
            candidates.push(Candidate::from_sender(sender));
        }

        // Subject and snippet were spent on the identity check; only the body is scored.
        let scored = match_weighted("", "", &email.body, rules, &book.content_weights);
        if scored.score > 0.0 {
            let weighted = scored.score * book.category_weight(&rules.name);
            let confidence = round2(
                (weighted / SCORE_NORMALIZER)
                    .min(KEYWORD_CONFIDENCE_CEILING)
                    .max(KEYWORD_CONFIDENCE_FLOOR),
            );
            debug!(
                category = %rules.name,
                score = scored.score,
                confidence,
                "Body keyword match"
            );
            let method = if scored.matched_phrases.is_empty() {
                "body-keyword"
            } else {
                "body-keyword+phrase"
            };
            candidates.push(Candidate {
                category: rules.name.clone(),
                confidence,
                method: method.to_string(),
                from_sender: false,
                matched_pattern: None,
                matched_value: None,
                matched_keywords: scored.matched_keywords,
                matched_phrases: scored.matched_phrases,
                keyword_score: Some(scored.score),
            });
        }
    }

    let Some(best) = select_best(candidates) else {
        let service_now = extract_domain(&email.from)
            .is_some_and(|d| is_service_now_domain(&d.to_lowercase()));
        if service_now {
            return Ok(ClassificationDecision::bare(
                config.fallback_category.clone(),
                SERVICE_NOW_CONFIDENCE,
                "keyword-service-now-other",
            ));
        }
        return Ok(fallback(config, "keyword-no-match"));
    };

    if best.confidence < config.keyword_minimum_confidence {
        debug!(
            category = %best.category,
            confidence = best.confidence,
            "Best match below minimum confidence"
        );
        return Ok(fallback(config, "keyword-low-confidence-fallback"));
    }

    Ok(ClassificationDecision {
        label: best.category,
        confidence: clamp_unit(best.confidence),
        method: format!("keyword-{}", best.method),
        matched_pattern: best.matched_pattern,
        matched_value: best.matched_value,
        matched_keywords: best.matched_keywords,
        matched_phrases: best.matched_phrases,
        keyword_score: best.keyword_score,
        error: None,
    })
}

/// Step 1: an identity keyword in the subject decides the category.
fn subject_keyword_decision(
    email: &EmailInput,
    categories: &[&CategoryRuleSet],
) -> Option<ClassificationDecision> {
    for rules in categories {
        let Some(profile) = profiles::profile(&rules.name) else {
            continue;
        };
        let Some(keyword) = profile.subject_mentions(&email.subject) else {
            continue;
        };
        if is_excluded(&email.from, &email.subject, &email.snippet, rules) {
            debug!(category = %rules.name, keyword, "Subject keyword match excluded");
            continue;
        }

        debug!(category = %rules.name, keyword, "Subject category keyword match");
        let mut decision = ClassificationDecision::bare(
            rules.name.clone(),
            SUBJECT_KEYWORD_CONFIDENCE,
            "subject-category-keyword",
        );
        decision.matched_pattern = Some(format!("Subject contains \"{}\" keyword", rules.name));
        decision.matched_value = Some(email.subject.clone());
        return Some(decision);
    }
    None
}

/// Step 2: categories whose profile carries a sender override.
fn sender_override_decision(
    email: &EmailInput,
    categories: &[&CategoryRuleSet],
    config: &ClassifierConfig,
) -> Option<ClassificationDecision> {
    for rules in categories {
        let Some(threshold) = profiles::profile(&rules.name).and_then(|p| p.sender_override)
        else {
            continue;
        };
        let Some(sender) = match_sender_patterns(&email.from, rules, config) else {
            continue;
        };
        if sender.confidence < threshold {
            continue;
        }
        if is_excluded(&email.from, &email.subject, &email.snippet, rules) {
            debug!(category = %rules.name, "Sender override excluded");
            continue;
        }

        debug!(
            category = %rules.name,
            confidence = sender.confidence,
            "Sender override match"
        );
        return Some(sender_decision(sender));
    }
    None
}

/// Step 3: high → normal → low, with the high tier ranked by sender signals.
/// Stable, so equal keys keep the active-list order.
fn evaluation_order<'a>(from: &str, categories: Vec<&'a CategoryRuleSet>) -> Vec<&'a CategoryRuleSet> {
    let sender = SenderContext::new(from);
    let mut keyed: Vec<((u32, u32), &CategoryRuleSet)> = categories
        .into_iter()
        .map(|rules| {
            let rank = match rules.priority {
                Priority::High => profiles::high_tier_rank(&rules.name, &sender),
                Priority::Normal | Priority::Low => 0,
            };
            ((rules.priority.rank(), rank), rules)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, rules)| rules).collect()
}

/// A tentative per-category result awaiting final selection.
#[derive(Debug, Clone)]
struct Candidate {
    category: String,
    confidence: f64,
    method: String,
    from_sender: bool,
    matched_pattern: Option<String>,
    matched_value: Option<String>,
    matched_keywords: Vec<String>,
    matched_phrases: Vec<String>,
    keyword_score: Option<f64>,
}

impl Candidate {
    fn from_sender(sender: SenderMatch) -> Self {
        Self {
            category: sender.category,
            confidence: sender.confidence,
            method: sender.method.label().to_string(),
            from_sender: true,
            matched_pattern: Some(sender.matched_pattern),
            matched_value: Some(sender.matched_value),
            matched_keywords: Vec::new(),
            matched_phrases: Vec::new(),
            keyword_score: None,
        }
    }
}

/// Highest confidence wins (earliest on exact ties). A sender-derived
/// candidate within the tie tolerance of a keyword winner takes its place.
fn select_best(candidates: Vec<Candidate>) -> Option<Candidate> {
    let mut top: Option<usize> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        if top.is_none_or(|t| candidate.confidence > candidates[t].confidence) {
            top = Some(i);
        }
    }
    let mut best = top?;

    if !candidates[best].from_sender {
        let floor = candidates[best].confidence - TIE_TOLERANCE - f64::EPSILON * 8.0;
        let mut sender_best: Option<usize> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            if !candidate.from_sender || candidate.confidence < floor {
                continue;
            }
            if sender_best.is_none_or(|s| candidate.confidence > candidates[s].confidence) {
                sender_best = Some(i);
            }
        }
        if let Some(s) = sender_best {
            best = s;
        }
    }

    candidates.into_iter().nth(best)
}

fn sender_decision(sender: SenderMatch) -> ClassificationDecision {
    let mut decision = ClassificationDecision::bare(
        sender.category,
        clamp_unit(sender.confidence),
        format!("sender-{}", sender.method.label()),
    );
    decision.matched_pattern = Some(sender.matched_pattern);
    decision.matched_value = Some(sender.matched_value);
    decision
}

/// The configured fallback label at the configured default confidence.
pub fn fallback(config: &ClassifierConfig, method: &str) -> ClassificationDecision {
    ClassificationDecision::bare(
        config.fallback_category.clone(),
        clamp_unit(config.default_confidence),
        method,
    )
}

fn check_weights(active: &[String], book: &RuleBook) -> Result<(), ClassifyError> {
    for (field, weight) in book.content_weights.entries() {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ClassifyError::InvalidContentWeight { field, weight });
        }
    }
    for name in active {
        let weight = book.category_weight(name);
        if !weight.is_finite() || weight < 0.0 {
            return Err(ClassifyError::InvalidCategoryWeight {
                category: name.clone(),
                weight,
            });
        }
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
