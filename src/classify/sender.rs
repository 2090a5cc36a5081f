//! Sender pattern matching and plain term counting.
//!
//! "From" parsing is permissive and never fails; it is not an RFC 5322 parser.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::profiles;
use super::types::{SenderMatch, SenderMethod, TermCount};
use crate::config::ClassifierConfig;
use crate::rules::{CategoryRuleSet, word_regex};

static ANGLE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(.+?)>").unwrap());

static PAREN_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(([^)]*(?:Assistant|Associate)?\s*(?:Professor|Faculty|Prof\.).*?)\)")
        .unwrap()
});

static DR_FULL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(Dr\.)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)").unwrap()
});

static PROFESSOR_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Assistant|Associate)?\s*(?:Professor|Prof\.|Faculty)").unwrap()
});

static DR_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Dr\.").unwrap());

/// Domain part of a sender, from `Name <addr@domain>` or bare `addr@domain`.
pub fn extract_domain(from: &str) -> Option<String> {
    if from.is_empty() {
        return None;
    }
    let address = ANGLE_ADDRESS
        .captures(from)
        .and_then(|c| c.get(1))
        .map_or(from, |m| m.as_str());
    let (_, domain) = address.split_once('@')?;
    let domain = domain.lines().next().unwrap_or_default().trim();
    (!domain.is_empty()).then(|| domain.to_string())
}

/// Display name of a sender: text before `<`, or before `@` without brackets.
pub fn extract_name(from: &str) -> Option<String> {
    if from.is_empty() {
        return None;
    }
    let name = match from.split_once('<') {
        Some((before, _)) if !before.is_empty() => before,
        _ => from.split('@').next().unwrap_or_default(),
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Case-insensitive exact domain match, or anchored `*` wildcard match.
pub fn domain_matches(domain: &str, pattern: &str) -> bool {
    if domain.is_empty() || pattern.is_empty() {
        return false;
    }
    if domain.to_lowercase() == pattern.to_lowercase() {
        return true;
    }
    if !pattern.contains('*') {
        return false;
    }

    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    match RegexBuilder::new(&format!("^{body}$"))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.is_match(domain),
        Err(e) => {
            debug!(pattern, error = %e, "Unusable domain pattern");
            false
        }
    }
}

/// Case-insensitive substring containment.
pub fn name_matches(name: &str, pattern: &str) -> bool {
    if name.is_empty() || pattern.is_empty() {
        return false;
    }
    name.to_lowercase().contains(&pattern.to_lowercase())
}

/// Pre-lowercased views of a sender used by the heuristic checks.
#[derive(Debug, Clone)]
pub struct SenderContext<'a> {
    pub raw: &'a str,
    pub lower: String,
    /// Lowercased display name, empty when none.
    pub name: String,
    /// Lowercased domain, empty when none.
    pub domain: String,
}

impl<'a> SenderContext<'a> {
    pub fn new(from: &'a str) -> Self {
        Self {
            raw: from,
            lower: from.to_lowercase(),
            name: extract_name(from).unwrap_or_default().to_lowercase(),
            domain: extract_domain(from).unwrap_or_default().to_lowercase(),
        }
    }
}

/// Title found in a sender string by [`extract_professor_title`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfessorTitle {
    pub title: String,
    pub name: String,
}

/// Detect academic titles such as `Dr. Jane Doe (CSE Associate Professor)`.
///
/// Checked in order: a parenthesised professor/faculty title, `Dr. First Last`,
/// professor/faculty anywhere, then `Dr.` anywhere.
pub fn extract_professor_title(from: &str) -> Option<ProfessorTitle> {
    if from.is_empty() {
        return None;
    }

    if let Some(caps) = PAREN_TITLE.captures(from) {
        let title = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
        let before = from
            .split(['(', '<'])
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let name = match before {
            Some(name) => name.to_string(),
            None => extract_name(from).unwrap_or_default(),
        };
        return Some(ProfessorTitle { title, name });
    }

    if let Some(caps) = DR_FULL_NAME.captures(from) {
        return Some(ProfessorTitle {
            title: caps[1].to_string(),
            name: caps[2].to_string(),
        });
    }

    if PROFESSOR_WORD.is_match(from) {
        return Some(ProfessorTitle {
            title: "Professor".into(),
            name: extract_name(from).unwrap_or_default(),
        });
    }

    if DR_ANYWHERE.is_match(from) {
        return Some(ProfessorTitle {
            title: "Dr.".into(),
            name: extract_name(from).unwrap_or_default(),
        });
    }

    None
}

/// Affirmative identity from the hard-coded per-category sender table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecificSender {
    pub confidence: f64,
    pub pattern: &'static str,
}

/// Consult the category's hard-coded sender heuristics.
///
/// Returns `None` for non-matches and for categories without heuristics; this
/// never expresses exclusion.
pub fn match_specific_sender(from: &str, category: &str) -> Option<SpecificSender> {
    if from.is_empty() {
        return None;
    }
    let profile = profiles::profile(category)?;
    let sender = SenderContext::new(from);
    profile.match_sender(&sender)
}

/// Sender-derived match for one category.
///
/// Checked in order: specific-sender heuristics, configured regex name
/// patterns, sender-domain patterns, then sender-name patterns. The first hit wins.
/// Regex name patterns score like sender names, so they only ever produce a
/// tentative match.
pub fn match_sender_patterns(
    from: &str,
    rules: &CategoryRuleSet,
    config: &ClassifierConfig,
) -> Option<SenderMatch> {
    if from.is_empty() {
        return None;
    }

    if let Some(specific) = match_specific_sender(from, &rules.name) {
        return Some(SenderMatch {
            category: rules.name.clone(),
            confidence: specific.confidence,
            method: SenderMethod::SpecificSender,
            matched_pattern: specific.pattern.to_string(),
            matched_value: from.to_string(),
        });
    }

    if let Some(re) = rules.name_patterns().iter().find(|re| re.is_match(from)) {
        return Some(SenderMatch {
            category: rules.name.clone(),
            confidence: config.sender_name_confidence,
            method: SenderMethod::NamePattern,
            matched_pattern: re.as_str().to_string(),
            matched_value: from.to_string(),
        });
    }

    if let Some(domain) = extract_domain(from) {
        if let Some(pattern) = rules
            .patterns
            .sender_domains
            .iter()
            .find(|p| domain_matches(&domain, p))
        {
            return Some(SenderMatch {
                category: rules.name.clone(),
                confidence: config.sender_domain_confidence,
                method: SenderMethod::SenderDomain,
                matched_pattern: pattern.clone(),
                matched_value: domain,
            });
        }
    }

    if let Some(name) = extract_name(from) {
        if let Some(pattern) = rules
            .patterns
            .sender_names
            .iter()
            .find(|p| name_matches(&name, p))
        {
            return Some(SenderMatch {
                category: rules.name.clone(),
                confidence: config.sender_name_confidence,
                method: SenderMethod::SenderName,
                matched_pattern: pattern.clone(),
                matched_value: name,
            });
        }
    }

    None
}

/// Count case-insensitive substring occurrences of each phrase.
///
/// Phrases are literal and not word-bounded; each occurrence scores 2.5.
pub fn match_phrases(text: &str, phrases: &[String]) -> TermCount {
    let mut result = TermCount::default();
    if text.is_empty() || phrases.is_empty() {
        return result;
    }

    let lower = text.to_lowercase();
    for phrase in phrases {
        let needle = phrase.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let hits = lower.matches(needle.as_str()).count();
        if hits > 0 {
            result.matched.push(phrase.clone());
            result.score += hits as f64 * 2.5;
        }
    }
    result.count = result.matched.len();
    result
}

/// Unweighted word-bounded keyword totals.
///
/// Each occurrence scores 1, or 1.5 for keywords longer than five characters.
pub fn count_keyword_matches(text: &str, keywords: &[String]) -> TermCount {
    let mut result = TermCount::default();
    if text.is_empty() || keywords.is_empty() {
        return result;
    }

    let lower = text.to_lowercase();
    for keyword in keywords {
        let Some(re) = word_regex(keyword) else {
            continue;
        };
        let hits = re.find_iter(&lower).count();
        if hits > 0 {
            let per_hit = if keyword.chars().count() > 5 { 1.5 } else { 1.0 };
            result.matched.push(keyword.clone());
            result.score += hits as f64 * per_hit;
        }
    }
    result.count = result.matched.len();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Priority;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    // ── extraction ──────────────────────────────────────────────

    #[test]
    fn extract_domain_from_angle_address() {
        assert_eq!(
            extract_domain("HOD CSE <hod.cse@sharda.ac.in>").as_deref(),
            Some("sharda.ac.in")
        );
    }

    #[test]
    fn extract_domain_from_bare_address() {
        assert_eq!(
            extract_domain("noreply@email.openai.com").as_deref(),
            Some("email.openai.com")
        );
    }

    #[test]
    fn extract_domain_without_at_is_none() {
        assert_eq!(extract_domain("Just A Name"), None);
        assert_eq!(extract_domain(""), None);
    }

    #[test]
    fn extract_name_variants() {
        assert_eq!(
            extract_name("Dr. Nishant Gupta <nishant.gupta@sharda.ac.in>").as_deref(),
            Some("Dr. Nishant Gupta")
        );
        assert_eq!(extract_name("hod.cse@sharda.ac.in").as_deref(), Some("hod.cse"));
        assert_eq!(extract_name(""), None);
    }

    // ── pattern tests ───────────────────────────────────────────

    #[test]
    fn domain_exact_match_is_case_insensitive() {
        assert!(domain_matches("Sharda.AC.in", "sharda.ac.in"));
        assert!(!domain_matches("cse.sharda.ac.in", "sharda.ac.in"));
    }

    #[test]
    fn domain_wildcard_match() {
        assert!(domain_matches("cse.sharda.ac.in", "*.sharda.ac.in"));
        assert!(!domain_matches("shardaxac.in", "*.sharda.ac.in"));
        assert!(!domain_matches("sharda.ac.in.evil.com", "*.sharda.ac.in"));
    }

    #[test]
    fn domain_wildcard_with_regex_syntax_is_literal() {
        assert!(!domain_matches("abc", "a(b*"));
        assert!(domain_matches("a(bzzz", "a(b*"));
    }

    #[test]
    fn name_substring_match() {
        assert!(name_matches("SU Placement Cell", "placement cell"));
        assert!(!name_matches("", "placement"));
    }

    // ── professor titles ────────────────────────────────────────

    #[test]
    fn professor_title_in_parentheses() {
        let title =
            extract_professor_title("Dr. Nishant Gupta (CSE Associate Professor) <n@sharda.ac.in>")
                .unwrap();
        assert_eq!(title.title, "CSE Associate Professor");
        assert_eq!(title.name, "Dr. Nishant Gupta");
    }

    #[test]
    fn professor_title_dr_full_name() {
        let title = extract_professor_title("Dr. Kanika Singla <k@x.com>").unwrap();
        assert_eq!(title.title, "Dr.");
        assert_eq!(title.name, "Kanika Singla");
    }

    #[test]
    fn professor_title_word_anywhere() {
        let title = extract_professor_title("Faculty Office <office@x.com>").unwrap();
        assert_eq!(title.title, "Professor");
        assert_eq!(title.name, "Faculty Office");
    }

    #[test]
    fn professor_title_absent() {
        assert!(extract_professor_title("HOD CSE <hod.cse@sharda.ac.in>").is_none());
        assert!(extract_professor_title("noreply@github.com").is_none());
    }

    // ── specific senders ────────────────────────────────────────

    #[test]
    fn specific_sender_hod_domain() {
        let hit = match_specific_sender("Office <a@hod.cse.sharda.ac.in>", "HOD").unwrap();
        assert_eq!(hit.confidence, 0.98);
        assert_eq!(hit.pattern, "HOD domain");
    }

    #[test]
    fn specific_sender_hod_name() {
        let hit = match_specific_sender("HOD CSE <hod.cse@sharda.ac.in>", "HOD").unwrap();
        assert_eq!(hit.confidence, 0.95);
    }

    #[test]
    fn specific_sender_nptel() {
        let hit = match_specific_sender("NPTEL <onlinecourses@nptel.iitm.ac.in>", "NPTEL").unwrap();
        assert_eq!(hit.confidence, 0.95);
    }

    #[test]
    fn specific_sender_professor_tiers() {
        let named = match_specific_sender("Kapil Kumar <kapil.kumar@sharda.ac.in>", "Professor")
            .unwrap();
        assert_eq!(named.confidence, 0.95);

        let titled = match_specific_sender("Dr. Jane Roe <jane@gmail.com>", "Professor").unwrap();
        assert_eq!(titled.confidence, 0.92);
    }

    #[test]
    fn specific_sender_other_services() {
        for from in [
            "noreply@email.openai.com",
            "ServiceNow <no-reply@signonmail.servicenow.com>",
            "GitHub <noreply@github.com>",
        ] {
            let hit = match_specific_sender(from, "Other").unwrap();
            assert_eq!(hit.confidence, 0.95, "{from}");
        }
    }

    #[test]
    fn specific_sender_only_consults_named_category() {
        assert!(match_specific_sender("noreply@email.openai.com", "HOD").is_none());
        assert!(match_specific_sender("noreply@email.openai.com", "Unknown").is_none());
    }

    // ── sender pattern lookup ───────────────────────────────────

    #[test]
    fn sender_patterns_fall_back_to_configured_lists() {
        let mut rules = CategoryRuleSet::new("Jobs", Priority::Normal);
        rules.patterns.sender_domains = strings(&["*.naukri.com"]);
        rules.patterns.sender_names = strings(&["Talent Team"]);
        let config = ClassifierConfig::default();

        let by_domain = match_sender_patterns("alerts@mail.naukri.com", &rules, &config).unwrap();
        assert_eq!(by_domain.method, SenderMethod::SenderDomain);
        assert_eq!(by_domain.confidence, config.sender_domain_confidence);
        assert_eq!(by_domain.matched_value, "mail.naukri.com");

        let by_name =
            match_sender_patterns("Acme Talent Team <hr@acme.io>", &rules, &config).unwrap();
        assert_eq!(by_name.method, SenderMethod::SenderName);
        assert_eq!(by_name.confidence, config.sender_name_confidence);

        assert!(match_sender_patterns("x@y.z", &rules, &config).is_none());
    }

    #[test]
    fn sender_patterns_use_name_regexes() {
        let mut rules = CategoryRuleSet::new("Staff", Priority::Normal);
        rules.patterns.name_patterns = strings(&[r"(?i)\bwarden\b"]);
        let config = ClassifierConfig::default();
        let hit = match_sender_patterns("Hostel Warden <w@campus.edu>", &rules, &config).unwrap();
        assert_eq!(hit.method, SenderMethod::NamePattern);
        assert_eq!(hit.confidence, config.sender_name_confidence);
    }

    #[test]
    fn builtin_professor_patterns_stay_below_override() {
        let book = crate::rules::RuleBook::builtin().unwrap();
        let professor = book.get("Professor").unwrap();
        let config = ClassifierConfig::default();
        let hit = match_sender_patterns(
            "Training and Placement (Associate Dean Office) <tpo@sharda.ac.in>",
            professor,
            &config,
        )
        .unwrap();
        assert_eq!(hit.method, SenderMethod::NamePattern);
        assert!(hit.confidence < 0.88);
    }

    // ── counting ────────────────────────────────────────────────

    #[test]
    fn phrases_count_substring_occurrences() {
        let result = match_phrases(
            "Apply now! Really, APPLY NOW before Friday.",
            &strings(&["apply now", "walk-in"]),
        );
        assert_eq!(result.count, 1);
        assert_eq!(result.matched, vec!["apply now"]);
        assert_eq!(result.score, 5.0);
    }

    #[test]
    fn phrases_are_not_word_bounded() {
        let result = match_phrases("reapply nowhere", &strings(&["apply now"]));
        assert_eq!(result.count, 1);
    }

    #[test]
    fn phrases_with_regex_characters_are_literal() {
        let result = match_phrases("flat 50% discount (today)", &strings(&["50% discount (today)"]));
        assert_eq!(result.count, 1);
        assert!(match_phrases("50x discount", &strings(&["50. discount"])).matched.is_empty());
    }

    #[test]
    fn keyword_counts_are_word_bounded_and_length_weighted() {
        let result = count_keyword_matches(
            "Interview today. Second interview tomorrow. Bring your CV.",
            &strings(&["interview", "cv", "view"]),
        );
        assert_eq!(result.matched, vec!["interview", "cv"]);
        assert_eq!(result.score, 2.0 * 1.5 + 1.0);
    }

    #[test]
    fn counting_empty_inputs() {
        assert_eq!(count_keyword_matches("", &strings(&["a"])), TermCount::default());
        assert_eq!(match_phrases("text", &[]), TermCount::default());
    }
}
