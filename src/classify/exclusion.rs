//! Per-category exclusion checks.
//!
//! An excluded category is skipped outright for the email, whatever its
//! keywords or sender patterns say. Exclusion is local to the category.

use tracing::debug;

use super::sender::{extract_domain, extract_name};
use crate::rules::CategoryRuleSet;

/// Whether `rules` disqualifies its category for this email.
///
/// Checks short-circuit in a fixed order: exclusion keywords in
/// sender + subject + snippet, then excluded domains, then excluded names
/// against the display name and the raw sender.
pub fn is_excluded(from: &str, subject: &str, snippet: &str, rules: &CategoryRuleSet) -> bool {
    let haystack = format!("{from} {subject} {snippet}").to_lowercase();
    if let Some(keyword) = rules
        .exclusion_keywords
        .iter()
        .find(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()))
    {
        debug!(category = %rules.name, keyword = %keyword, "Exclusion keyword match");
        return true;
    }

    if let Some(domain) = extract_domain(from) {
        let domain = domain.to_lowercase();
        if let Some(excluded) = rules
            .patterns
            .exclude_domains
            .iter()
            .find(|d| !d.is_empty() && domain.contains(&d.to_lowercase()))
        {
            debug!(category = %rules.name, domain = %domain, excluded = %excluded, "Domain exclusion match");
            return true;
        }
    }

    let name = extract_name(from).map(|n| n.to_lowercase());
    let from_lower = from.to_lowercase();
    for excluded in &rules.patterns.exclude_names {
        let needle = excluded.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        let by_name = name.as_deref().is_some_and(|n| n.contains(&needle));
        if by_name || from_lower.contains(&needle) {
            debug!(category = %rules.name, sender = %from, excluded = %excluded, "Sender exclusion match");
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Priority;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn make_rules() -> CategoryRuleSet {
        let mut rules = CategoryRuleSet::new("Professor", Priority::High);
        rules.exclusion_keywords = strings(&["special offer", "Promotions via"]);
        rules.patterns.exclude_domains = strings(&["openai.com"]);
        rules.patterns.exclude_names = strings(&["HOD", "'What's Happening' via"]);
        rules
    }

    #[test]
    fn keyword_in_subject_excludes() {
        assert!(is_excluded("a@b.c", "A Special Offer for you", "", &make_rules()));
    }

    #[test]
    fn keyword_in_sender_excludes() {
        assert!(is_excluded("'Promotions' via UG <ug@x.in>", "Hi", "", &make_rules()));
    }

    #[test]
    fn keyword_in_snippet_excludes() {
        assert!(is_excluded("a@b.c", "Hi", "today only: special offer", &make_rules()));
    }

    #[test]
    fn domain_containing_entry_excludes() {
        assert!(is_excluded("noreply@email.openai.com", "", "", &make_rules()));
        assert!(!is_excluded("noreply@openai.org", "", "", &make_rules()));
    }

    #[test]
    fn name_or_raw_sender_excludes() {
        assert!(is_excluded("HOD CSE <x@sharda.ac.in>", "", "", &make_rules()));
        assert!(is_excluded("hod.cse@sharda.ac.in", "", "", &make_rules()));
        assert!(is_excluded(
            "'What's Happening' via Batch <b@ug.sharda.ac.in>",
            "",
            "",
            &make_rules()
        ));
    }

    #[test]
    fn unrelated_sender_is_not_excluded() {
        assert!(!is_excluded(
            "Dr. Nishant Gupta <nishant.gupta@sharda.ac.in>",
            "Lab session reschedule",
            "",
            &make_rules()
        ));
    }

    #[test]
    fn empty_rules_exclude_nothing() {
        let rules = CategoryRuleSet::new("Open", Priority::Normal);
        assert!(!is_excluded("anyone@anywhere.com", "anything", "", &rules));
    }
}
