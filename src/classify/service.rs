//! Async entry point combining the rule cache with the engine.

use std::sync::Arc;

use tracing::{debug, warn};

use super::engine;
use super::keywords::{CategoryTotals, keyword_totals};
use super::types::{ClassificationDecision, EmailInput};
use crate::cache::{RuleCache, RuleSnapshot, RuleSource, StaticSource};
use crate::config::ClassifierConfig;
use crate::error::ConfigError;

/// Classifies emails against the current rule snapshot.
///
/// Cheap to share behind an `Arc`; any number of tasks may classify at once.
pub struct KeywordClassifier {
    cache: RuleCache,
    config: ClassifierConfig,
}

impl KeywordClassifier {
    pub fn new(source: Arc<dyn RuleSource>, config: ClassifierConfig) -> Self {
        Self {
            cache: RuleCache::new(source, config.cache_ttl),
            config,
        }
    }

    /// Classifier over the embedded default table.
    pub fn builtin(config: ClassifierConfig) -> crate::Result<Self> {
        let source = StaticSource::builtin()?;
        Ok(Self::new(Arc::new(source), config))
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Load the rules up front so configuration errors surface at startup.
    pub async fn warm(&self) -> crate::Result<Arc<RuleSnapshot>> {
        self.config.validate()?;
        self.config.check_ranges()?;
        Ok(self.cache.snapshot().await?)
    }

    /// Classify one email. Never fails; unavailable rules yield the fallback
    /// with method `keyword-error`.
    pub async fn classify(&self, email: &EmailInput) -> ClassificationDecision {
        match self.cache.snapshot().await {
            Ok(snapshot) => self.decide(email, &snapshot),
            Err(e) => self.unavailable(&e),
        }
    }

    /// Classify one email and report per-category keyword totals, both taken
    /// from the same rule snapshot. Totals are empty when rules are unavailable.
    pub async fn explain(&self, email: &EmailInput) -> (ClassificationDecision, Vec<CategoryTotals>) {
        match self.cache.snapshot().await {
            Ok(snapshot) => (
                self.decide(email, &snapshot),
                keyword_totals(email, &snapshot.book),
            ),
            Err(e) => (self.unavailable(&e), Vec::new()),
        }
    }

    fn decide(&self, email: &EmailInput, snapshot: &RuleSnapshot) -> ClassificationDecision {
        let decision = engine::classify(email, &snapshot.active, &snapshot.book, &self.config);
        debug!(
            label = %decision.label,
            confidence = decision.confidence,
            method = %decision.method,
            "Email classified"
        );
        decision
    }

    fn unavailable(&self, error: &ConfigError) -> ClassificationDecision {
        warn!(error = %error, "Rules unavailable, using fallback");
        let mut decision = engine::fallback(&self.config, "keyword-error");
        decision.error = Some(error.to_string());
        decision
    }

    /// Drop the cached rules; the next classification reloads them.
    pub async fn invalidate(&self) {
        self.cache.invalidate().await;
    }

    /// Swap in new rules immediately.
    pub async fn replace_rules(&self, snapshot: RuleSnapshot) {
        self.cache.replace(snapshot).await;
    }
}
