//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::{ClassifyError, ConfigError};

/// Tunables consumed by the classification engine and service.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Label returned when nothing matches confidently.
    pub fallback_category: String,
    /// Confidence attached to fallback decisions.
    pub default_confidence: f64,
    /// Best tentative matches below this are discarded in favour of the fallback.
    pub keyword_minimum_confidence: f64,
    /// Confidence for a configured sender-domain pattern hit.
    pub sender_domain_confidence: f64,
    /// Confidence for a configured sender-name or regex name-pattern hit.
    pub sender_name_confidence: f64,
    /// How long a loaded rule snapshot is served before a refresh.
    pub cache_ttl: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            fallback_category: "Other".to_string(),
            default_confidence: 0.5,
            keyword_minimum_confidence: 0.7,
            sender_domain_confidence: 0.85,
            sender_name_confidence: 0.80,
            cache_ttl: Duration::from_secs(300), // 5 minutes
        }
    }
}

impl ClassifierConfig {
    /// Defaults overridden by `INBOX_SORT_*` environment variables.
    ///
    /// Unparsable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("INBOX_SORT_FALLBACK_CATEGORY") {
            if !name.trim().is_empty() {
                config.fallback_category = name.trim().to_string();
            }
        }
        override_from_env("INBOX_SORT_DEFAULT_CONFIDENCE", &mut config.default_confidence);
        override_from_env(
            "INBOX_SORT_MIN_CONFIDENCE",
            &mut config.keyword_minimum_confidence,
        );
        override_from_env(
            "INBOX_SORT_SENDER_DOMAIN_CONFIDENCE",
            &mut config.sender_domain_confidence,
        );
        override_from_env(
            "INBOX_SORT_SENDER_NAME_CONFIDENCE",
            &mut config.sender_name_confidence,
        );

        let mut ttl_secs = config.cache_ttl.as_secs();
        override_from_env("INBOX_SORT_CACHE_TTL_SECS", &mut ttl_secs);
        config.cache_ttl = Duration::from_secs(ttl_secs);

        config
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.fallback_category.trim().is_empty() {
            return Err(ClassifyError::EmptyFallback);
        }
        Ok(())
    }

    /// Startup check that every confidence lies in `[0, 1]`.
    pub fn check_ranges(&self) -> Result<(), ConfigError> {
        let confidences = [
            ("default_confidence", self.default_confidence),
            ("keyword_minimum_confidence", self.keyword_minimum_confidence),
            ("sender_domain_confidence", self.sender_domain_confidence),
            ("sender_name_confidence", self.sender_name_confidence),
        ];
        for (key, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("{value} is outside [0, 1]"),
                });
            }
        }
        Ok(())
    }
}

fn override_from_env<T: FromStr>(key: &str, slot: &mut T) {
    let Ok(raw) = std::env::var(key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = %raw, "Ignoring unparsable environment override"),
    }
}
