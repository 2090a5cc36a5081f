//! Rule-based email classification.
//!
//! Every email flows through `engine::classify()`:
//! 1. Subject identity keywords (`profiles`) decide a category outright
//! 2. Category sender overrides (`sender`, `profiles`)
//! 3. Per-category exclusion, sender and body keyword checks (`exclusion`,
//!    `sender`, `keywords`) in tier order
//! 4. Best tentative match, or the fallback label
//!
//! **No learned models.** Every decision is traceable to a configured rule.

pub mod engine;
pub mod exclusion;
pub mod keywords;
pub mod profiles;
pub mod sender;
pub mod service;
pub mod types;

pub use engine::classify;
pub use service::KeywordClassifier;
pub use types::{ClassificationDecision, EmailInput};
