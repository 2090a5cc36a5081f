//! TTL cache of rule snapshots.
//!
//! Readers get an `Arc<RuleSnapshot>` and keep using it for a whole
//! classification; a refresh swaps in a new snapshot without touching the
//! ones already handed out.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::rules::RuleBook;

/// Active categories (in evaluation order) plus the rules behind them.
#[derive(Debug, Clone)]
pub struct RuleSnapshot {
    pub active: Vec<String>,
    pub book: RuleBook,
    pub loaded_at: DateTime<Utc>,
}

impl RuleSnapshot {
    pub fn new(active: Vec<String>, book: RuleBook) -> Self {
        Self {
            active,
            book,
            loaded_at: Utc::now(),
        }
    }

    /// Every category in the book is active, in declaration order.
    pub fn from_book(book: RuleBook) -> Self {
        Self::new(book.category_names(), book)
    }
}

/// Where rule snapshots come from.
#[async_trait]
pub trait RuleSource: Send + Sync {
    /// Source name for logs (e.g. "builtin", a file path).
    fn name(&self) -> &str;

    /// Build a fresh snapshot.
    async fn load(&self) -> Result<RuleSnapshot, ConfigError>;
}

/// A fixed rule book, e.g. the built-in table.
pub struct StaticSource {
    active: Vec<String>,
    book: RuleBook,
}

impl StaticSource {
    pub fn new(active: Vec<String>, book: RuleBook) -> Self {
        Self { active, book }
    }

    /// The embedded default table with every category active.
    pub fn builtin() -> Result<Self, ConfigError> {
        let book = RuleBook::builtin()?;
        Ok(Self::new(book.category_names(), book))
    }
}

#[async_trait]
impl RuleSource for StaticSource {
    fn name(&self) -> &str {
        "builtin"
    }

    async fn load(&self) -> Result<RuleSnapshot, ConfigError> {
        Ok(RuleSnapshot::new(self.active.clone(), self.book.clone()))
    }
}

/// A rule file re-read on every refresh.
pub struct FileSource {
    path: PathBuf,
    label: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }
}

#[async_trait]
impl RuleSource for FileSource {
    fn name(&self) -> &str {
        &self.label
    }

    async fn load(&self) -> Result<RuleSnapshot, ConfigError> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ConfigError::Read {
                path: self.path.clone(),
                source,
            })?;
        let book = RuleBook::from_json_str(&json)?;
        Ok(RuleSnapshot::from_book(book))
    }
}

struct Slot {
    snapshot: Arc<RuleSnapshot>,
    fetched: Instant,
    stale: bool,
}

impl Slot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        !self.stale && self.fetched.elapsed() < ttl
    }
}

/// Rule snapshots from a [`RuleSource`], reloaded once older than the TTL.
pub struct RuleCache {
    source: Arc<dyn RuleSource>,
    ttl: Duration,
    slot: RwLock<Option<Slot>>,
}

impl RuleCache {
    pub fn new(source: Arc<dyn RuleSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: RwLock::new(None),
        }
    }

    /// Current snapshot, refreshing it first when expired.
    ///
    /// A failed refresh keeps serving the previous snapshot; the error is only
    /// returned when nothing has been loaded yet.
    pub async fn snapshot(&self) -> Result<Arc<RuleSnapshot>, ConfigError> {
        {
            let slot = self.slot.read().await;
            if let Some(current) = slot.as_ref()
                && current.is_fresh(self.ttl)
            {
                return Ok(current.snapshot.clone());
            }
        }

        let mut slot = self.slot.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(current) = slot.as_ref()
            && current.is_fresh(self.ttl)
        {
            return Ok(current.snapshot.clone());
        }

        match self.source.load().await {
            Ok(snapshot) => {
                info!(
                    source = %self.source.name(),
                    categories = snapshot.active.len(),
                    "Loaded rule snapshot"
                );
                let snapshot = Arc::new(snapshot);
                *slot = Some(Slot {
                    snapshot: snapshot.clone(),
                    fetched: Instant::now(),
                    stale: false,
                });
                Ok(snapshot)
            }
            Err(e) => match slot.as_mut() {
                Some(current) => {
                    warn!(
                        source = %self.source.name(),
                        error = %e,
                        "Rule refresh failed, serving previous snapshot"
                    );
                    current.fetched = Instant::now();
                    current.stale = false;
                    Ok(current.snapshot.clone())
                }
                None => Err(e),
            },
        }
    }

    /// Force the next read to reload from the source.
    pub async fn invalidate(&self) {
        if let Some(current) = self.slot.write().await.as_mut() {
            current.stale = true;
        }
        debug!(source = %self.source.name(), "Rule cache invalidated");
    }

    /// Install a snapshot directly, bypassing the source.
    pub async fn replace(&self, snapshot: RuleSnapshot) -> Arc<RuleSnapshot> {
        let snapshot = Arc::new(snapshot);
        *self.slot.write().await = Some(Slot {
            snapshot: snapshot.clone(),
            fetched: Instant::now(),
            stale: false,
        });
        snapshot
    }
}
