// Collaborator seams. The ranking core consumes these; the host platform
// implements them against its real storage. In-memory implementations for
// tests and embedded use live in `memory`.

pub mod memory;

use crate::models::{ConfigId, FeedConfig, FeedEvent, Item, ItemId, ScopeFilter, SubforemId, UserProfile};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration;
use std::collections::HashSet;

#[cfg(test)]
use mockall::automock;

pub use memory::{ChannelEventSource, InMemoryCatalog, InMemoryConfigStore, InMemoryProfileStore};

/// Read view over publishable items, plus the single write path used by the
/// feedback ingestor.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    /// Published items matching the scope, minus exclusions. The lookback is
    /// a pre-filter hint: implementations may return older items flagged
    /// evergreen, and the candidate generator re-applies the window exactly.
    /// An unmatched scope returns an empty vec, not an error.
    async fn query_candidates(
        &self,
        scope: &ScopeFilter,
        lookback: Duration,
        exclusions: &HashSet<ItemId>,
    ) -> Result<Vec<Item>>;

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>>;

    /// Write path reserved for the feedback ingestor.
    async fn apply_success_update(
        &self,
        id: ItemId,
        new_score: f32,
        impressions: u64,
        clicks: u64,
    ) -> Result<()>;
}

/// Per-viewer behavioral snapshots. Unknown or anonymous viewers resolve to
/// the default (empty) profile; an `Err` means the store itself is down.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, viewer_key: &str) -> Result<UserProfile>;
}

/// Versioned weight bundles. Several configs may be active at once to run
/// experiments; the pipeline picks one per request.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FeedConfigStore: Send + Sync {
    async fn get_active(&self, scope_hint: Option<SubforemId>) -> Result<Vec<FeedConfig>>;

    async fn get(&self, id: ConfigId) -> Result<Option<FeedConfig>>;

    /// Write path reserved for the feedback ingestor.
    async fn apply_success_update(
        &self,
        id: ConfigId,
        new_score: f32,
        impressions: u64,
    ) -> Result<()>;
}

/// At-least-once stream of feed events from the serving layer.
#[async_trait]
pub trait EventSource: Send {
    /// Next event in arrival order, or `None` once the stream is closed.
    async fn next_event(&mut self) -> Option<FeedEvent>;
}
