/// Feedback Ingestor
///
/// Long-lived consumer over the feed event stream. Each event updates the
/// item's rolling success score with an exponentially-weighted step and
/// attributes the same outcome to the config that produced the serve.
///
/// Concurrency: updates to one key are serialized through partitioned locks
/// (read-modify-write of the decay step must not interleave); different keys
/// proceed in parallel. Delivery is at-least-once upstream, so events are
/// deduplicated by id before anything is applied.

use crate::config::RankingConfig;
use crate::models::{FeedEvent, FeedEventCategory};
use crate::stores::{EventSource, FeedConfigStore, ItemCatalog};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown item id: {0}")]
    UnknownItem(i64),

    #[error("unknown config id: {0}")]
    UnknownConfig(i64),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Fixed array of locks indexed by key hash. Bounds contention without a
/// lock per key or a single global mutex.
struct KeyLocks {
    shards: Vec<Mutex<()>>,
}

impl KeyLocks {
    fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| Mutex::new(())).collect(),
        }
    }

    fn for_key(&self, key: i64) -> &Mutex<()> {
        let index = (key as u64 % self.shards.len() as u64) as usize;
        &self.shards[index]
    }
}

/// Bounded remembered-id set for event dedup.
struct DedupSet {
    seen: DashMap<Uuid, ()>,
    order: StdMutex<VecDeque<Uuid>>,
    capacity: usize,
}

impl DedupSet {
    fn new(capacity: usize) -> Self {
        Self {
            seen: DashMap::new(),
            order: StdMutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// True when the id was not seen before.
    fn insert(&self, id: Uuid) -> bool {
        if self.seen.insert(id, ()).is_some() {
            return false;
        }
        let mut order = self.order.lock().expect("dedup order poisoned");
        order.push_back(id);
        while order.len() > self.capacity {
            if let Some(evicted) = order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    /// Forget an id so a redelivery is processed again. The stale eviction
    /// queue entry just ages out.
    fn remove(&self, id: &Uuid) {
        self.seen.remove(id);
    }
}

pub struct FeedbackIngestor {
    catalog: Arc<dyn ItemCatalog>,
    configs: Arc<dyn FeedConfigStore>,
    alpha: f32,
    item_locks: KeyLocks,
    config_locks: KeyLocks,
    dedup: DedupSet,
}

impl FeedbackIngestor {
    pub fn new(
        catalog: Arc<dyn ItemCatalog>,
        configs: Arc<dyn FeedConfigStore>,
        config: &RankingConfig,
    ) -> Self {
        Self {
            catalog,
            configs,
            alpha: config.success_alpha.clamp(0.0, 1.0),
            item_locks: KeyLocks::new(config.lock_shards),
            config_locks: KeyLocks::new(config.lock_shards),
            dedup: DedupSet::new(config.dedup_capacity),
        }
    }

    /// Consume the stream until it closes. A malformed event is logged and
    /// dropped; nothing here is fatal to ingestion.
    pub async fn run(&self, mut source: impl EventSource) {
        info!("Feedback ingestion started");
        let mut processed: u64 = 0;
        let mut dropped: u64 = 0;

        while let Some(event) = source.next_event().await {
            match self.process_event(&event).await {
                Ok(applied) => {
                    if applied {
                        processed += 1;
                    }
                }
                Err(err) => {
                    dropped += 1;
                    warn!(
                        event_id = %event.event_id,
                        item_id = event.item_id,
                        config_id = event.config_id,
                        error = %err,
                        "Dropping malformed feed event"
                    );
                }
            }
        }

        info!(processed, dropped, "Feedback ingestion stream closed");
    }

    /// Apply one event. Returns `Ok(false)` for a duplicate delivery.
    pub async fn process_event(&self, event: &FeedEvent) -> Result<bool> {
        if !self.dedup.insert(event.event_id) {
            debug!(event_id = %event.event_id, "Duplicate event, skipping");
            return Ok(false);
        }

        // Outcome of the serve: clicks reinforce, plain impressions decay,
        // everything else only counts exposure.
        let outcome = match event.category {
            FeedEventCategory::Click => Some(1.0f32),
            FeedEventCategory::Impression => Some(0.0f32),
            FeedEventCategory::Other => None,
        };

        let applied = async {
            self.apply_item_update(event, outcome).await?;
            self.apply_config_update(event, outcome).await
        }
        .await;

        if let Err(err) = applied {
            // A transient store failure must not consume the event id:
            // delivery is at-least-once upstream, and the redelivery is the
            // retry. Genuinely malformed events stay deduped.
            if matches!(err, IngestError::Store(_)) {
                self.dedup.remove(&event.event_id);
            }
            return Err(err);
        }
        Ok(true)
    }

    async fn apply_item_update(&self, event: &FeedEvent, outcome: Option<f32>) -> Result<()> {
        let _guard = self.item_locks.for_key(event.item_id).lock().await;

        let item = self
            .catalog
            .get_item(event.item_id)
            .await?
            .ok_or(IngestError::UnknownItem(event.item_id))?;

        let new_score = match outcome {
            Some(outcome) => ewma(item.effective_success_score(), outcome, self.alpha),
            None => item.feed_success_score,
        };
        let impressions = item.feed_impressions_count + 1;
        let clicks = if event.category == FeedEventCategory::Click {
            item.feed_clicks_count + 1
        } else {
            item.feed_clicks_count
        };

        self.catalog
            .apply_success_update(event.item_id, new_score, impressions, clicks)
            .await?;

        debug!(
            item_id = event.item_id,
            category = event.category.as_str(),
            new_score,
            impressions,
            "Item success updated"
        );
        Ok(())
    }

    async fn apply_config_update(&self, event: &FeedEvent, outcome: Option<f32>) -> Result<()> {
        let _guard = self.config_locks.for_key(event.config_id).lock().await;

        let config = self
            .configs
            .get(event.config_id)
            .await?
            .ok_or(IngestError::UnknownConfig(event.config_id))?;

        let new_score = match outcome {
            Some(outcome) => ewma(config.success_score, outcome, self.alpha),
            None => config.success_score,
        };
        let impressions = config.feed_impressions_count + 1;

        self.configs
            .apply_success_update(event.config_id, new_score, impressions)
            .await?;
        Ok(())
    }
}

/// One exponentially-weighted step: stale signal decays, fresh outcome mixes
/// in at rate alpha.
fn ewma(old: f32, outcome: f32, alpha: f32) -> f32 {
    old * (1.0 - alpha) + outcome * alpha
}
