/// Ranking pipeline
///
/// The one produced interface of this crate: snapshot loads, variant
/// selection, scatter-gather feature extraction under a deadline, scoring,
/// diversification, pagination. Profile, config and candidate pool are
/// fetched once up front and treated as immutable for the request, so the
/// result is deterministic even while the feedback loop mutates the stores.

use crate::config::RankingConfig;
use crate::models::{
    Cursor, FeedConfig, FeedPage, FeedWeights, Item, ItemId, ScopeFilter, UserProfile,
    FALLBACK_CONFIG_ID,
};
use crate::services::{
    select_variant, CandidateGenerator, Diversifier, FeatureExtractor, FeatureVector, PoolStats,
    Ranker, Scorer,
};
use crate::stores::{FeedConfigStore, ItemCatalog, ProfileStore};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RankError {
    /// A collaborator read failed. The only fatal path: without item,
    /// profile and config snapshots any scores would be meaningless.
    #[error("collaborator unavailable: {0}")]
    Collaborator(#[source] anyhow::Error),
}

impl RankError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, RankError::Collaborator(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankRequest {
    /// Empty for anonymous viewers.
    pub viewer_key: String,
    pub scope: ScopeFilter,
    pub cursor: Option<Cursor>,
    pub page_size: usize,
    /// Ids the viewer has already been served in this scroll session.
    pub exclusions: HashSet<ItemId>,
    /// Explicit seed for reproducible renders; `None` draws a fresh one.
    pub seed: Option<u64>,
}

pub struct FeedRanker {
    profiles: Arc<dyn ProfileStore>,
    configs: Arc<dyn FeedConfigStore>,
    generator: CandidateGenerator,
    extractor: FeatureExtractor,
    scorer: Scorer,
    ranker: Ranker,
    config: RankingConfig,
}

impl FeedRanker {
    pub fn new(
        catalog: Arc<dyn ItemCatalog>,
        profiles: Arc<dyn ProfileStore>,
        configs: Arc<dyn FeedConfigStore>,
        config: RankingConfig,
    ) -> Self {
        Self {
            profiles,
            configs,
            generator: CandidateGenerator::new(catalog, config.clone()),
            extractor: FeatureExtractor::new(config.clone()),
            scorer: Scorer::new(),
            ranker: Ranker::new(Diversifier::new(config.author_cap, config.tag_cap)),
            config,
        }
    }

    pub async fn rank(&self, request: RankRequest) -> Result<FeedPage, RankError> {
        let seed = request.seed.unwrap_or_else(rand::random);
        let now = Utc::now();

        // One parallel snapshot round; everything downstream is pure.
        let (profile, active_configs, raw_pool) = tokio::try_join!(
            self.profiles.get(&request.viewer_key),
            self.configs.get_active(request.scope.subforem_id),
            self.generator.fetch_pool(&request.scope, &request.exclusions),
        )
        .map_err(RankError::Collaborator)?;

        let config = self.resolve_config(&active_configs, &request.viewer_key);
        let pool = self.generator.apply_filters(raw_pool, &profile, now);

        if pool.is_empty() {
            // Scope miss: an empty page, never an error.
            return Ok(FeedPage {
                items: vec![],
                config_used: config.id,
                next_cursor: None,
            });
        }

        let stats = PoolStats::from_pool(&pool);
        let extracted = self
            .extract_with_deadline(pool, &profile, stats, now, seed)
            .await;

        let scored = self.scorer.score_pool(extracted, &config.weights);
        let page = self
            .ranker
            .paginate(scored, request.cursor, request.page_size);

        info!(
            viewer_key = %request.viewer_key,
            config_id = config.id,
            served = page.page.len(),
            seed,
            "Feed ranked"
        );

        Ok(FeedPage {
            items: page.page.iter().map(|item| item.item_id).collect(),
            config_used: config.id,
            next_cursor: page.next_cursor,
        })
    }

    /// Pick the sticky variant for this viewer, falling back to a zero-weight
    /// config (and therefore pure recency ordering) when nothing usable is
    /// active.
    fn resolve_config(&self, active: &[FeedConfig], viewer_key: &str) -> FeedConfig {
        match select_variant(active, viewer_key) {
            Some(config) if config.weights.is_valid() => config.clone(),
            Some(config) => {
                warn!(
                    config_id = config.id,
                    "Active feed config has non-finite weights, falling back to recency"
                );
                recency_fallback()
            }
            None => {
                warn!("No active feed config, falling back to recency");
                recency_fallback()
            }
        }
    }

    /// Fan extraction out across the pool and join before scoring. The
    /// deadline drops unfinished candidates instead of failing the request.
    async fn extract_with_deadline(
        &self,
        pool: Vec<Item>,
        profile: &UserProfile,
        stats: PoolStats,
        now: DateTime<Utc>,
        seed: u64,
    ) -> Vec<(Item, FeatureVector)> {
        let total = pool.len();
        let extractor = self.extractor.clone();
        let profile = Arc::new(profile.clone());

        let mut work = stream::iter(pool.into_iter().map(move |item| {
            let extractor = extractor.clone();
            let profile = Arc::clone(&profile);
            async move {
                let features = extractor.extract(&profile, &item, &stats, now, seed);
                (item, features)
            }
        }))
        .buffer_unordered(self.config.extraction_concurrency.max(1));

        let deadline = tokio::time::sleep(Duration::from_millis(self.config.extraction_timeout_ms));
        tokio::pin!(deadline);

        let mut extracted = Vec::with_capacity(total);
        loop {
            tokio::select! {
                next = work.next() => match next {
                    Some(pair) => extracted.push(pair),
                    None => break,
                },
                _ = &mut deadline => {
                    warn!(
                        dropped = total - extracted.len(),
                        total,
                        "Feature extraction deadline exceeded, ranking the partial pool"
                    );
                    break;
                }
            }
        }
        extracted
    }
}

/// Zero-weight stand-in used when no active config is usable; the scorer
/// turns it into pure recency ordering. It is not a stored config, so pages
/// it produces carry the sentinel id and must not be attributed.
fn recency_fallback() -> FeedConfig {
    FeedConfig::new(FALLBACK_CONFIG_ID, "recency-fallback", FeedWeights::default())
}
