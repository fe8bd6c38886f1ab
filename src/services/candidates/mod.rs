/// Candidate Generator
///
/// Produces the bounded pool of items eligible for scoring in one ranking
/// request. Hard filters only; everything soft is a weight in the scorer.

use crate::config::RankingConfig;
use crate::models::{Item, ItemId, ScopeFilter, UserProfile};
use crate::stores::ItemCatalog;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CandidateGenerator {
    catalog: Arc<dyn ItemCatalog>,
    config: RankingConfig,
}

impl CandidateGenerator {
    pub fn new(catalog: Arc<dyn ItemCatalog>, config: RankingConfig) -> Self {
        Self { catalog, config }
    }

    /// Raw pool fetch. Read-only; an unmatched scope is an empty pool.
    pub async fn fetch_pool(
        &self,
        scope: &ScopeFilter,
        exclusions: &HashSet<ItemId>,
    ) -> Result<Vec<Item>> {
        self.catalog
            .query_candidates(scope, Duration::days(self.config.lookback_days), exclusions)
            .await
    }

    /// Apply the hard filters the catalog pre-filter cannot express exactly:
    /// published, language compatibility, the lookback window with its
    /// evergreen escape hatch, and the pool cap.
    pub fn apply_filters(
        &self,
        pool: Vec<Item>,
        profile: &UserProfile,
        now: DateTime<Utc>,
    ) -> Vec<Item> {
        let horizon = now - Duration::days(self.config.lookback_days);
        let fetched = pool.len();

        let mut eligible: Vec<Item> = pool
            .into_iter()
            .filter(|item| {
                if item.published_at > now {
                    return false;
                }
                if !self.language_compatible(item, profile) {
                    return false;
                }
                if item.published_at < horizon {
                    // Old items ride only the evergreen path, and only while
                    // their success score holds up.
                    return item.evergreen
                        && item.effective_success_score() >= self.config.evergreen_min_success;
                }
                true
            })
            .collect();

        if eligible.len() > self.config.candidate_cap {
            // Keep the freshest items when over cap; ties broken by id so
            // identical snapshots produce identical pools.
            eligible.sort_by(|a, b| {
                b.published_at
                    .cmp(&a.published_at)
                    .then(a.id.cmp(&b.id))
            });
            warn!(
                fetched,
                cap = self.config.candidate_cap,
                "Candidate pool over cap, truncating"
            );
            eligible.truncate(self.config.candidate_cap);
        }

        debug!(fetched, eligible = eligible.len(), "Candidate pool built");
        eligible
    }

    /// Fetch and filter in one step.
    pub async fn generate(
        &self,
        scope: &ScopeFilter,
        profile: &UserProfile,
        exclusions: &HashSet<ItemId>,
    ) -> Result<Vec<Item>> {
        let pool = self.fetch_pool(scope, exclusions).await?;
        Ok(self.apply_filters(pool, profile, Utc::now()))
    }

    fn language_compatible(&self, item: &Item, profile: &UserProfile) -> bool {
        profile.preferred_languages.is_empty()
            || profile.preferred_languages.iter().any(|l| *l == item.language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::InMemoryCatalog;

    fn item(id: ItemId, days_old: i64) -> Item {
        Item {
            id,
            published_at: Utc::now() - Duration::days(days_old),
            score: 0.0,
            comment_count: 0,
            comment_score: 0.0,
            last_comment_at: None,
            tags: vec![],
            labels: vec![],
            embedding: vec![],
            language: "en".to_string(),
            author_id: 1,
            organization_id: None,
            subforem_id: 1,
            clickbait_score: 0.0,
            compellingness_score: 0.0,
            featured: false,
            evergreen: false,
            feed_success_score: 0.0,
            feed_impressions_count: 0,
            feed_clicks_count: 0,
        }
    }

    fn generator(catalog: Arc<InMemoryCatalog>, config: RankingConfig) -> CandidateGenerator {
        CandidateGenerator::new(catalog, config)
    }

    #[tokio::test]
    async fn old_item_without_evergreen_flag_is_excluded() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert(item(1, 10));
        catalog.insert(item(2, 3));

        let gen = generator(catalog, RankingConfig::default());
        let pool = gen
            .generate(&ScopeFilter::default(), &UserProfile::anonymous(), &HashSet::new())
            .await
            .unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 2);
    }

    #[tokio::test]
    async fn evergreen_item_needs_sustained_success() {
        let catalog = Arc::new(InMemoryCatalog::new());

        let mut weak = item(1, 10);
        weak.evergreen = true;
        weak.feed_success_score = 0.1;
        weak.feed_impressions_count = 100;
        catalog.insert(weak);

        let mut strong = item(2, 10);
        strong.evergreen = true;
        strong.feed_success_score = 0.7;
        strong.feed_impressions_count = 100;
        catalog.insert(strong);

        let gen = generator(catalog, RankingConfig::default());
        let pool = gen
            .generate(&ScopeFilter::default(), &UserProfile::anonymous(), &HashSet::new())
            .await
            .unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 2);
    }

    #[tokio::test]
    async fn language_filter_respects_viewer_preference() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.insert(item(1, 1));
        let mut fr = item(2, 1);
        fr.language = "fr".to_string();
        catalog.insert(fr);

        let gen = generator(catalog, RankingConfig::default());

        let mut profile = UserProfile::anonymous();
        profile.preferred_languages = vec!["en".to_string()];
        let pool = gen
            .generate(&ScopeFilter::default(), &profile, &HashSet::new())
            .await
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 1);

        // No preference means unrestricted.
        let pool = gen
            .generate(&ScopeFilter::default(), &UserProfile::anonymous(), &HashSet::new())
            .await
            .unwrap();
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn pool_is_capped_keeping_freshest() {
        let catalog = Arc::new(InMemoryCatalog::new());
        for id in 0..10 {
            catalog.insert(item(id, id));
        }

        let config = RankingConfig {
            candidate_cap: 3,
            lookback_days: 30,
            ..Default::default()
        };
        let gen = generator(catalog, config);
        let pool = gen
            .generate(&ScopeFilter::default(), &UserProfile::anonymous(), &HashSet::new())
            .await
            .unwrap();

        let mut ids: Vec<ItemId> = pool.iter().map(|i| i.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
