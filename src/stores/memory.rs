// In-memory collaborator implementations. They back the test suite and make
// the crate usable without wiring a real platform behind the traits.

use super::{EventSource, FeedConfigStore, ItemCatalog, ProfileStore};
use crate::models::{ConfigId, FeedConfig, FeedEvent, Item, ItemId, ScopeFilter, SubforemId, UserProfile};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::RwLock;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct InMemoryCatalog {
    items: DashMap<ItemId, Item>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: Item) {
        self.items.insert(item.id, item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl ItemCatalog for InMemoryCatalog {
    async fn query_candidates(
        &self,
        scope: &ScopeFilter,
        lookback: Duration,
        exclusions: &HashSet<ItemId>,
    ) -> Result<Vec<Item>> {
        let horizon = Utc::now() - lookback;
        let mut matched: Vec<Item> = self
            .items
            .iter()
            .filter(|entry| {
                let item = entry.value();
                if exclusions.contains(&item.id) {
                    return false;
                }
                if let Some(subforem_id) = scope.subforem_id {
                    if item.subforem_id != subforem_id {
                        return false;
                    }
                }
                if let Some(tag) = &scope.tag {
                    if !item.tags.iter().any(|t| t == tag) {
                        return false;
                    }
                }
                // Lookback is a pre-filter; evergreen items pass through and
                // the candidate generator applies the exact policy.
                item.published_at >= horizon || item.evergreen
            })
            .map(|entry| entry.value().clone())
            .collect();

        // Stable output order so snapshot-identical requests see the same pool.
        matched.sort_by_key(|item| item.id);
        Ok(matched)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.items.get(&id).map(|entry| entry.value().clone()))
    }

    async fn apply_success_update(
        &self,
        id: ItemId,
        new_score: f32,
        impressions: u64,
        clicks: u64,
    ) -> Result<()> {
        if let Some(mut entry) = self.items.get_mut(&id) {
            let item = entry.value_mut();
            item.feed_success_score = new_score;
            item.feed_impressions_count = impressions;
            item.feed_clicks_count = clicks;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<String, UserProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: UserProfile) {
        self.profiles.insert(profile.viewer_key.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, viewer_key: &str) -> Result<UserProfile> {
        Ok(self
            .profiles
            .get(viewer_key)
            .map(|entry| entry.value().clone())
            .unwrap_or_else(UserProfile::anonymous))
    }
}

#[derive(Default)]
pub struct InMemoryConfigStore {
    configs: DashMap<ConfigId, FeedConfig>,
    active: RwLock<Vec<ConfigId>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, config: FeedConfig, active: bool) {
        let id = config.id;
        self.configs.insert(id, config);
        if active {
            let mut active_ids = self.active.write().expect("active list poisoned");
            if !active_ids.contains(&id) {
                active_ids.push(id);
            }
        }
    }
}

#[async_trait]
impl FeedConfigStore for InMemoryConfigStore {
    async fn get_active(&self, _scope_hint: Option<SubforemId>) -> Result<Vec<FeedConfig>> {
        let active_ids = self.active.read().expect("active list poisoned").clone();
        Ok(active_ids
            .iter()
            .filter_map(|id| self.configs.get(id).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn get(&self, id: ConfigId) -> Result<Option<FeedConfig>> {
        Ok(self.configs.get(&id).map(|entry| entry.value().clone()))
    }

    async fn apply_success_update(
        &self,
        id: ConfigId,
        new_score: f32,
        impressions: u64,
    ) -> Result<()> {
        if let Some(mut entry) = self.configs.get_mut(&id) {
            let config = entry.value_mut();
            config.success_score = new_score;
            config.feed_impressions_count = impressions;
        }
        Ok(())
    }
}

/// Event source backed by a tokio channel, for tests and embedded ingestion.
pub struct ChannelEventSource {
    receiver: mpsc::Receiver<FeedEvent>,
}

impl ChannelEventSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<FeedEvent>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self { receiver })
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Option<FeedEvent> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: ItemId, days_old: i64, subforem_id: SubforemId, tags: &[&str]) -> Item {
        Item {
            id,
            published_at: Utc::now() - Duration::days(days_old),
            score: 0.0,
            comment_count: 0,
            comment_score: 0.0,
            last_comment_at: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            labels: vec![],
            embedding: vec![],
            language: "en".to_string(),
            author_id: 1,
            organization_id: None,
            subforem_id,
            clickbait_score: 0.0,
            compellingness_score: 0.0,
            featured: false,
            evergreen: false,
            feed_success_score: 0.0,
            feed_impressions_count: 0,
            feed_clicks_count: 0,
        }
    }

    #[tokio::test]
    async fn query_applies_scope_and_exclusions() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(item(1, 1, 10, &["rust"]));
        catalog.insert(item(2, 1, 10, &["go"]));
        catalog.insert(item(3, 1, 20, &["rust"]));

        let scope = ScopeFilter {
            subforem_id: Some(10),
            tag: Some("rust".to_string()),
        };
        let exclusions = HashSet::new();
        let pool = catalog
            .query_candidates(&scope, Duration::days(7), &exclusions)
            .await
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 1);

        let exclusions: HashSet<ItemId> = [1].into_iter().collect();
        let pool = catalog
            .query_candidates(&scope, Duration::days(7), &exclusions)
            .await
            .unwrap();
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn unmatched_scope_is_empty_not_an_error() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(item(1, 1, 10, &["rust"]));

        let scope = ScopeFilter {
            subforem_id: Some(999),
            tag: None,
        };
        let pool = catalog
            .query_candidates(&scope, Duration::days(7), &HashSet::new())
            .await
            .unwrap();
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn evergreen_items_survive_the_lookback_prefilter() {
        let catalog = InMemoryCatalog::new();
        let mut old = item(1, 30, 10, &["rust"]);
        old.evergreen = true;
        catalog.insert(old);
        catalog.insert(item(2, 30, 10, &["rust"]));

        let pool = catalog
            .query_candidates(&ScopeFilter::default(), Duration::days(7), &HashSet::new())
            .await
            .unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].id, 1);
    }

    #[tokio::test]
    async fn unknown_profile_resolves_to_anonymous() {
        let store = InMemoryProfileStore::new();
        let profile = store.get("nobody").await.unwrap();
        assert!(profile.is_anonymous());
        assert!(profile.affinities.is_empty());
    }

    #[tokio::test]
    async fn success_update_round_trips() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(item(1, 1, 10, &[]));
        catalog.apply_success_update(1, 0.28, 5, 2).await.unwrap();

        let item = catalog.get_item(1).await.unwrap().unwrap();
        assert!((item.feed_success_score - 0.28).abs() < 1e-6);
        assert_eq!(item.feed_impressions_count, 5);
        assert_eq!(item.feed_clicks_count, 2);
    }
}
