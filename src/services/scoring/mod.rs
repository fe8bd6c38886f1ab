/// Scorer
///
/// Combines a feature vector with a config's weights into one ranking score.
/// Deterministic: identical (features, weights) always yields the identical
/// score, which is what makes A/B attribution analyzable offline.

use crate::models::{FeedWeights, Item, ScoredItem};
use crate::services::features::FeatureVector;
use tracing::warn;

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer;

impl Scorer {
    pub fn new() -> Self {
        Self
    }

    /// Weighted sum over the named features. Config extras have no matching
    /// feature and therefore contribute nothing.
    pub fn score(&self, features: &FeatureVector, weights: &FeedWeights) -> f32 {
        let raw = weights.tag_follow * features.tag_follow
            + weights.user_follow * features.user_follow
            + weights.org_follow * features.org_follow
            + weights.subforem_follow * features.subforem_follow
            + weights.recency * features.recency
            + weights.comment_recency * features.comment_recency
            + weights.comment_score * features.comment_score
            + weights.score * features.score
            + weights.feed_success * features.feed_success
            + weights.label_match * features.label_match
            + weights.semantic_match * features.semantic_match
            + weights.language_match * features.language_match
            + weights.clickbait_penalty * features.clickbait_penalty
            + weights.compellingness_bonus * features.compellingness_bonus
            + weights.published_today * features.published_today
            + weights.featured * features.featured
            + weights.recent_article_suppression * features.recent_article_suppression
            + weights.randomness * features.randomness;

        if raw.is_finite() {
            raw
        } else {
            0.0
        }
    }

    /// Score a full pool. An all-zero config would rank everything equal, so
    /// that degenerate case falls back to pure recency ordering instead.
    pub fn score_pool(
        &self,
        extracted: Vec<(Item, FeatureVector)>,
        weights: &FeedWeights,
    ) -> Vec<ScoredItem> {
        let degraded = weights.is_all_zero();
        if degraded && !extracted.is_empty() {
            warn!("Feed config has all-zero weights, falling back to recency ordering");
        }

        extracted
            .into_iter()
            .map(|(item, features)| {
                let score = if degraded {
                    features.recency
                } else {
                    self.score(&features, weights)
                };
                ScoredItem {
                    item_id: item.id,
                    author_id: item.author_id,
                    primary_tag: item.primary_tag().map(str::to_string),
                    score,
                }
            })
            .collect()
    }
}
