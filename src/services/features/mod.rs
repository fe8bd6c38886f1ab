/// Feature Extractor
///
/// Computes the named feature vector for one (viewer, item) pair. Pure: no
/// side effects, no I/O, and deterministic given the same profile, item,
/// pool stats and request seed. Out-of-range inputs are clamped, never
/// rejected.

use crate::config::RankingConfig;
use crate::models::{Followable, Item, UserProfile};
use crate::utils::{cosine_similarity, linear_decay, normalize_score, set_overlap};
use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};

/// Per-request normalization stats, computed once over the candidate pool
/// so raw community signals stay scale-invariant across traffic volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    pub score_min: f32,
    pub score_max: f32,
    pub comment_score_min: f32,
    pub comment_score_max: f32,
    pub success_min: f32,
    pub success_max: f32,
}

impl PoolStats {
    pub fn from_pool(pool: &[Item]) -> Self {
        let mut stats = PoolStats::default();
        let mut first = true;
        for item in pool {
            let success = item.effective_success_score();
            if first {
                stats.score_min = item.score;
                stats.score_max = item.score;
                stats.comment_score_min = item.comment_score;
                stats.comment_score_max = item.comment_score;
                stats.success_min = success;
                stats.success_max = success;
                first = false;
            } else {
                stats.score_min = stats.score_min.min(item.score);
                stats.score_max = stats.score_max.max(item.score);
                stats.comment_score_min = stats.comment_score_min.min(item.comment_score);
                stats.comment_score_max = stats.comment_score_max.max(item.comment_score);
                stats.success_min = stats.success_min.min(success);
                stats.success_max = stats.success_max.max(success);
            }
        }
        stats
    }
}

/// The fixed named feature vector consumed by the scorer. Every value is a
/// finite real in [0, 1] or [-1, 0].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureVector {
    pub tag_follow: f32,
    pub user_follow: f32,
    pub org_follow: f32,
    pub subforem_follow: f32,
    pub recency: f32,
    pub comment_recency: f32,
    pub comment_score: f32,
    pub score: f32,
    pub feed_success: f32,
    pub label_match: f32,
    pub semantic_match: f32,
    pub language_match: f32,
    pub clickbait_penalty: f32,
    pub compellingness_bonus: f32,
    pub published_today: f32,
    pub featured: f32,
    pub recent_article_suppression: f32,
    pub randomness: f32,
}

#[derive(Clone)]
pub struct FeatureExtractor {
    config: RankingConfig,
}

impl FeatureExtractor {
    pub fn new(config: RankingConfig) -> Self {
        Self { config }
    }

    pub fn extract(
        &self,
        profile: &UserProfile,
        item: &Item,
        stats: &PoolStats,
        now: DateTime<Utc>,
        request_seed: u64,
    ) -> FeatureVector {
        let lookback_secs = self.config.lookback_secs();
        let age_secs = (now - item.published_at).num_seconds().max(0) as f32;

        let affinities = &profile.affinities;
        let tag_follow = item
            .tags
            .iter()
            .map(|tag| affinities.raw_value(&Followable::Tag(tag.clone())))
            .fold(0.0f32, f32::max);
        let user_follow = affinities.raw_value(&Followable::User(item.author_id));
        let org_follow = item
            .organization_id
            .map(|org| affinities.raw_value(&Followable::Organization(org)))
            .unwrap_or(0.0);
        let subforem_follow = affinities.raw_value(&Followable::Subforem(item.subforem_id));

        let comment_recency = item
            .last_comment_at
            .map(|at| {
                let comment_age = (now - at).num_seconds().max(0) as f32;
                linear_decay(comment_age, lookback_secs)
            })
            .unwrap_or(0.0);

        FeatureVector {
            tag_follow,
            user_follow,
            org_follow,
            subforem_follow,
            recency: linear_decay(age_secs, lookback_secs),
            comment_recency,
            comment_score: normalize_score(
                item.comment_score,
                stats.comment_score_min,
                stats.comment_score_max,
            ),
            score: normalize_score(item.score, stats.score_min, stats.score_max),
            feed_success: normalize_score(
                item.effective_success_score(),
                stats.success_min,
                stats.success_max,
            ),
            label_match: set_overlap(&profile.recent_labels, &item.labels),
            semantic_match: cosine_similarity(&profile.interest_vector, &item.embedding),
            language_match: self.language_match(profile, item),
            clickbait_penalty: -item.clickbait_score.clamp(0.0, 1.0),
            compellingness_bonus: item.compellingness_score.clamp(0.0, 1.0),
            published_today: self.published_today(profile, item, now),
            featured: if item.featured { 1.0 } else { 0.0 },
            recent_article_suppression: if profile.has_viewed(item.id) { -1.0 } else { 0.0 },
            randomness: randomness_draw(request_seed, item.id),
        }
    }

    fn language_match(&self, profile: &UserProfile, item: &Item) -> f32 {
        match profile.preferred_languages.first() {
            Some(primary) if *primary == item.language => 1.0,
            _ => 0.0,
        }
    }

    /// Same-day publication bonus. Viewers who have been active recently get
    /// the full value; the base reward for everyone else is half, which folds
    /// the platform's general and recently-active past-day bonuses into one
    /// bounded feature.
    fn published_today(&self, profile: &UserProfile, item: &Item, now: DateTime<Utc>) -> f32 {
        if item.published_at < now - Duration::hours(24) {
            return 0.0;
        }
        let activity = (profile.recently_viewed.len() as f32 / 10.0).clamp(0.0, 1.0);
        0.5 + 0.5 * activity
    }
}

/// Per-item randomness derived from the request seed, not a shared RNG, so
/// the draw is independent of feature-extraction completion order. Repeated
/// renders of the same request reproduce it exactly.
fn randomness_draw(request_seed: u64, item_id: i64) -> f32 {
    let mixed = request_seed ^ (item_id as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    let mut rng = rand::rngs::StdRng::seed_from_u64(mixed);
    rng.gen::<f32>()
}
