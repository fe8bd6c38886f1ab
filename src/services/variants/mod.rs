/// Variant handling
///
/// Several feed configs may be active at once while an experiment runs.
/// Selection here is sticky per viewer: the same key always lands on the
/// same variant for a given active set, with no coordination or storage.

use crate::models::{ConfigId, FeedConfig, FeedWeights};
use crate::utils::fnv1a_hash;
use rand::Rng;
use tracing::debug;

/// Pick one active config for a viewer. Returns `None` when no config is
/// active. The active list is keyed by config id so list ordering from the
/// store cannot flip assignments.
pub fn select_variant<'a>(active: &'a [FeedConfig], viewer_key: &str) -> Option<&'a FeedConfig> {
    if active.is_empty() {
        return None;
    }

    let mut ids: Vec<(ConfigId, usize)> = active
        .iter()
        .enumerate()
        .map(|(idx, config)| (config.id, idx))
        .collect();
    ids.sort_by_key(|(id, _)| *id);

    let slot = (fnv1a_hash(viewer_key.as_bytes()) % ids.len() as u64) as usize;
    let (config_id, idx) = ids[slot];
    debug!(viewer_key, config_id, "Variant selected");
    Some(&active[idx])
}

/// Derive an experiment variant from an existing config: every weight is
/// jittered by an independent factor in [0.9, 1.1] and the aggregate
/// counters start from zero so the new variant is measured on its own.
pub fn slightly_modified_clone(
    config: &FeedConfig,
    new_id: ConfigId,
    rng: &mut impl Rng,
) -> FeedConfig {
    let w = &config.weights;
    let extras = w
        .extras
        .iter()
        .map(|(name, weight)| (name.clone(), weight * rng.gen_range(0.9..=1.1)))
        .collect();
    let mut jitter = |weight: f32| weight * rng.gen_range(0.9..=1.1);

    let weights = FeedWeights {
        tag_follow: jitter(w.tag_follow),
        user_follow: jitter(w.user_follow),
        org_follow: jitter(w.org_follow),
        subforem_follow: jitter(w.subforem_follow),
        recency: jitter(w.recency),
        comment_recency: jitter(w.comment_recency),
        comment_score: jitter(w.comment_score),
        score: jitter(w.score),
        feed_success: jitter(w.feed_success),
        label_match: jitter(w.label_match),
        semantic_match: jitter(w.semantic_match),
        language_match: jitter(w.language_match),
        clickbait_penalty: jitter(w.clickbait_penalty),
        compellingness_bonus: jitter(w.compellingness_bonus),
        published_today: jitter(w.published_today),
        featured: jitter(w.featured),
        recent_article_suppression: jitter(w.recent_article_suppression),
        randomness: jitter(w.randomness),
        extras,
    };

    FeedConfig {
        id: new_id,
        name: format!("{} (variant)", config.name),
        weights,
        feed_impressions_count: 0,
        success_score: 0.0,
    }
}
