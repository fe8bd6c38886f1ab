use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub type ItemId = i64;
pub type UserId = i64;
pub type OrganizationId = i64;
pub type SubforemId = i64;
pub type ConfigId = i64;

/// Sentinel config id carried by pages ranked without a usable active
/// config. No stored config owns it; the serving layer must not emit feed
/// events attributed to it (the ingestor would drop them as unknown).
pub const FALLBACK_CONFIG_ID: ConfigId = 0;

/// A publishable content unit as seen by the ranking core.
///
/// Snapshot semantics: the ranking path treats an `Item` as immutable for the
/// duration of one request. Only the feedback ingestor mutates the success
/// score and counters, through `ItemCatalog::apply_success_update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub published_at: DateTime<Utc>,
    /// Community signal (reaction score in the host platform).
    pub score: f32,
    pub comment_count: u32,
    pub comment_score: f32,
    pub last_comment_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub labels: Vec<String>,
    /// Opaque content embedding; empty when the host has not computed one.
    pub embedding: Vec<f32>,
    /// BCP-47-ish language code, e.g. "en".
    pub language: String,
    pub author_id: UserId,
    pub organization_id: Option<OrganizationId>,
    pub subforem_id: SubforemId,
    /// Precomputed clickbait estimate in [0, 1].
    pub clickbait_score: f32,
    /// Precomputed compellingness estimate in [0, 1].
    pub compellingness_score: f32,
    pub featured: bool,
    /// Admits the item past the lookback window when its success score is
    /// sustained (see `RankingConfig::evergreen_min_success`).
    pub evergreen: bool,
    /// Rolling click-through estimate, updated by the feedback ingestor.
    /// Neutral (0) until the item has at least one impression.
    pub feed_success_score: f32,
    pub feed_impressions_count: u64,
    pub feed_clicks_count: u64,
}

impl Item {
    /// The first tag is the item's primary tag for diversification purposes.
    pub fn primary_tag(&self) -> Option<&str> {
        self.tags.first().map(String::as_str)
    }

    /// Success score is only meaningful once the item has been shown.
    pub fn effective_success_score(&self) -> f32 {
        if self.feed_impressions_count == 0 {
            0.0
        } else {
            self.feed_success_score
        }
    }
}

/// An entity a viewer can hold affinity toward. Tags, users, organizations
/// and subforems all follow the same affinity pattern, so the feature
/// extractor iterates them uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Followable {
    Tag(String),
    User(UserId),
    Organization(OrganizationId),
    Subforem(SubforemId),
}

/// Recency-windowed and all-time affinity sets, each entry carrying a weight
/// in [0, 1]. The recent set is a decaying subset of the all-time set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffinitySet {
    pub recent: HashMap<Followable, f32>,
    pub all_time: HashMap<Followable, f32>,
}

impl AffinitySet {
    /// Raw affinity value for a followable: recent membership counts full,
    /// all-time-only membership counts half, absence counts zero.
    pub fn raw_value(&self, followable: &Followable) -> f32 {
        if let Some(weight) = self.recent.get(followable) {
            weight.clamp(0.0, 1.0)
        } else if let Some(weight) = self.all_time.get(followable) {
            weight.clamp(0.0, 1.0) * 0.5
        } else {
            0.0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.recent.is_empty() && self.all_time.is_empty()
    }
}

/// Per-viewer behavioral snapshot. Anonymous viewers get the default
/// (empty) profile, which resolves every affinity feature to zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub viewer_key: String,
    /// Empty means no language restriction.
    pub preferred_languages: Vec<String>,
    pub affinities: AffinitySet,
    /// Labels the viewer has recently engaged with.
    pub recent_labels: Vec<String>,
    /// Opaque fixed-length interest embedding. Empty when unavailable.
    pub interest_vector: Vec<f32>,
    /// Items the viewer saw recently, newest first.
    pub recently_viewed: Vec<(ItemId, DateTime<Utc>)>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.viewer_key.is_empty()
    }

    pub fn has_viewed(&self, item_id: ItemId) -> bool {
        self.recently_viewed.iter().any(|(id, _)| *id == item_id)
    }
}

/// One named weight per feature the extractor produces, plus free-form
/// extras. Extras with no matching feature contribute nothing to the score;
/// they exist so operators can stage weights ahead of a feature rollout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedWeights {
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
    #[serde(default)]
    pub extras: HashMap<String, f32>,
}

impl FeedWeights {
    fn named(&self) -> [f32; 18] {
        [
            self.tag_follow,
            self.user_follow,
            self.org_follow,
            self.subforem_follow,
            self.recency,
            self.comment_recency,
            self.comment_score,
            self.score,
            self.feed_success,
            self.label_match,
            self.semantic_match,
            self.language_match,
            self.clickbait_penalty,
            self.compellingness_bonus,
            self.published_today,
            self.featured,
            self.recent_article_suppression,
            self.randomness,
        ]
    }

    /// True when every named weight is zero. Extras are ignored here since
    /// they never contribute to the score.
    pub fn is_all_zero(&self) -> bool {
        self.named().iter().all(|w| *w == 0.0)
    }

    /// Weights may be zero or negative but must be finite.
    pub fn is_valid(&self) -> bool {
        self.named().iter().all(|w| w.is_finite())
            && self.extras.values().all(|w| w.is_finite())
    }
}

/// A named, versioned bundle of scoring weights. Read-only during ranking;
/// the aggregate counters are mutated only by the feedback ingestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub id: ConfigId,
    pub name: String,
    pub weights: FeedWeights,
    pub feed_impressions_count: u64,
    /// Rolling success score for the configuration itself.
    pub success_score: f32,
}

impl FeedConfig {
    pub fn new(id: ConfigId, name: impl Into<String>, weights: FeedWeights) -> Self {
        Self {
            id,
            name: name.into(),
            weights,
            feed_impressions_count: 0,
            success_score: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedEventCategory {
    Impression,
    Click,
    Other,
}

impl FeedEventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedEventCategory::Impression => "impression",
            FeedEventCategory::Click => "click",
            FeedEventCategory::Other => "other",
        }
    }
}

/// Immutable record of one serve outcome. Every event references exactly
/// one feed config, which is what makes variant attribution possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEvent {
    pub event_id: Uuid,
    pub viewer_key: String,
    pub item_id: ItemId,
    pub config_id: ConfigId,
    /// Zero-based position in the ranked page that served the item.
    pub position: u32,
    pub category: FeedEventCategory,
    pub occurred_at: DateTime<Utc>,
}

/// Scope of one ranking request. `None` everywhere means the global default
/// pool. An unmatched scope yields an empty pool, never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub subforem_id: Option<SubforemId>,
    pub tag: Option<String>,
}

/// Pagination cursor over the (score desc, id asc) total order. Inclusive
/// start boundary: the next page begins at the first item whose sort key is
/// at or after this position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub score: f32,
    pub item_id: ItemId,
}

/// A candidate carrying its final ranking score plus the two attributes the
/// diversifier keys on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub author_id: UserId,
    pub primary_tag: Option<String>,
    pub score: f32,
}

/// One ordered page of results plus the config that produced it, so the
/// serving layer can stamp emitted feed events for attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPage {
    pub items: Vec<ItemId>,
    /// Config to attribute feed events to. [`FALLBACK_CONFIG_ID`] means the
    /// page was ranked by the recency fallback and carries no attribution.
    pub config_used: ConfigId,
    pub next_cursor: Option<Cursor>,
}
