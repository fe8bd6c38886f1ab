use serde::Deserialize;

/// Tunables for the ranking core, loaded from `FEED_`-prefixed environment
/// variables with sensible defaults. Weight bundles live in `FeedConfig`,
/// not here; this covers the structural knobs that do not vary per variant.
#[derive(Debug, Clone, Deserialize)]
pub struct RankingConfig {
    /// Hard cap on the candidate pool per request.
    #[serde(default = "default_candidate_cap")]
    pub candidate_cap: usize,
    /// Maximum content age, in days, for normal candidacy.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    /// Minimum sustained success score for the evergreen admission path.
    #[serde(default = "default_evergreen_min_success")]
    pub evergreen_min_success: f32,
    /// Per-page cap on items sharing an author before demotion kicks in.
    #[serde(default = "default_author_cap")]
    pub author_cap: usize,
    /// Per-page cap on items sharing a primary tag before demotion kicks in.
    #[serde(default = "default_tag_cap")]
    pub tag_cap: usize,
    /// Deadline for feature extraction across the pool, in milliseconds.
    /// Candidates not extracted in time are dropped, not failed.
    #[serde(default = "default_extraction_timeout_ms")]
    pub extraction_timeout_ms: u64,
    /// Worker fan-out bound for feature extraction.
    #[serde(default = "default_extraction_concurrency")]
    pub extraction_concurrency: usize,
    /// EWMA factor for success-score updates.
    #[serde(default = "default_success_alpha")]
    pub success_alpha: f32,
    /// Number of partitioned locks guarding per-key feedback updates.
    #[serde(default = "default_lock_shards")]
    pub lock_shards: usize,
    /// How many processed event ids the ingestor remembers for dedup.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

fn default_candidate_cap() -> usize {
    2000
}

fn default_lookback_days() -> i64 {
    7
}

fn default_evergreen_min_success() -> f32 {
    0.5
}

fn default_author_cap() -> usize {
    2
}

fn default_tag_cap() -> usize {
    2
}

fn default_extraction_timeout_ms() -> u64 {
    100
}

fn default_extraction_concurrency() -> usize {
    64
}

fn default_success_alpha() -> f32 {
    0.1
}

fn default_lock_shards() -> usize {
    64
}

fn default_dedup_capacity() -> usize {
    100_000
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            candidate_cap: default_candidate_cap(),
            lookback_days: default_lookback_days(),
            evergreen_min_success: default_evergreen_min_success(),
            author_cap: default_author_cap(),
            tag_cap: default_tag_cap(),
            extraction_timeout_ms: default_extraction_timeout_ms(),
            extraction_concurrency: default_extraction_concurrency(),
            success_alpha: default_success_alpha(),
            lock_shards: default_lock_shards(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

impl RankingConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("FEED_").from_env()
    }

    pub fn lookback_secs(&self) -> f32 {
        (self.lookback_days * 24 * 60 * 60) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_platform_expectations() {
        let config = RankingConfig::default();
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.author_cap, 2);
        assert!((config.success_alpha - 0.1).abs() < f32::EPSILON);
        assert!(config.candidate_cap > 0);
    }

    #[test]
    fn lookback_secs_covers_the_window() {
        let config = RankingConfig {
            lookback_days: 1,
            ..Default::default()
        };
        assert!((config.lookback_secs() - 86_400.0).abs() < f32::EPSILON);
    }
}
