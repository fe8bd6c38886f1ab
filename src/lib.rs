//! Personalized feed ranking core: candidate selection, feature extraction,
//! weighted scoring, diversification, cursor pagination, variant selection,
//! and the feedback loop that keeps per-item success scores current.
//!
//! The crate is a library invoked by the host platform. Storage, transport,
//! auth and rendering all live behind the collaborator traits in [`stores`].

pub mod config;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod stores;
pub mod utils;

pub use config::RankingConfig;
pub use models::{
    Cursor, FeedConfig, FeedEvent, FeedEventCategory, FeedPage, FeedWeights, Followable, Item,
    ScopeFilter, UserProfile, FALLBACK_CONFIG_ID,
};
pub use pipeline::{FeedRanker, RankError, RankRequest};
pub use services::{FeedbackIngestor, IngestError};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the default tracing subscriber. Hosts embedding the crate in a
/// larger service will usually bring their own; tests and small binaries can
/// call this once at startup.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
