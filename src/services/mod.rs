pub mod candidates;
pub mod diversity;
pub mod features;
pub mod feedback;
pub mod ranking;
pub mod scoring;
pub mod variants;

pub use candidates::CandidateGenerator;
pub use diversity::{DiversifiedPage, Diversifier};
pub use features::{FeatureExtractor, FeatureVector, PoolStats};
pub use feedback::{FeedbackIngestor, IngestError};
pub use ranking::Ranker;
pub use scoring::Scorer;
pub use variants::{select_variant, slightly_modified_clone};
