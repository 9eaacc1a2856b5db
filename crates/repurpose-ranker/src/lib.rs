//! repurpose-ranker: Candidate scoring engine.
//!
//! Each drug gets four sub-scores against the disease (gene overlap, pathway
//! overlap, graph distance, literature prior) combined into one weighted
//! composite with a confidence tier.

pub mod scorer;
pub mod overlap;
pub mod weights;
pub mod literature;

pub use literature::{KnownRepurposing, LiteraturePrior};
pub use scorer::CandidateScorer;
pub use weights::WeightVector;
