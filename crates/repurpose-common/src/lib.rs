//! repurpose-common: Shared types, errors, and configuration used across all repurpose crates.

pub mod error;
pub mod entities;
pub mod config;
pub mod sandbox;

// Re-export commonly used types
pub use config::{AnalysisConfig, SafetyConfig, ScoringConfig, WeightConfig};
pub use entities::{
    round4, ConfidenceTier, ContraindicationInfo, DiseaseProfile, DrugCandidate, DrugLabel,
    DrugRecord, FilterAction, FilterDecision, LabelSection, MatchSource, Severity, SubScores,
};
pub use sandbox::SandboxClient;
pub use error::{RepurposeError, Result};
