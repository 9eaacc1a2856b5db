//! repurpose-pipeline: In-process analysis over already-fetched inputs.
//!
//! Sequences annotation, graph building, scoring and safety filtering for
//! one disease and a list of drugs. Fetching disease and drug records is
//! the caller's job.

pub mod analysis;
pub mod report;

pub use analysis::{analyze, Pipeline};
pub use report::{AnalysisMetadata, AnalysisReport, DiseaseSummary};
