//! repurpose-safety: Contraindication filtering of scored candidates.
//!
//! Layer 1 is a static rule database keyed by canonical disease name and
//! needs no network. Layer 2 scans drug label text from a [`LabelSource`]
//! for drugs Layer 1 did not match. Withdrawn drugs are removed for every
//! disease.

pub mod rules;
pub mod normalise;
pub mod label;
pub mod filter;

pub use filter::{FilterOutcome, RuleMatch, SafetyFilter};
pub use label::{LabelCache, LabelKeywords, LabelSource, OpenFdaLabelSource, StaticLabelSource};
pub use normalise::normalise_disease_name;
pub use rules::{ContraindicationDb, ContraindicationRule, RuleCategory};
