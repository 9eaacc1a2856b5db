//! repurpose-kg: Knowledge graph construction and querying.
//!
//! Links one disease to its genes and pathways and every candidate drug to its
//! targets and inferred pathways, so that direct and indirect relationships can
//! be queried uniformly.

pub mod pathways;
pub mod graph;
pub mod annotate;

pub use annotate::{annotate_disease, enrich_drugs, is_rare_disease};
pub use graph::{build_graph, DiseaseDistances, GraphStats, KgNode, KnowledgeGraph, NodeKind, Relation};
pub use pathways::{PathwayMapper, FALLBACK_PATHWAY};
