//! Analysis report returned to the caller.

use repurpose_common::{DiseaseProfile, DrugCandidate, FilterDecision, Result};
use repurpose_kg::GraphStats;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DiseaseSummary {
    pub name: String,
    pub id: String,
    pub description: String,
    pub gene_count: usize,
    pub pathway_count: usize,
    pub is_rare: bool,
    pub active_trials: u32,
}

impl From<&DiseaseProfile> for DiseaseSummary {
    fn from(d: &DiseaseProfile) -> Self {
        Self {
            name: d.name.clone(),
            id: d.id.clone(),
            description: d.description.clone(),
            gene_count: d.genes.len(),
            pathway_count: d.pathways.len(),
            is_rare: d.is_rare,
            active_trials: d.active_trials_count,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisMetadata {
    pub drugs_considered: usize,
    /// Candidates returned by the scorer, before safety filtering.
    pub candidates_scored: usize,
    pub graph: GraphStats,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub canonical_disease_key: Option<String>,
    pub label_lookup_used: bool,
    pub duration_ms: u64,
}

/// Ranked, safety-filtered candidates for one disease.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub disease: DiseaseSummary,
    /// Safe candidates, best first. May carry a `safety_warning`.
    pub candidates: Vec<DrugCandidate>,
    pub filtered_out: Vec<DrugCandidate>,
    pub decisions: Vec<FilterDecision>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisReport {
    pub fn top(&self) -> Option<&DrugCandidate> {
        self.candidates.first()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
