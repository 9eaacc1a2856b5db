//! Analysis orchestration.
//!
//! For one disease and its candidate drugs:
//!   1. Fill missing disease pathways and the rare flag
//!   2. Give target-less drugs curated targets, infer drug pathways
//!   3. Build the knowledge graph
//!   4. Score and rank candidates
//!   5. Safety filter (Layer 2 only when label lookup is enabled)

use std::time::Instant;

use repurpose_common::{AnalysisConfig, DiseaseProfile, DrugRecord, Result};
use repurpose_kg::{annotate_disease, build_graph, enrich_drugs, PathwayMapper};
use repurpose_ranker::CandidateScorer;
use repurpose_safety::SafetyFilter;
use tracing::{info, instrument};

use crate::report::{AnalysisMetadata, AnalysisReport, DiseaseSummary};

/// Configured mapper, scorer and filter, reusable across analyses. The
/// filter's label cache is shared by every call.
pub struct Pipeline {
    config: AnalysisConfig,
    mapper: PathwayMapper,
    scorer: CandidateScorer,
    filter: SafetyFilter,
}

impl Pipeline {
    /// Pipeline with the built-in pathway table and literature priors and a
    /// caller-supplied safety filter.
    pub fn new(config: AnalysisConfig, filter: SafetyFilter) -> Result<Self> {
        config.validate()?;
        let scorer = CandidateScorer::from_config(&config.scoring);
        Ok(Self {
            config,
            mapper: PathwayMapper::default(),
            scorer,
            filter,
        })
    }

    /// Everything from configuration, including the OpenFDA label source
    /// when `safety.label_lookup` is set.
    pub fn from_config(config: AnalysisConfig) -> Result<Self> {
        let filter = SafetyFilter::from_config(&config.safety)?;
        Self::new(config, filter)
    }

    pub fn with_mapper(mut self, mapper: PathwayMapper) -> Self {
        self.mapper = mapper;
        self
    }

    pub fn with_scorer(mut self, scorer: CandidateScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn filter(&self) -> &SafetyFilter {
        &self.filter
    }

    pub async fn analyze(&self, disease: DiseaseProfile, drugs: Vec<DrugRecord>) -> AnalysisReport {
        run_analysis(&self.config, &self.mapper, &self.scorer, &self.filter, disease, drugs).await
    }
}

/// One-shot analysis with the built-in tables and the given filter.
pub async fn analyze(
    disease: DiseaseProfile,
    drugs: Vec<DrugRecord>,
    config: &AnalysisConfig,
    filter: &SafetyFilter,
) -> Result<AnalysisReport> {
    config.validate()?;
    let scorer = CandidateScorer::from_config(&config.scoring);
    let mapper = PathwayMapper::default();
    Ok(run_analysis(config, &mapper, &scorer, filter, disease, drugs).await)
}

#[instrument(skip_all, fields(disease = %disease.name, drugs = drugs.len()))]
async fn run_analysis(
    config: &AnalysisConfig,
    mapper: &PathwayMapper,
    scorer: &CandidateScorer,
    filter: &SafetyFilter,
    disease: DiseaseProfile,
    mut drugs: Vec<DrugRecord>,
) -> AnalysisReport {
    let t0 = Instant::now();
    info!("Starting analysis");

    let disease = annotate_disease(disease, mapper);
    let enriched = enrich_drugs(&mut drugs, mapper);

    let graph = build_graph(&disease, &drugs);
    let stats = graph.stats();

    let scoring = &config.scoring;
    let candidates = scorer.score(&disease, &graph, &drugs, scoring.top_k, scoring.min_score);
    let candidates_scored = candidates.len();

    let safety = &config.safety;
    let outcome = if safety.label_lookup && filter.has_label_source() {
        filter
            .filter_with_labels(candidates, &disease.name, safety.remove_absolute, safety.remove_relative)
            .await
    } else {
        filter.filter_detailed(candidates, &disease.name, safety.remove_absolute, safety.remove_relative)
    };

    let metadata = AnalysisMetadata {
        drugs_considered: drugs.len(),
        candidates_scored,
        graph_nodes: graph.node_count(),
        graph_edges: graph.edge_count(),
        graph: stats,
        canonical_disease_key: outcome.canonical_key,
        label_lookup_used: outcome.labels_consulted,
        duration_ms: t0.elapsed().as_millis() as u64,
    };

    info!(
        enriched,
        scored = metadata.candidates_scored,
        safe = outcome.safe.len(),
        removed = outcome.removed.len(),
        duration_ms = metadata.duration_ms,
        "Analysis complete"
    );

    AnalysisReport {
        disease: DiseaseSummary::from(&disease),
        candidates: outcome.safe,
        filtered_out: outcome.removed,
        decisions: outcome.decisions,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AnalysisConfig::default();
        config.scoring.top_k = 0;
        assert!(Pipeline::new(config, SafetyFilter::default()).is_err());
    }

    #[tokio::test]
    async fn test_empty_drug_list_is_valid() {
        let disease = DiseaseProfile::new("Asthma", "MONDO_0004979").unwrap();
        let report = analyze(disease, Vec::new(), &AnalysisConfig::default(), &SafetyFilter::default())
            .await
            .unwrap();
        assert!(report.candidates.is_empty());
        assert!(report.filtered_out.is_empty());
        assert_eq!(report.metadata.canonical_disease_key.as_deref(), Some("asthma"));
        assert_eq!(report.metadata.graph_nodes, 1);
    }
}
