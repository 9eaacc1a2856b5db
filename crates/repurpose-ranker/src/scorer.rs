//! Composite repurposing score computation.
//!
//! S(d, c) = 0.40·gene + 0.35·pathway + 0.10·centrality + 0.15·literature,
//! rounded to 4 decimals, with default weights.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use repurpose_common::entities::SubScores;
use repurpose_common::{ConfidenceTier, DiseaseProfile, DrugCandidate, DrugRecord, ScoringConfig};
use repurpose_kg::{DiseaseDistances, KnowledgeGraph};
use tracing::{debug, info};

use crate::literature::{KnownRepurposing, LiteraturePrior};
use crate::overlap::{centrality_from_distance, gene_target_score, pathway_overlap_score};
use crate::weights::WeightVector;

/// Ranks drugs against one disease.
pub struct CandidateScorer {
    weights: WeightVector,
    high_tier: f64,
    medium_tier: f64,
    priors: Box<dyn LiteraturePrior>,
}

impl Default for CandidateScorer {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl CandidateScorer {
    /// Scorer with configured weights and tiers and the built-in literature table.
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            weights: WeightVector::from(&config.weights),
            high_tier: config.high_tier,
            medium_tier: config.medium_tier,
            priors: Box::new(KnownRepurposing::default()),
        }
    }

    pub fn with_priors(mut self, priors: impl LiteraturePrior + 'static) -> Self {
        self.priors = Box::new(priors);
        self
    }

    pub fn with_weights(mut self, weights: WeightVector) -> Self {
        self.weights = weights;
        self
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    /// Score one drug against the disease.
    pub fn score_drug(
        &self,
        disease: &DiseaseProfile,
        graph: &KnowledgeGraph,
        drug: &DrugRecord,
    ) -> DrugCandidate {
        self.score_with(disease, graph, &graph.distances_from(&disease.name), drug)
    }

    fn score_with(
        &self,
        disease: &DiseaseProfile,
        graph: &KnowledgeGraph,
        distances: &DiseaseDistances<'_>,
        drug: &DrugRecord,
    ) -> DrugCandidate {
        let shared_genes = graph.get_shared_genes(&drug.id, &disease.name);
        let shared_pathways = graph.get_shared_pathways(&drug.id, &disease.name);

        let union_pathways = lowercase_union(&disease.pathways, &drug.pathways);

        let scores = SubScores {
            gene_target: gene_target_score(shared_genes.len(), disease.genes.len()),
            pathway_overlap: pathway_overlap_score(shared_pathways.len(), union_pathways),
            graph_centrality: centrality_from_distance(distances.to_drug(&drug.id)),
            literature: self.priors.prior(&drug.id, &disease.name),
        };
        let composite = self.weights.combine(&scores);
        let confidence = ConfidenceTier::from_score(composite, self.high_tier, self.medium_tier);

        debug!(
            drug = %drug.name,
            gene = scores.gene_target,
            pathway = scores.pathway_overlap,
            centrality = scores.graph_centrality,
            literature = scores.literature,
            composite,
            "Scored drug"
        );

        DrugCandidate::from_scores(
            drug,
            scores,
            composite,
            confidence,
            shared_genes.into_iter().collect(),
            shared_pathways.into_iter().collect(),
        )
    }

    /// Score every drug and return at most `top_k` candidates, best first.
    ///
    /// A candidate is kept when its composite score reaches `min_score` or
    /// when it shares at least one gene or pathway with the disease, so low
    /// scoring overlaps stay visible to the safety layer.
    pub fn score(
        &self,
        disease: &DiseaseProfile,
        graph: &KnowledgeGraph,
        drugs: &[DrugRecord],
        top_k: usize,
        min_score: f64,
    ) -> Vec<DrugCandidate> {
        let distances = graph.distances_from(&disease.name);
        let mut candidates: Vec<DrugCandidate> = drugs
            .iter()
            .map(|drug| self.score_with(disease, graph, &distances, drug))
            .filter(|c| c.composite_score >= min_score || c.has_overlap())
            .collect();

        candidates.sort_by(rank_order);
        let kept = candidates.len();
        candidates.truncate(top_k);

        info!(
            disease = %disease.name,
            scored = drugs.len(),
            kept,
            returned = candidates.len(),
            "Candidates ranked"
        );
        candidates
    }
}

/// Composite score descending; ties go to more shared genes, then more
/// shared pathways, then drug name.
fn rank_order(a: &DrugCandidate, b: &DrugCandidate) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| b.shared_genes.len().cmp(&a.shared_genes.len()))
        .then_with(|| b.shared_pathways.len().cmp(&a.shared_pathways.len()))
        .then_with(|| a.drug_name.cmp(&b.drug_name))
}

fn lowercase_union(a: &BTreeSet<String>, b: &BTreeSet<String>) -> usize {
    a.iter()
        .chain(b.iter())
        .map(|p| p.to_lowercase())
        .collect::<BTreeSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use repurpose_kg::build_graph;

    fn disease() -> DiseaseProfile {
        DiseaseProfile::new("Parkinson Disease", "MONDO_0005180")
            .unwrap()
            .with_genes(["SNCA", "LRRK2", "GBA"])
            .with_pathways(["Autophagy"])
    }

    #[test]
    fn test_direct_overlap_gets_full_centrality() {
        let d = disease();
        let drugs = vec![DrugRecord::new("D1", "Alpha").unwrap().with_targets(["SNCA"])];
        let kg = build_graph(&d, &drugs);
        let c = CandidateScorer::default().score_drug(&d, &kg, &drugs[0]);
        assert_eq!(c.graph_centrality_score, 1.0);
        assert_eq!(c.shared_genes, vec!["SNCA"]);
    }

    #[test]
    fn test_no_overlap_scores_zero() {
        let d = disease();
        let drugs = vec![DrugRecord::new("D9", "Nothing").unwrap().with_targets(["XYZ"])];
        let kg = build_graph(&d, &drugs);
        let c = CandidateScorer::default().score_drug(&d, &kg, &drugs[0]);
        assert_eq!(c.composite_score, 0.0);
        assert_eq!(c.confidence, ConfidenceTier::Low);
        assert!(!c.has_overlap());
    }

    #[test]
    fn test_literature_prior_lifts_unconnected_drug() {
        let d = disease();
        let drugs = vec![DrugRecord::new("DB01235", "Levodopa").unwrap()];
        let kg = build_graph(&d, &drugs);
        let c = CandidateScorer::default().score_drug(&d, &kg, &drugs[0]);
        assert_eq!(c.literature_score, 1.0);
        assert_eq!(c.composite_score, 0.15);
    }

    #[test]
    fn test_min_score_keeps_overlap_and_drops_the_rest() {
        let d = disease();
        let drugs = vec![
            DrugRecord::new("D1", "Overlapper").unwrap().with_targets(["GBA"]),
            DrugRecord::new("D2", "Stranger").unwrap().with_targets(["XYZ"]),
        ];
        let kg = build_graph(&d, &drugs);
        let out = CandidateScorer::default().score(&d, &kg, &drugs, 10, 0.9);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].drug_id, "D1");
    }

    #[test]
    fn test_top_k_and_order() {
        let d = disease();
        let drugs = vec![
            DrugRecord::new("D1", "One").unwrap().with_targets(["SNCA"]),
            DrugRecord::new("D2", "Two").unwrap().with_targets(["SNCA", "LRRK2"]),
            DrugRecord::new("D3", "Three").unwrap().with_targets(["SNCA", "LRRK2", "GBA"]),
        ];
        let kg = build_graph(&d, &drugs);
        let out = CandidateScorer::default().score(&d, &kg, &drugs, 2, 0.0);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].drug_id, "D3");
        assert_eq!(out[1].drug_id, "D2");
        assert!(out[0].composite_score >= out[1].composite_score);
    }

    #[test]
    fn test_ties_broken_by_name() {
        let d = disease();
        let drugs = vec![
            DrugRecord::new("D2", "Zeta").unwrap().with_targets(["SNCA"]),
            DrugRecord::new("D1", "Alpha").unwrap().with_targets(["LRRK2"]),
        ];
        let kg = build_graph(&d, &drugs);
        let out = CandidateScorer::default().score(&d, &kg, &drugs, 10, 0.0);
        assert_eq!(out[0].drug_name, "Alpha");
        assert_eq!(out[1].drug_name, "Zeta");
    }

    #[test]
    fn test_custom_priors() {
        let d = disease();
        let drugs = vec![DrugRecord::new("X1", "Custom").unwrap()];
        let kg = build_graph(&d, &drugs);
        let scorer = CandidateScorer::default().with_priors(KnownRepurposing::empty().with("X1", "parkinson", 0.5));
        let c = scorer.score_drug(&d, &kg, &drugs[0]);
        assert_eq!(c.literature_score, 0.5);
        assert_eq!(c.composite_score, 0.075);
    }
}
