//! Weight vector for the composite repurposing score.

use repurpose_common::entities::SubScores;
use repurpose_common::WeightConfig;
use serde::{Deserialize, Serialize};

/// The 4-component weight vector W. Weights sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightVector {
    /// Shared disease genes among the drug's targets
    pub gene_target: f64,
    /// Jaccard overlap of disease and drug pathways
    pub pathway_overlap: f64,
    /// Closeness of drug and disease in the knowledge graph
    pub graph_centrality: f64,
    /// Known repurposing evidence
    pub literature: f64,
}

impl Default for WeightVector {
    fn default() -> Self {
        Self {
            gene_target:      0.40,
            pathway_overlap:  0.35,
            graph_centrality: 0.10,
            literature:       0.15,
        }
    }
}

impl From<&WeightConfig> for WeightVector {
    fn from(cfg: &WeightConfig) -> Self {
        Self {
            gene_target: cfg.gene_target,
            pathway_overlap: cfg.pathway_overlap,
            graph_centrality: cfg.graph_centrality,
            literature: cfg.literature,
        }
    }
}

impl WeightVector {
    /// Validate that all weights sum to ~1.0
    pub fn validate(&self) -> bool {
        (self.as_array().iter().sum::<f64>() - 1.0).abs() < 1e-6
    }

    /// Renormalise weights so they sum to 1.0
    pub fn normalise(&mut self) {
        let sum: f64 = self.as_array().iter().sum();
        if sum > 0.0 {
            self.gene_target      /= sum;
            self.pathway_overlap  /= sum;
            self.graph_centrality /= sum;
            self.literature       /= sum;
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.gene_target, self.pathway_overlap, self.graph_centrality, self.literature]
    }

    /// Weighted sum of the sub-scores (unrounded).
    pub fn combine(&self, scores: &SubScores) -> f64 {
        self.gene_target * scores.gene_target
            + self.pathway_overlap * scores.pathway_overlap
            + self.graph_centrality * scores.graph_centrality
            + self.literature * scores.literature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = WeightVector::default();
        assert!(w.validate(), "Default weights must sum to 1.0");
    }

    #[test]
    fn test_normalise_restores_sum() {
        let mut w = WeightVector::default();
        w.gene_target += 0.10;
        assert!(!w.validate());
        w.normalise();
        assert!(w.validate());
    }

    #[test]
    fn test_combine_all_ones_is_weight_sum() {
        let w = WeightVector::default();
        let s = SubScores { gene_target: 1.0, pathway_overlap: 1.0, graph_centrality: 1.0, literature: 1.0 };
        assert!((w.combine(&s) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_config_matches_default() {
        let w = WeightVector::from(&WeightConfig::default());
        assert_eq!(w.as_array(), WeightVector::default().as_array());
    }
}
