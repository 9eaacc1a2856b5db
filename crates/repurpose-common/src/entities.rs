/// Core data model shared by the graph builder, the scorer and the safety filter.
/// Disease and drug records arrive from the fetch collaborators; candidates and
/// filter decisions are produced here.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RepurposeError, Result};

// ---------------------------------------------------------------------------
// Disease
// ---------------------------------------------------------------------------

/// A disease as supplied by the disease-fetch collaborator.
/// Immutable for the duration of one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseProfile {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Associated gene symbols, most relevant first, no duplicates.
    #[serde(default)]
    pub genes: Vec<String>,
    /// Association strength per gene symbol, in [0, 1].
    #[serde(default)]
    pub gene_scores: HashMap<String, f64>,
    #[serde(default)]
    pub pathways: BTreeSet<String>,
    #[serde(default)]
    pub is_rare: bool,
    #[serde(default)]
    pub active_trials_count: u32,
}

impl DiseaseProfile {
    /// Create an empty profile. The name is the graph key for the disease node,
    /// so it must not be blank.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RepurposeError::InvalidRecord(
                "disease name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            id: id.into(),
            description: String::new(),
            genes: Vec::new(),
            gene_scores: HashMap::new(),
            pathways: BTreeSet::new(),
            is_rare: false,
            active_trials_count: 0,
        })
    }

    /// Append genes in relevance order, skipping symbols already present.
    pub fn with_genes<I, S>(mut self, genes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for gene in genes {
            let gene = gene.into();
            if !self.genes.iter().any(|g| g == &gene) {
                self.genes.push(gene);
            }
        }
        self
    }

    /// Record an association score, clamped to [0, 1].
    pub fn with_gene_score(mut self, gene: impl Into<String>, score: f64) -> Self {
        self.gene_scores.insert(gene.into(), score.clamp(0.0, 1.0));
        self
    }

    pub fn with_pathways<I, S>(mut self, pathways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pathways.extend(pathways.into_iter().map(Into::into));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_active_trials(mut self, count: u32) -> Self {
        self.active_trials_count = count;
        self
    }
}

// ---------------------------------------------------------------------------
// Drug
// ---------------------------------------------------------------------------

/// A drug as supplied by the drug-fetch collaborator.
/// Target and pathway sets only ever grow after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub indication: String,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default = "default_approved")]
    pub approved: bool,
    #[serde(default)]
    pub smiles: Option<String>,
    #[serde(default)]
    pub targets: BTreeSet<String>,
    #[serde(default)]
    pub pathways: BTreeSet<String>,
}

fn default_approved() -> bool { true }

impl DrugRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let name = name.into();
        if id.trim().is_empty() {
            return Err(RepurposeError::InvalidRecord(format!(
                "drug '{name}' has an empty identifier"
            )));
        }
        if name.trim().is_empty() {
            return Err(RepurposeError::InvalidRecord(format!(
                "drug {id} has an empty name"
            )));
        }
        Ok(Self {
            id,
            name,
            indication: String::new(),
            mechanism: String::new(),
            approved: true,
            smiles: None,
            targets: BTreeSet::new(),
            pathways: BTreeSet::new(),
        })
    }

    pub fn with_indication(mut self, indication: impl Into<String>) -> Self {
        self.indication = indication.into();
        self
    }

    pub fn with_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.mechanism = mechanism.into();
        self
    }

    pub fn with_smiles(mut self, smiles: impl Into<String>) -> Self {
        self.smiles = Some(smiles.into());
        self
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_targets(targets);
        self
    }

    pub fn with_pathways<I, S>(mut self, pathways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_pathways(pathways);
        self
    }

    pub fn add_targets<I, S>(&mut self, targets: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.extend(targets.into_iter().map(Into::into));
    }

    pub fn add_pathways<I, S>(&mut self, pathways: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pathways.extend(pathways.into_iter().map(Into::into));
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// The four sub-scores of a drug-disease pair, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub gene_target: f64,
    pub pathway_overlap: f64,
    pub graph_centrality: f64,
    pub literature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    /// Bucket a composite score. `high` and `medium` are inclusive lower bounds.
    pub fn from_score(score: f64, high: f64, medium: f64) -> Self {
        if score >= high {
            ConfidenceTier::High
        } else if score >= medium {
            ConfidenceTier::Medium
        } else {
            ConfidenceTier::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High   => "High",
            ConfidenceTier::Medium => "Medium",
            ConfidenceTier::Low    => "Low",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to 4 decimal places, the precision scores are reported at.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A scored repurposing candidate. Produced by the scorer, annotated by the safety filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrugCandidate {
    pub drug_name: String,
    pub drug_id: String,
    pub original_indication: String,
    pub gene_target_score: f64,
    pub pathway_overlap_score: f64,
    pub graph_centrality_score: f64,
    pub literature_score: f64,
    pub composite_score: f64,
    pub confidence: ConfidenceTier,
    pub shared_genes: Vec<String>,
    pub shared_pathways: Vec<String>,
    pub mechanism: String,
    /// Filled in later by the explanation collaborator.
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub smiles: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraindication: Option<ContraindicationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safety_warning: Option<String>,
}

impl DrugCandidate {
    /// Create an unscored candidate. Used by callers that assemble candidates
    /// outside the scorer; blank identifiers are rejected here rather than
    /// surfacing later inside filtering.
    pub fn new(drug_name: impl Into<String>, drug_id: impl Into<String>) -> Result<Self> {
        let drug_name = drug_name.into();
        let drug_id = drug_id.into();
        if drug_name.trim().is_empty() || drug_id.trim().is_empty() {
            return Err(RepurposeError::InvalidRecord(format!(
                "candidate requires a drug name and id (got name='{drug_name}', id='{drug_id}')"
            )));
        }
        Ok(Self {
            drug_name,
            drug_id,
            original_indication: String::new(),
            gene_target_score: 0.0,
            pathway_overlap_score: 0.0,
            graph_centrality_score: 0.0,
            literature_score: 0.0,
            composite_score: 0.0,
            confidence: ConfidenceTier::Low,
            shared_genes: Vec::new(),
            shared_pathways: Vec::new(),
            mechanism: String::new(),
            explanation: String::new(),
            smiles: None,
            contraindication: None,
            safety_warning: None,
        })
    }

    /// Build a candidate from a validated drug record and its computed scores.
    pub fn from_scores(
        drug: &DrugRecord,
        scores: SubScores,
        composite_score: f64,
        confidence: ConfidenceTier,
        shared_genes: Vec<String>,
        shared_pathways: Vec<String>,
    ) -> Self {
        Self {
            drug_name: drug.name.clone(),
            drug_id: drug.id.clone(),
            original_indication: drug.indication.clone(),
            gene_target_score: round4(scores.gene_target),
            pathway_overlap_score: round4(scores.pathway_overlap),
            graph_centrality_score: round4(scores.graph_centrality),
            literature_score: round4(scores.literature),
            composite_score: round4(composite_score),
            confidence,
            shared_genes,
            shared_pathways,
            mechanism: drug.mechanism.clone(),
            explanation: String::new(),
            smiles: drug.smiles.clone(),
            contraindication: None,
            safety_warning: None,
        }
    }

    pub fn with_mechanism(mut self, mechanism: impl Into<String>) -> Self {
        self.mechanism = mechanism.into();
        self
    }

    pub fn with_indication(mut self, indication: impl Into<String>) -> Self {
        self.original_indication = indication.into();
        self
    }

    pub fn has_overlap(&self) -> bool {
        !self.shared_genes.is_empty() || !self.shared_pathways.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Safety
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Must never be used for the disease.
    Absolute,
    /// Use only with explicit caution.
    Relative,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Absolute => "absolute",
            Severity::Relative => "relative",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named sections of a structured drug label, in scan order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSection {
    Contraindications,
    BoxedWarning,
    WarningsAndPrecautions,
    Warnings,
}

impl LabelSection {
    pub const SCAN_ORDER: [LabelSection; 4] = [
        LabelSection::Contraindications,
        LabelSection::BoxedWarning,
        LabelSection::WarningsAndPrecautions,
        LabelSection::Warnings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelSection::Contraindications      => "contraindications",
            LabelSection::BoxedWarning           => "boxed_warning",
            LabelSection::WarningsAndPrecautions => "warnings_and_precautions",
            LabelSection::Warnings               => "warnings",
        }
    }
}

/// Label text supplied by the label-fetch collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugLabel {
    pub contraindications: Option<String>,
    pub boxed_warning: Option<String>,
    pub warnings_and_precautions: Option<String>,
    pub warnings: Option<String>,
}

impl DrugLabel {
    pub fn section(&self, section: LabelSection) -> Option<&str> {
        match section {
            LabelSection::Contraindications      => self.contraindications.as_deref(),
            LabelSection::BoxedWarning           => self.boxed_warning.as_deref(),
            LabelSection::WarningsAndPrecautions => self.warnings_and_precautions.as_deref(),
            LabelSection::Warnings               => self.warnings.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        LabelSection::SCAN_ORDER.iter().all(|s| self.section(*s).is_none())
    }
}

/// What evidence a safety decision was based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "section")]
pub enum MatchSource {
    Withdrawn,
    Name,
    Mechanism,
    Class,
    Label(LabelSection),
}

/// Contraindication details attached to a candidate that matched a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContraindicationInfo {
    pub severity: Severity,
    pub reason: String,
    pub matched_on: MatchSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    Removed,
    KeptWithWarning,
    /// No evidence found; kept without a warning.
    PassedThrough,
}

/// Per-drug outcome of the safety filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDecision {
    pub drug_name: String,
    pub drug_id: String,
    /// Rule category key, label section name, or "withdrawn".
    pub matched_rule: Option<String>,
    pub severity: Option<Severity>,
    pub reason: Option<String>,
    pub matched_on: Option<MatchSource>,
    pub action: FilterAction,
}

impl FilterDecision {
    pub fn passed_through(candidate: &DrugCandidate) -> Self {
        Self {
            drug_name: candidate.drug_name.clone(),
            drug_id: candidate.drug_id.clone(),
            matched_rule: None,
            severity: None,
            reason: None,
            matched_on: None,
            action: FilterAction::PassedThrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disease_genes_are_unique_and_ordered() {
        let d = DiseaseProfile::new("Parkinson Disease", "MONDO_0005180")
            .unwrap()
            .with_genes(["SNCA", "LRRK2", "SNCA", "GBA"]);
        assert_eq!(d.genes, vec!["SNCA", "LRRK2", "GBA"]);
    }

    #[test]
    fn test_blank_records_rejected() {
        assert!(DiseaseProfile::new("  ", "X").is_err());
        assert!(DrugRecord::new("", "aspirin").is_err());
        assert!(DrugRecord::new("CHEMBL25", " ").is_err());
        assert!(DrugCandidate::new("", "CHEMBL25").is_err());
    }

    #[test]
    fn test_gene_score_clamped() {
        let d = DiseaseProfile::new("X", "1").unwrap().with_gene_score("TP53", 1.7);
        assert_eq!(d.gene_scores["TP53"], 1.0);
    }

    #[test]
    fn test_confidence_tier_boundaries() {
        assert_eq!(ConfidenceTier::from_score(0.65, 0.65, 0.40), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(0.6499, 0.65, 0.40), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(0.40, 0.65, 0.40), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(0.3999, 0.65, 0.40), ConfidenceTier::Low);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn test_label_section_lookup() {
        let label = DrugLabel {
            boxed_warning: Some("Increased mortality".to_string()),
            ..Default::default()
        };
        assert_eq!(label.section(LabelSection::BoxedWarning), Some("Increased mortality"));
        assert!(label.section(LabelSection::Contraindications).is_none());
        assert!(!label.is_empty());
        assert!(DrugLabel::default().is_empty());
    }

    #[test]
    fn test_drug_targets_append_only() {
        let mut drug = DrugRecord::new("CHEMBL1", "imatinib").unwrap().with_targets(["ABL1"]);
        drug.add_targets(["KIT", "ABL1"]);
        assert_eq!(drug.targets.len(), 2);
    }
}
