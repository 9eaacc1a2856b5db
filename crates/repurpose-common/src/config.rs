//! Analysis configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! standard scoring weights and the default safety policy.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RepurposeError, Result};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "REPURPOSE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "repurpose.toml";

/// Complete configuration for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub safety: SafetyConfig,
}

// ── Scoring ───────────────────────────────────────────────────────────────────

/// Candidate scorer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: WeightConfig,

    /// Maximum number of candidates returned
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Composite score below which candidates without any overlap are dropped
    #[serde(default = "default_min_score")]
    pub min_score: f64,

    /// Inclusive lower bound of the High tier
    #[serde(default = "default_high_tier")]
    pub high_tier: f64,

    /// Inclusive lower bound of the Medium tier
    #[serde(default = "default_medium_tier")]
    pub medium_tier: f64,
}

fn default_top_k() -> usize { 10 }
fn default_min_score() -> f64 { 0.3 }
fn default_high_tier() -> f64 { 0.65 }
fn default_medium_tier() -> f64 { 0.40 }

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: WeightConfig::default(),
            top_k: default_top_k(),
            min_score: default_min_score(),
            high_tier: default_high_tier(),
            medium_tier: default_medium_tier(),
        }
    }
}

/// Composite score weights. Should sum to 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightConfig {
    #[serde(default = "default_gene_target_weight")]
    pub gene_target: f64,

    #[serde(default = "default_pathway_overlap_weight")]
    pub pathway_overlap: f64,

    #[serde(default = "default_graph_centrality_weight")]
    pub graph_centrality: f64,

    #[serde(default = "default_literature_weight")]
    pub literature: f64,
}

fn default_gene_target_weight() -> f64 { 0.40 }
fn default_pathway_overlap_weight() -> f64 { 0.35 }
fn default_graph_centrality_weight() -> f64 { 0.10 }
fn default_literature_weight() -> f64 { 0.15 }

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            gene_target: default_gene_target_weight(),
            pathway_overlap: default_pathway_overlap_weight(),
            graph_centrality: default_graph_centrality_weight(),
            literature: default_literature_weight(),
        }
    }
}

// ── Safety ────────────────────────────────────────────────────────────────────

/// Safety filter policy and label lookup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Remove drugs matching an absolute contraindication
    #[serde(default = "default_true")]
    pub remove_absolute: bool,

    /// Remove drugs matching a relative contraindication
    #[serde(default)]
    pub remove_relative: bool,

    /// Consult drug labels for drugs without a rule match
    #[serde(default = "default_true")]
    pub label_lookup: bool,

    /// Per-request timeout for a single label fetch
    #[serde(default = "default_label_timeout")]
    pub label_timeout_secs: u64,

    #[serde(default = "default_label_base_url")]
    pub label_base_url: String,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_label_fetches: usize,

    /// YAML file replacing the built-in contraindication database
    #[serde(default)]
    pub rules_path: Option<String>,
}

fn default_true() -> bool { true }
fn default_label_timeout() -> u64 { 10 }
fn default_label_base_url() -> String { "https://api.fda.gov/drug/label.json".to_string() }
fn default_max_concurrent() -> usize { 8 }

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            remove_absolute: true,
            remove_relative: false,
            label_lookup: true,
            label_timeout_secs: default_label_timeout(),
            label_base_url: default_label_base_url(),
            max_concurrent_label_fetches: default_max_concurrent(),
            rules_path: None,
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl AnalysisConfig {
    /// Load from a TOML file
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a YAML file
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load the file named by `REPURPOSE_CONFIG`, else `repurpose.toml`.
    /// A missing file is not an error; defaults are used.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_path(path)
    }

    /// YAML for `.yaml`/`.yml`, TOML otherwise; defaults when the file is missing.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(Self::default());
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(path),
            _ => Self::from_toml(path),
        }
    }

    /// Reject values that would make scoring meaningless.
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;
        if s.top_k == 0 {
            return Err(RepurposeError::Config("scoring.top_k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&s.min_score) {
            return Err(RepurposeError::Config(format!(
                "scoring.min_score must be in [0, 1], got {}",
                s.min_score
            )));
        }
        if s.medium_tier > s.high_tier {
            return Err(RepurposeError::Config(format!(
                "scoring.medium_tier ({}) exceeds scoring.high_tier ({})",
                s.medium_tier, s.high_tier
            )));
        }
        let w = &s.weights;
        if [w.gene_target, w.pathway_overlap, w.graph_centrality, w.literature]
            .iter()
            .any(|v| *v < 0.0)
        {
            return Err(RepurposeError::Config("scoring weights must be non-negative".to_string()));
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
