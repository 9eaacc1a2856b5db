//! Literature prior for known repurposing cases.
//!
//! Provides an abstraction over prior-evidence sources so the scorer is not
//! tied to the built-in table.

/// Prior evidence that a drug works for a disease.
///
/// Implementations can use:
/// - the curated built-in table
/// - a table loaded from configuration
/// - mock data (testing)
pub trait LiteraturePrior: Send + Sync {
    /// Prior evidence score in [0, 1]; 0 when nothing is known.
    fn prior(&self, drug_id: &str, disease_name: &str) -> f64;
}

/// Known repurposing cases: (drug identifier, disease-name fragment, score).
const KNOWN_REPURPOSING: &[(&str, &str, f64)] = &[
    ("DB01235", "parkinson", 1.0), // Levodopa
    ("DB01367", "parkinson", 1.0), // Rasagiline
    ("DB01037", "parkinson", 1.0), // Selegiline
    ("DB00331", "parkinson", 0.7), // Metformin
    ("DB00331", "diabetes", 1.0),
    ("DB00331", "cancer", 0.7),
    ("DB00331", "aging", 0.6),
    ("DB00877", "parkinson", 0.6), // Rapamycin
    ("DB00877", "cancer", 0.8),
    ("DB00877", "aging", 0.7),
    ("DB00619", "parkinson", 0.5), // Imatinib
    ("DB04868", "parkinson", 0.6), // Nilotinib
    ("DB01356", "parkinson", 0.5), // Lithium
    ("DB01356", "alzheimer", 0.5),
    ("DB00313", "parkinson", 0.4), // Valproic acid
    ("DB01394", "parkinson", 0.4), // Colchicine
    ("DB06742", "parkinson", 0.7), // Ambroxol
    ("DB00201", "parkinson", 0.6), // Caffeine
    ("DB00549", "parkinson", 0.6), // UDCA
    ("DB01276", "parkinson", 0.6), // Exenatide
    ("DB01132", "parkinson", 0.5), // Pioglitazone
    ("DB08826", "parkinson", 0.5), // Deferiprone
];

/// Table of known repurposing cases.
/// A drug matches an entry when its identifier is equal and the entry's
/// fragment occurs in the lower-cased disease name.
#[derive(Debug, Clone)]
pub struct KnownRepurposing {
    entries: Vec<(String, String, f64)>,
}

impl Default for KnownRepurposing {
    fn default() -> Self {
        Self::new(
            KNOWN_REPURPOSING
                .iter()
                .map(|(id, fragment, score)| (id.to_string(), fragment.to_string(), *score)),
        )
    }
}

impl KnownRepurposing {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String, f64)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(id, fragment, score)| (id, fragment.to_lowercase(), score.clamp(0.0, 1.0)))
                .collect(),
        }
    }

    /// An empty table; every prior is 0.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Add a case.
    pub fn with(mut self, drug_id: &str, disease_fragment: &str, score: f64) -> Self {
        self.entries.push((drug_id.to_string(), disease_fragment.to_lowercase(), score.clamp(0.0, 1.0)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LiteraturePrior for KnownRepurposing {
    fn prior(&self, drug_id: &str, disease_name: &str) -> f64 {
        let disease = disease_name.to_lowercase();
        self.entries
            .iter()
            .filter(|(id, fragment, _)| id == drug_id && disease.contains(fragment.as_str()))
            .map(|(_, _, score)| *score)
            .fold(0.0, f64::max)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_case() {
        let priors = KnownRepurposing::default();
        assert_eq!(priors.prior("DB01235", "Parkinson Disease"), 1.0);
    }

    #[test]
    fn test_max_over_matching_entries() {
        let priors = KnownRepurposing::default();
        // both "cancer" (0.7) and "diabetes" (1.0) occur
        assert_eq!(priors.prior("DB00331", "Diabetes-associated cancer"), 1.0);
        assert_eq!(priors.prior("DB00331", "Breast Cancer"), 0.7);
    }

    #[test]
    fn test_unknown_pairs_score_zero() {
        let priors = KnownRepurposing::default();
        assert_eq!(priors.prior("DB01235", "Asthma"), 0.0);
        assert_eq!(priors.prior("CHEMBL25", "Parkinson Disease"), 0.0);
        assert_eq!(KnownRepurposing::empty().prior("DB01235", "Parkinson Disease"), 0.0);
    }

    #[test]
    fn test_custom_entries() {
        let priors = KnownRepurposing::empty().with("D1", "Huntington", 1.4);
        assert_eq!(priors.prior("D1", "huntington disease"), 1.0);
        assert_eq!(priors.len(), 1);
    }
}
