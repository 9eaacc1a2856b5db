//! Gene symbol → biological pathway lookup.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use ahash::AHashMap;
use repurpose_common::Result;

/// Returned when none of the queried genes is in the table, so overlap
/// denominators never collapse to an empty set.
pub const FALLBACK_PATHWAY: &str = "General cellular signaling";

/// At most this many disease genes are mapped.
const MAX_DISEASE_GENES: usize = 50;
/// At most this many drug targets are mapped.
const MAX_DRUG_TARGETS: usize = 20;

/// Curated gene → pathway table.
const PATHWAY_TABLE: &[(&str, &[&str])] = &[
    // Neurodegeneration & Parkinson's
    ("SNCA", &["Alpha-synuclein aggregation", "Dopamine metabolism", "Autophagy"]),
    ("LRRK2", &["Autophagy", "Mitochondrial function", "Vesicle trafficking"]),
    ("PRKN", &["Mitophagy", "Ubiquitin-proteasome system"]),
    ("PINK1", &["Mitophagy", "Mitochondrial quality control"]),
    ("PARK7", &["Oxidative stress response", "Mitochondrial function"]),
    ("DJ1", &["Oxidative stress response", "Mitochondrial function"]),
    ("GBA", &["Lysosomal function", "Sphingolipid metabolism", "Autophagy"]),
    ("GBA1", &["Lysosomal function", "Sphingolipid metabolism", "Autophagy"]),
    ("MAOB", &["Dopamine metabolism", "Monoamine oxidase"]),
    ("TH", &["Dopamine biosynthesis", "Catecholamine synthesis"]),
    ("DDC", &["Dopamine biosynthesis", "Neurotransmitter synthesis"]),
    // Lysosomal
    ("LAMP1", &["Lysosomal function", "Autophagy"]),
    ("LAMP2", &["Autophagy", "Lysosomal membrane"]),
    ("ATP7B", &["Copper metabolism", "Metal ion homeostasis"]),
    ("NPC1", &["Cholesterol trafficking", "Lysosomal function"]),
    ("NPC2", &["Cholesterol metabolism", "Lipid transport"]),
    // Huntington's
    ("HTT", &["Huntingtin aggregation", "Ubiquitin-proteasome system"]),
    // Alzheimer's
    ("APP", &["Amyloid-beta production", "APP processing"]),
    ("MAPT", &["Tau protein function", "Microtubule stability"]),
    ("PSEN1", &["Amyloid-beta production", "Gamma-secretase complex"]),
    ("PSEN2", &["Amyloid-beta production", "Gamma-secretase complex"]),
    ("APOE", &["Lipid metabolism", "Amyloid-beta clearance"]),
    // Muscle / ion transport
    ("DMD", &["Dystrophin-glycoprotein complex", "Muscle fiber integrity"]),
    ("CFTR", &["Chloride ion transport", "CFTR trafficking"]),
    // Signaling
    ("EGFR", &["EGFR signaling", "MAPK signaling"]),
    ("KRAS", &["RAS signaling", "MAPK signaling"]),
    ("PIK3CA", &["PI3K-Akt signaling", "mTOR signaling"]),
    ("PTEN", &["PI3K-Akt signaling", "Cell growth regulation"]),
    ("MTOR", &["mTOR signaling", "Autophagy", "Protein synthesis"]),
    ("TP53", &["p53 signaling", "Apoptosis", "DNA damage response"]),
    // Inflammation
    ("TNF", &["TNF signaling", "NF-κB signaling", "Inflammatory response"]),
    ("IL6", &["JAK-STAT signaling", "Cytokine signaling"]),
    ("NFKB1", &["NF-κB signaling", "Inflammatory response"]),
];

/// Static gene → pathway mapper. Lookups are case-insensitive on the gene symbol.
#[derive(Debug, Clone)]
pub struct PathwayMapper {
    table: AHashMap<String, Vec<String>>,
    fallback: String,
}

impl Default for PathwayMapper {
    fn default() -> Self {
        Self::from_entries(
            PATHWAY_TABLE
                .iter()
                .map(|(gene, pathways)| (gene.to_string(), pathways.iter().map(|p| p.to_string()).collect())),
        )
    }
}

impl PathwayMapper {
    /// Build a mapper from (gene, pathways) entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let table = entries
            .into_iter()
            .map(|(gene, pathways)| (gene.to_uppercase(), pathways))
            .collect();
        Self { table, fallback: FALLBACK_PATHWAY.to_string() }
    }

    /// Load a `gene: [pathway, ...]` YAML mapping.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table: BTreeMap<String, Vec<String>> = serde_yaml::from_str(&content)?;
        Ok(Self::from_entries(table))
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Pathways for a single gene, if it is in the table.
    pub fn pathways_for(&self, gene: &str) -> Option<&[String]> {
        self.table.get(&gene.to_uppercase()).map(Vec::as_slice)
    }

    /// Union of pathways for all known genes; the fallback pathway alone when
    /// no gene is known. Unknown genes are ignored.
    pub fn map_genes<S: AsRef<str>>(&self, genes: &[S]) -> BTreeSet<String> {
        let mut pathways: BTreeSet<String> = genes
            .iter()
            .filter_map(|g| self.pathways_for(g.as_ref()))
            .flatten()
            .cloned()
            .collect();
        if pathways.is_empty() {
            pathways.insert(self.fallback.clone());
        }
        pathways
    }

    /// Disease enrichment: maps the most relevant genes only.
    pub fn map_disease_genes<S: AsRef<str>>(&self, genes: &[S]) -> BTreeSet<String> {
        let n = genes.len().min(MAX_DISEASE_GENES);
        self.map_genes(&genes[..n])
    }

    /// Drug target inference: each target is mapped on its own, so an
    /// unknown target contributes the fallback pathway even when other
    /// targets are known.
    pub fn infer_from_targets<'a, I>(&self, targets: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        targets
            .into_iter()
            .take(MAX_DRUG_TARGETS)
            .flat_map(|t| self.map_genes(std::slice::from_ref(t)))
            .collect()
    }
}
