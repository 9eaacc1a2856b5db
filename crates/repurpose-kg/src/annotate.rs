//! Keyword-driven annotation of fetched disease and drug records.

use repurpose_common::{DiseaseProfile, DrugRecord};
use tracing::{debug, info};

use crate::pathways::PathwayMapper;

/// Terms in a disease name or description that mark it as rare.
const RARE_KEYWORDS: &[&str] = &[
    "rare",
    "orphan",
    "syndrome",
    "dystrophy",
    "atrophy",
    "familial",
    "congenital",
    "hereditary",
    "genetic disorder",
    "lysosomal storage",
    "mitochondrial",
    "metabolic disorder",
];

/// Curated targets for well-characterised drugs, used when the interaction
/// source returned nothing for them.
const KNOWN_DRUG_TARGETS: &[(&str, &[&str])] = &[
    ("NILOTINIB", &["ABL1", "KIT", "PDGFRA", "LRRK2", "DDR1"]),
    ("AMBROXOL", &["GBA", "GBA1", "LAMP1", "LAMP2"]),
    ("METFORMIN", &["PRKAA1", "PRKAA2", "GPD1"]),
    ("IMATINIB", &["ABL1", "KIT", "PDGFRA", "LRRK2"]),
    ("EXENATIDE", &["GLP1R", "INS"]),
    ("RASAGILINE", &["MAOB"]),
    ("SELEGILINE", &["MAOB"]),
    ("DONEPEZIL", &["ACHE"]),
    ("MEMANTINE", &["GRIN1", "GRIN2A", "GRIN2B"]),
    ("RIVASTIGMINE", &["ACHE", "BCHE"]),
    ("ASPIRIN", &["PTGS1", "PTGS2"]),
    ("IBUPROFEN", &["PTGS1", "PTGS2"]),
];

/// Whether the disease name or description carries a rare-disease keyword.
pub fn is_rare_disease(name: &str, description: &str) -> bool {
    let name = name.to_lowercase();
    let description = description.to_lowercase();
    RARE_KEYWORDS
        .iter()
        .any(|kw| name.contains(kw) || description.contains(kw))
}

/// Fill in pathways (when the fetcher left them empty) and the rare flag.
pub fn annotate_disease(mut disease: DiseaseProfile, mapper: &PathwayMapper) -> DiseaseProfile {
    if disease.pathways.is_empty() && !disease.genes.is_empty() {
        disease.pathways = mapper.map_disease_genes(&disease.genes);
    }
    if !disease.is_rare && is_rare_disease(&disease.name, &disease.description) {
        info!(disease = %disease.name, "Identified as rare disease");
        disease.is_rare = true;
    }
    disease
}

fn known_targets(drug_name: &str) -> Option<&'static [&'static str]> {
    let upper = drug_name.to_uppercase();
    KNOWN_DRUG_TARGETS
        .iter()
        .find(|(known, _)| upper.contains(known) || known.contains(upper.as_str()))
        .map(|(_, targets)| *targets)
}

/// Give target-less drugs their curated targets and infer pathways for any
/// drug that has targets but no pathways. Only ever adds. Returns the number
/// of drugs that gained targets.
pub fn enrich_drugs(drugs: &mut [DrugRecord], mapper: &PathwayMapper) -> usize {
    let mut enriched = 0;
    for drug in drugs.iter_mut() {
        if drug.targets.is_empty() {
            if let Some(targets) = known_targets(&drug.name) {
                drug.add_targets(targets.iter().copied());
                enriched += 1;
                debug!(drug = %drug.name, n = targets.len(), "Added curated targets");
            }
        }
        if drug.pathways.is_empty() && !drug.targets.is_empty() {
            let pathways = mapper.infer_from_targets(&drug.targets);
            drug.add_pathways(pathways);
        }
    }
    enriched
}
