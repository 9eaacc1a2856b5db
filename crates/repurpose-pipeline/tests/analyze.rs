//! End-to-end analysis over in-memory disease and drug records.

use std::sync::Arc;

use repurpose_common::{
    AnalysisConfig, DiseaseProfile, DrugLabel, DrugRecord, FilterAction, Severity,
};
use repurpose_pipeline::{analyze, Pipeline};
use repurpose_safety::{SafetyFilter, StaticLabelSource};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn parkinson(genes: &[&str]) -> DiseaseProfile {
    DiseaseProfile::new("Parkinson Disease", "MONDO_0005180")
        .unwrap()
        .with_genes(genes.iter().copied())
        .with_description("A progressive neurodegenerative movement disorder")
}

#[tokio::test]
async fn ranks_multi_gene_drug_above_single_pathway_drug() {
    init_tracing();
    let disease = parkinson(&["SNCA", "LRRK2", "GBA"]).with_pathways(["Autophagy"]);
    let drugs = vec![
        DrugRecord::new("DRUG_B", "Drug B")
            .unwrap()
            .with_targets(["GBA"])
            .with_pathways([
                "Autophagy",
                "Lysosomal function",
                "Sphingolipid metabolism",
                "Inflammation",
                "Apoptosis",
                "Oxidative stress",
                "Calcium signaling",
                "Insulin signaling",
            ]),
        DrugRecord::new("DRUG_A", "Drug A").unwrap().with_targets(["SNCA", "LRRK2"]),
    ];

    let filter = SafetyFilter::default().with_label_source(Arc::new(StaticLabelSource::new()));
    let pipeline = Pipeline::new(AnalysisConfig::default(), filter).unwrap();
    let report = pipeline.analyze(disease, drugs).await;

    let ids: Vec<_> = report.candidates.iter().map(|c| c.drug_id.as_str()).collect();
    assert_eq!(ids, vec!["DRUG_A", "DRUG_B"]);
    assert_eq!(report.candidates[0].gene_target_score, 0.8);
    assert_eq!(report.candidates[1].pathway_overlap_score, 0.15);
    assert!(report.filtered_out.is_empty());
    assert!(report.metadata.label_lookup_used);
    assert_eq!(report.metadata.canonical_disease_key.as_deref(), Some("parkinson"));
    assert_eq!(report.disease.gene_count, 3);
}

#[tokio::test]
async fn contraindicated_and_withdrawn_drugs_are_filtered_out() {
    init_tracing();
    let disease = parkinson(&["SNCA", "DRD2", "ACHE", "PTGS2"]);
    let drugs = vec![
        DrugRecord::new("DB00502", "Haloperidol")
            .unwrap()
            .with_targets(["DRD2"])
            .with_mechanism("Dopamine D2 receptor antagonist"),
        DrugRecord::new("DB00843", "Donepezil")
            .unwrap()
            .with_targets(["ACHE"])
            .with_mechanism("Acetylcholinesterase inhibitor"),
        DrugRecord::new("DB00533", "Rofecoxib").unwrap().with_targets(["PTGS2"]),
    ];

    let report = analyze(disease, drugs, &AnalysisConfig::default(), &SafetyFilter::default())
        .await
        .unwrap();

    let removed: Vec<_> = report.filtered_out.iter().map(|c| c.drug_name.as_str()).collect();
    assert!(removed.contains(&"Haloperidol"));
    assert!(removed.contains(&"Rofecoxib"));

    let donepezil = report
        .candidates
        .iter()
        .find(|c| c.drug_name == "Donepezil")
        .unwrap();
    assert!(donepezil.safety_warning.is_some());
    assert_eq!(donepezil.contraindication.as_ref().unwrap().severity, Severity::Relative);

    assert_eq!(
        report.candidates.len() + report.filtered_out.len(),
        report.metadata.candidates_scored
    );
    assert_eq!(report.decisions.len(), report.metadata.candidates_scored);
    assert!(!report.metadata.label_lookup_used);
}

#[tokio::test]
async fn label_hit_removes_drug_without_rule() {
    init_tracing();
    let disease = DiseaseProfile::new("Primary open-angle glaucoma", "MONDO_0005041")
        .unwrap()
        .with_genes(["MYOC", "OPTN"]);
    let drugs = vec![DrugRecord::new("DB00273", "Topiramate").unwrap().with_targets(["MYOC"])];
    let label = DrugLabel {
        warnings_and_precautions: Some("Secondary angle closure glaucoma has been reported.".to_string()),
        ..Default::default()
    };
    let filter = SafetyFilter::default()
        .with_label_source(Arc::new(StaticLabelSource::new().with("topiramate", label)));

    let report = analyze(disease, drugs, &AnalysisConfig::default(), &filter).await.unwrap();
    assert!(report.candidates.is_empty());
    assert_eq!(report.filtered_out.len(), 1);
    assert_eq!(report.decisions[0].action, FilterAction::Removed);
    assert_eq!(report.decisions[0].severity, Some(Severity::Absolute));
}

#[tokio::test]
async fn label_lookup_disabled_skips_layer_two() {
    let disease = DiseaseProfile::new("Glaucoma", "MONDO_0005041").unwrap().with_genes(["MYOC"]);
    let drugs = vec![DrugRecord::new("DB00273", "Topiramate").unwrap().with_targets(["MYOC"])];
    let label = DrugLabel {
        contraindications: Some("Glaucoma.".to_string()),
        ..Default::default()
    };
    let source = Arc::new(StaticLabelSource::new().with("topiramate", label));
    let filter = SafetyFilter::default().with_label_source(source.clone());

    let mut config = AnalysisConfig::default();
    config.safety.label_lookup = false;
    let report = analyze(disease, drugs, &config, &filter).await.unwrap();

    assert_eq!(report.candidates.len(), 1);
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn report_serialises_to_json() {
    let disease = parkinson(&["SNCA"]);
    let drugs = vec![DrugRecord::new("DB06742", "Ambroxol").unwrap()];
    let report = analyze(disease, drugs, &AnalysisConfig::default(), &SafetyFilter::default())
        .await
        .unwrap();

    // ambroxol gains its curated targets during enrichment
    assert_eq!(report.metadata.graph.drugs, 1);
    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["candidates"].is_array());
    assert!(value["filtered_out"].is_array());
    assert_eq!(value["disease"]["name"], "Parkinson Disease");
}
