//! Scoring over a built graph: boosts, floors and ranking.

use repurpose_common::{ConfidenceTier, DiseaseProfile, DrugRecord};
use repurpose_kg::build_graph;
use repurpose_ranker::CandidateScorer;

fn parkinson() -> DiseaseProfile {
    DiseaseProfile::new("Parkinson Disease", "MONDO_0005180")
        .unwrap()
        .with_genes(["SNCA", "LRRK2", "GBA"])
        .with_pathways(["Autophagy"])
}

fn drug_a() -> DrugRecord {
    DrugRecord::new("DRUG_A", "Drug A").unwrap().with_targets(["SNCA", "LRRK2"])
}

fn drug_b() -> DrugRecord {
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
        ])
}

#[test]
fn multi_gene_drug_outranks_single_pathway_drug() {
    let disease = parkinson();
    let drugs = vec![drug_b(), drug_a()];
    let graph = build_graph(&disease, &drugs);
    let ranked = CandidateScorer::default().score(&disease, &graph, &drugs, 10, 0.3);

    assert_eq!(ranked.len(), 2);
    let (a, b) = (&ranked[0], &ranked[1]);
    assert_eq!(a.drug_id, "DRUG_A");
    assert_eq!(b.drug_id, "DRUG_B");

    // 2/3 shared genes, ×1.2
    assert_eq!(a.gene_target_score, 0.8);
    assert_eq!(a.shared_genes, vec!["LRRK2", "SNCA"]);
    assert_eq!(a.graph_centrality_score, 1.0);
    assert_eq!(a.composite_score, 0.42);
    assert_eq!(a.confidence, ConfidenceTier::Medium);

    // Jaccard 1/8 lifted to the single-pathway floor
    assert_eq!(b.pathway_overlap_score, 0.15);
    assert_eq!(b.shared_pathways, vec!["Autophagy"]);
    // below min_score, kept because it overlaps
    assert_eq!(b.composite_score, 0.2858);
    assert_eq!(b.confidence, ConfidenceTier::Low);
}

#[test]
fn sub_scores_stay_in_unit_interval() {
    let disease = parkinson();
    let drugs = vec![
        drug_a(),
        drug_b(),
        DrugRecord::new("ALL", "Everything")
            .unwrap()
            .with_targets(["SNCA", "LRRK2", "GBA"])
            .with_pathways(["Autophagy"]),
        DrugRecord::new("DB01235", "Levodopa").unwrap(),
    ];
    let graph = build_graph(&disease, &drugs);
    for c in CandidateScorer::default().score(&disease, &graph, &drugs, 10, 0.0) {
        for s in [c.gene_target_score, c.pathway_overlap_score, c.graph_centrality_score, c.literature_score] {
            assert!((0.0..=1.0).contains(&s), "{} sub-score {s}", c.drug_name);
        }
        assert!(c.composite_score <= 1.0);
    }
}

#[test]
fn disconnected_drug_gets_zero_centrality() {
    let disease = parkinson();
    let drugs = vec![DrugRecord::new("X", "Loner").unwrap().with_targets(["ZZZ9"])];
    let graph = build_graph(&disease, &drugs);
    let c = CandidateScorer::default().score_drug(&disease, &graph, &drugs[0]);
    assert_eq!(c.graph_centrality_score, 0.0);
}

#[test]
fn drug_missing_from_graph_scores_zero() {
    let disease = parkinson();
    let graph = build_graph(&disease, &[]);
    let stray = DrugRecord::new("NOT_IN_GRAPH", "Stray").unwrap().with_targets(["SNCA"]);
    let c = CandidateScorer::default().score_drug(&disease, &graph, &stray);
    assert_eq!(c.graph_centrality_score, 0.0);
    assert!(c.shared_genes.is_empty());
}

#[test]
fn two_hop_via_other_drug_target_costs_centrality() {
    // disease -> SNCA <- bridge -> KIT <- far : four edges
    let disease = parkinson();
    let drugs = vec![
        DrugRecord::new("BRIDGE", "Bridge").unwrap().with_targets(["SNCA", "KIT"]),
        DrugRecord::new("FAR", "Far").unwrap().with_targets(["KIT"]),
    ];
    let graph = build_graph(&disease, &drugs);
    let c = CandidateScorer::default().score_drug(&disease, &graph, &drugs[1]);
    assert_eq!(c.graph_centrality_score, 0.6);
}

#[test]
fn ranking_reuses_one_distance_pass_for_every_drug() {
    let disease = parkinson();
    let drugs = vec![
        DrugRecord::new("BRIDGE", "Bridge").unwrap().with_targets(["SNCA", "KIT"]),
        DrugRecord::new("FAR", "Far").unwrap().with_targets(["KIT"]),
        DrugRecord::new("X", "Loner").unwrap().with_targets(["ZZZ9"]),
    ];
    let graph = build_graph(&disease, &drugs);
    let scorer = CandidateScorer::default();
    let ranked = scorer.score(&disease, &graph, &drugs, 10, 0.0);

    let centrality = |id: &str| ranked.iter().find(|c| c.drug_id == id).map(|c| c.graph_centrality_score);
    assert_eq!(centrality("BRIDGE"), Some(1.0));
    assert_eq!(centrality("FAR"), Some(0.6));
    assert_eq!(centrality("X"), Some(0.0));
    for drug in &drugs {
        assert_eq!(
            centrality(&drug.id),
            Some(scorer.score_drug(&disease, &graph, drug).graph_centrality_score)
        );
    }
}
