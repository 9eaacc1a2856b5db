//! Sub-score functions for gene overlap, pathway overlap and graph distance.
//! All results are in [0, 1].

/// Single shared pathway is never scored below this.
pub const SINGLE_PATHWAY_FLOOR: f64 = 0.15;
/// Score lost per hop beyond a direct two-hop connection.
pub const HOP_PENALTY: f64 = 0.2;

/// Fraction of disease genes targeted by the drug, boosted for multi-target hits:
/// ×1.5 with three or more shared genes, ×1.2 with exactly two, capped at 1.0.
pub fn gene_target_score(shared_genes: usize, disease_genes: usize) -> f64 {
    if disease_genes == 0 {
        return 0.0;
    }
    let raw = shared_genes as f64 / disease_genes as f64;
    let boosted = match shared_genes {
        n if n >= 3 => raw * 1.5,
        2 => raw * 1.2,
        _ => raw,
    };
    boosted.clamp(0.0, 1.0)
}

/// Jaccard overlap of pathway sets. ×1.4 with three or more shared pathways,
/// ×1.2 with two, floored at 0.15 with exactly one, capped at 1.0.
pub fn pathway_overlap_score(shared_pathways: usize, union_pathways: usize) -> f64 {
    if union_pathways == 0 {
        return 0.0;
    }
    let raw = shared_pathways as f64 / union_pathways as f64;
    let adjusted = match shared_pathways {
        0 => raw,
        1 => raw.max(SINGLE_PATHWAY_FLOOR),
        2 => raw * 1.2,
        _ => raw * 1.4,
    };
    adjusted.clamp(0.0, 1.0)
}

/// Graph centrality from the undirected shortest path length in edges.
///
/// A drug sharing a gene or pathway with the disease is two edges away and
/// scores 1.0; every further hop costs 0.2. Unreachable scores 0.
pub fn centrality_from_distance(distance: Option<usize>) -> f64 {
    match distance {
        Some(edges) => {
            let extra_hops = edges.saturating_sub(2) as f64;
            (1.0 - extra_hops * HOP_PENALTY).max(0.0)
        }
        None => 0.0,
    }
}
