//! Disease / gene / pathway / drug multigraph.
//!
//! Edges are directed from the disease or drug towards its genes and pathways.
//! Distance queries run over the undirected projection, so a drug sharing a
//! gene with the disease sits two hops away from it.

use std::collections::{BTreeSet, VecDeque};

use ahash::{AHashMap, AHashSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use repurpose_common::{DiseaseProfile, DrugRecord};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Disease,
    Gene,
    Pathway,
    Drug,
}

/// A graph node. The stable key is the disease name, gene symbol,
/// pathway name or drug identifier respectively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KgNode {
    Disease { name: String, id: String },
    Gene { symbol: String },
    Pathway { name: String },
    Drug { id: String, name: String },
}

impl KgNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            KgNode::Disease { .. } => NodeKind::Disease,
            KgNode::Gene { .. }    => NodeKind::Gene,
            KgNode::Pathway { .. } => NodeKind::Pathway,
            KgNode::Drug { .. }    => NodeKind::Drug,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            KgNode::Disease { name, .. } => name,
            KgNode::Gene { symbol }      => symbol,
            KgNode::Pathway { name }     => name,
            KgNode::Drug { id, .. }      => id,
        }
    }
}

/// Edge relation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// disease → gene
    Association,
    /// disease → pathway
    Enrichment,
    /// drug → gene
    Target,
    /// drug → pathway
    InferredPathway,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub diseases: usize,
    pub genes: usize,
    pub pathways: usize,
    pub drugs: usize,
    pub edges: usize,
}

type LookupKey = (NodeKind, String);

/// Typed multigraph of one disease and its candidate drugs.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<KgNode, Relation>,
    /// (kind, lower-cased key) → node
    index: AHashMap<LookupKey, NodeIndex>,
    /// lower-cased drug name → drug node
    drug_names: AHashMap<String, NodeIndex>,
    /// Guards against duplicate edges of the same relation.
    edge_set: AHashSet<(NodeIndex, NodeIndex, Relation)>,
}

/// Build the graph for one disease and its candidate drugs.
/// Identical inputs always produce identical node and edge sets.
pub fn build_graph(disease: &DiseaseProfile, drugs: &[DrugRecord]) -> KnowledgeGraph {
    let mut kg = KnowledgeGraph::default();

    let disease_ix = kg.add_node(KgNode::Disease {
        name: disease.name.clone(),
        id: disease.id.clone(),
    });
    for gene in &disease.genes {
        let gene_ix = kg.add_node(KgNode::Gene { symbol: gene.clone() });
        kg.add_edge(disease_ix, gene_ix, Relation::Association);
    }
    for pathway in &disease.pathways {
        let pathway_ix = kg.add_node(KgNode::Pathway { name: pathway.clone() });
        kg.add_edge(disease_ix, pathway_ix, Relation::Enrichment);
    }

    for drug in drugs {
        let drug_ix = kg.add_node(KgNode::Drug {
            id: drug.id.clone(),
            name: drug.name.clone(),
        });
        for target in &drug.targets {
            let gene_ix = kg.add_node(KgNode::Gene { symbol: target.clone() });
            kg.add_edge(drug_ix, gene_ix, Relation::Target);
        }
        for pathway in &drug.pathways {
            let pathway_ix = kg.add_node(KgNode::Pathway { name: pathway.clone() });
            kg.add_edge(drug_ix, pathway_ix, Relation::InferredPathway);
        }
    }

    let stats = kg.stats();
    info!(
        disease = %disease.name,
        genes = stats.genes,
        pathways = stats.pathways,
        drugs = stats.drugs,
        edges = stats.edges,
        "Knowledge graph built"
    );
    kg
}

impl KnowledgeGraph {
    /// Insert a node, or return the existing node with the same kind and
    /// case-insensitive key. The first casing seen is the one stored.
    fn add_node(&mut self, node: KgNode) -> NodeIndex {
        let lookup = (node.kind(), node.key().to_lowercase());
        if let Some(&ix) = self.index.get(&lookup) {
            return ix;
        }
        let drug_name = match &node {
            KgNode::Drug { name, .. } => Some(name.to_lowercase()),
            _ => None,
        };
        let ix = self.graph.add_node(node);
        self.index.insert(lookup, ix);
        if let Some(name) = drug_name {
            self.drug_names.entry(name).or_insert(ix);
        }
        ix
    }

    fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, relation: Relation) {
        if self.edge_set.insert((from, to, relation)) {
            self.graph.add_edge(from, to, relation);
        }
    }

    fn find(&self, kind: NodeKind, key: &str) -> Option<NodeIndex> {
        self.index.get(&(kind, key.to_lowercase())).copied()
    }

    /// Resolve a drug by identifier, falling back to its name.
    fn find_drug(&self, drug: &str) -> Option<NodeIndex> {
        self.find(NodeKind::Drug, drug)
            .or_else(|| self.drug_names.get(&drug.to_lowercase()).copied())
    }

    pub fn node(&self, kind: NodeKind, key: &str) -> Option<&KgNode> {
        let ix = match kind {
            NodeKind::Drug => self.find_drug(key)?,
            _ => self.find(kind, key)?,
        };
        self.graph.node_weight(ix)
    }

    pub fn contains(&self, kind: NodeKind, key: &str) -> bool {
        self.node(kind, key).is_some()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats { edges: self.graph.edge_count(), ..Default::default() };
        for node in self.graph.node_weights() {
            match node.kind() {
                NodeKind::Disease => stats.diseases += 1,
                NodeKind::Gene    => stats.genes += 1,
                NodeKind::Pathway => stats.pathways += 1,
                NodeKind::Drug    => stats.drugs += 1,
            }
        }
        stats
    }

    /// All nodes as (kind, key), ordered.
    pub fn node_keys(&self) -> BTreeSet<(NodeKind, String)> {
        self.graph
            .node_weights()
            .map(|n| (n.kind(), n.key().to_string()))
            .collect()
    }

    /// All edges as (source key, target key, relation), ordered.
    pub fn edge_triples(&self) -> BTreeSet<(String, String, Relation)> {
        self.graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].key().to_string(),
                    self.graph[e.target()].key().to_string(),
                    *e.weight(),
                )
            })
            .collect()
    }

    /// Indices of `kind` nodes reached from `from` over outgoing `relation` edges.
    fn outgoing(&self, from: NodeIndex, relation: Relation, kind: NodeKind) -> BTreeSet<NodeIndex> {
        self.graph
            .edges_directed(from, Direction::Outgoing)
            .filter(|e| *e.weight() == relation && self.graph[e.target()].kind() == kind)
            .map(|e| e.target())
            .collect()
    }

    fn shared(
        &self,
        drug: &str,
        disease: &str,
        drug_relation: Relation,
        disease_relation: Relation,
        kind: NodeKind,
    ) -> BTreeSet<String> {
        let (Some(drug_ix), Some(disease_ix)) = (self.find_drug(drug), self.find(NodeKind::Disease, disease)) else {
            return BTreeSet::new();
        };
        let drug_side = self.outgoing(drug_ix, drug_relation, kind);
        let disease_side = self.outgoing(disease_ix, disease_relation, kind);
        drug_side
            .intersection(&disease_side)
            .map(|ix| self.graph[*ix].key().to_string())
            .collect()
    }

    /// Genes targeted by the drug and associated with the disease.
    /// Lookups ignore case; results carry the stored casing.
    pub fn get_shared_genes(&self, drug: &str, disease: &str) -> BTreeSet<String> {
        self.shared(drug, disease, Relation::Target, Relation::Association, NodeKind::Gene)
    }

    /// Pathways inferred for the drug and enriched for the disease.
    pub fn get_shared_pathways(&self, drug: &str, disease: &str) -> BTreeSet<String> {
        self.shared(drug, disease, Relation::InferredPathway, Relation::Enrichment, NodeKind::Pathway)
    }

    /// Shortest path length in edges between the disease and a drug, ignoring
    /// edge direction. `None` when either node is missing or no path exists.
    /// Ranking many drugs should use [`Self::distances_from`] instead.
    pub fn distance(&self, disease: &str, drug: &str) -> Option<usize> {
        self.distances_from(disease).to_drug(drug)
    }

    /// One breadth-first pass from the disease over the undirected projection,
    /// recording the depth of every reachable node.
    pub fn distances_from(&self, disease: &str) -> DiseaseDistances<'_> {
        let mut depths = vec![None; self.graph.node_count()];
        if let Some(start) = self.find(NodeKind::Disease, disease) {
            let mut queue = VecDeque::new();
            depths[start.index()] = Some(0);
            queue.push_back((start, 0usize));

            while let Some((ix, depth)) = queue.pop_front() {
                for next in self.graph.neighbors_undirected(ix) {
                    if depths[next.index()].is_none() {
                        depths[next.index()] = Some(depth + 1);
                        queue.push_back((next, depth + 1));
                    }
                }
            }
            debug!(disease, reachable = depths.iter().flatten().count(), "Distances computed");
        }
        DiseaseDistances { graph: self, depths }
    }
}

/// Depths from one disease node, as computed by [`KnowledgeGraph::distances_from`].
#[derive(Debug, Clone)]
pub struct DiseaseDistances<'g> {
    graph: &'g KnowledgeGraph,
    depths: Vec<Option<usize>>,
}

impl DiseaseDistances<'_> {
    /// Edges between the disease and the drug, or `None` when unreachable.
    pub fn to_drug(&self, drug: &str) -> Option<usize> {
        let ix = self.graph.find_drug(drug)?;
        self.depths.get(ix.index()).copied().flatten()
    }
}
