//! Entity co-occurrence graph used by the local and global retrieval
//! modes. Nodes are normalized entity names, edges count how many
//! chunks mention both endpoints. Rebuilt from the stored chunks at
//! engine startup; never persisted on its own.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use petgraph::graph::{NodeIndex, UnGraph};
use regex::Regex;

const STOPWORDS: [&str; 24] = [
    "the", "this", "that", "these", "those", "a", "an", "and", "but", "for", "with", "from",
    "what", "when", "where", "which", "who", "how", "why", "does", "is", "are", "was", "were",
];

pub struct EntityGraph {
    graph: UnGraph<String, u32>,
    name_to_node: HashMap<String, NodeIndex>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            name_to_node: HashMap::new(),
        }
    }

    /// Record one chunk's entity mentions: every entity becomes a node
    /// and each pair co-occurring in the chunk gains edge weight.
    pub fn record_chunk(&mut self, entities: &[String]) {
        let nodes: Vec<NodeIndex> = entities.iter().map(|e| self.intern(e)).collect();
        for (i, &a) in nodes.iter().enumerate() {
            for &b in nodes.iter().skip(i + 1) {
                if a == b {
                    continue;
                }
                match self.graph.find_edge(a, b) {
                    Some(edge) => {
                        if let Some(weight) = self.graph.edge_weight_mut(edge) {
                            *weight += 1;
                        }
                    }
                    None => {
                        self.graph.add_edge(a, b, 1);
                    }
                }
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_node.contains_key(name)
    }

    /// One-hop neighborhood of an entity.
    pub fn neighbors(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.name_to_node.get(name) else {
            return Vec::new();
        };
        self.graph
            .neighbors(idx)
            .filter_map(|n| self.graph.node_weight(n).cloned())
            .collect()
    }

    /// Entities ranked by weighted degree, highest first.
    pub fn top_by_degree(&self, limit: usize) -> Vec<String> {
        let mut scored: Vec<(u32, String)> = self
            .graph
            .node_indices()
            .map(|idx| {
                let degree: u32 = self.graph.edges(idx).map(|e| *e.weight()).sum();
                (degree, self.graph[idx].clone())
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        scored.into_iter().take(limit).map(|(_, n)| n).collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn intern(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.name_to_node.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.name_to_node.insert(name.to_string(), idx);
        idx
    }
}

impl Default for EntityGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Capitalized word runs, normalized to lowercase. Good enough for the
/// specific-entity focus of local mode without an extraction model.
pub fn extract_entities(text: &str) -> Vec<String> {
    static ENTITY_RE: OnceLock<Regex> = OnceLock::new();
    let re = ENTITY_RE.get_or_init(|| {
        Regex::new(r"\b[A-Z][A-Za-z0-9]+(?:[ \t][A-Z][A-Za-z0-9]+){0,3}\b").expect("entity regex")
    });

    let mut seen = HashSet::new();
    let mut entities = Vec::new();
    for m in re.find_iter(text) {
        let normalized = m.as_str().to_lowercase();
        if normalized.len() < 3 || STOPWORDS.contains(&normalized.as_str()) {
            continue;
        }
        if seen.insert(normalized.clone()) {
            entities.push(normalized);
        }
    }
    entities
}

/// Entities of a question: capitalized runs plus bare terms that match
/// known graph nodes (questions are usually typed in lowercase).
pub fn query_entities(question: &str, graph: &EntityGraph) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut entities = Vec::new();

    for entity in extract_entities(question) {
        if graph.contains(&entity) && seen.insert(entity.clone()) {
            entities.push(entity);
        }
    }

    for term in question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3 && !STOPWORDS.contains(t))
    {
        if graph.contains(term) && seen.insert(term.to_string()) {
            entities.push(term.to_string());
        }
    }

    entities
}
