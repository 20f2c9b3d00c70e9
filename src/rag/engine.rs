//! The retrieval engine behind the session's opaque handle.
//!
//! Construction wires a working directory and a [`LanguageBackend`]
//! (completion + embedding). `insert` indexes one document, `query`
//! answers a question under one of the four retrieval modes.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::chunker::{split_into_chunks, ChunkConfig};
use super::extract::extract_text;
use super::graph::{extract_entities, query_entities, EntityGraph};
use super::store::{IndexStore, IndexedChunk};
use crate::core::errors::EngineError;
use crate::llm::LanguageBackend;

const ANSWER_SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about the \
     user's documents. Use only the provided context. If the context does not contain the \
     answer, say that you do not know.";

const SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about the \
     user's documents. Give a high-level answer that synthesizes the themes across the provided \
     context rather than quoting isolated details. If the context is insufficient, say so.";

/// Retrieval strategy for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    #[default]
    Hybrid,
    Local,
    Global,
    Naive,
}

impl QueryMode {
    pub fn all() -> [QueryMode; 4] {
        [
            QueryMode::Hybrid,
            QueryMode::Local,
            QueryMode::Global,
            QueryMode::Naive,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryMode::Hybrid => "hybrid",
            QueryMode::Local => "local",
            QueryMode::Global => "global",
            QueryMode::Naive => "naive",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            QueryMode::Hybrid => "Best overall results (recommended)",
            QueryMode::Local => "Focus on specific entities",
            QueryMode::Global => "High-level summaries",
            QueryMode::Naive => "Simple vector search",
        }
    }
}

impl FromStr for QueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hybrid" => Ok(QueryMode::Hybrid),
            "local" => Ok(QueryMode::Local),
            "global" => Ok(QueryMode::Global),
            "naive" => Ok(QueryMode::Naive),
            other => Err(format!("unknown query mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub chunk: ChunkConfig,
    /// Chunks to include in the answer context
    pub top_k: usize,
    /// Context budget in characters
    pub max_context_chars: usize,
    /// Hub entities considered by global mode
    pub global_entity_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk: ChunkConfig::default(),
            top_k: 5,
            max_context_chars: 4000,
            global_entity_limit: 8,
        }
    }
}

struct EngineIndex {
    store: IndexStore,
    graph: EntityGraph,
}

pub struct RagEngine {
    working_dir: PathBuf,
    backend: Arc<dyn LanguageBackend>,
    config: EngineConfig,
    index: RwLock<EngineIndex>,
}

impl RagEngine {
    /// Open (or create) the index in `working_dir`. The entity graph is
    /// rebuilt from the stored chunks.
    pub fn new(
        working_dir: PathBuf,
        backend: Arc<dyn LanguageBackend>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        fs::create_dir_all(&working_dir).map_err(|e| {
            EngineError::Init(format!(
                "cannot create working directory {}: {}",
                working_dir.display(),
                e
            ))
        })?;

        let store = IndexStore::load(&working_dir).map_err(|e| EngineError::Init(e.to_string()))?;

        let mut graph = EntityGraph::new();
        for chunk in store.chunks() {
            graph.record_chunk(&chunk.entities);
        }

        tracing::info!(
            dir = %working_dir.display(),
            documents = store.document_count(),
            chunks = store.chunk_count(),
            "engine ready"
        );

        Ok(Self {
            working_dir,
            backend,
            config,
            index: RwLock::new(EngineIndex { store, graph }),
        })
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub async fn document_count(&self) -> usize {
        self.index.read().await.store.document_count()
    }

    pub async fn chunk_count(&self) -> usize {
        self.index.read().await.store.chunk_count()
    }

    /// Index one document: extract, chunk, embed, scan entities,
    /// persist. Returns the number of chunks added.
    pub async fn insert(&self, path: &Path, source: &str) -> Result<usize, EngineError> {
        let text = extract_text(path).map_err(|e| EngineError::Ingest(e.to_string()))?;
        let chunks = split_into_chunks(&text, &self.config.chunk);
        if chunks.is_empty() {
            return Err(EngineError::Ingest(format!(
                "no extractable text in {}",
                source
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .backend
            .embed(&texts)
            .await
            .map_err(|e| EngineError::Ingest(e.to_string()))?;

        let indexed: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk {
                id: Uuid::new_v4().to_string(),
                source: source.to_string(),
                chunk_index: chunk.chunk_index,
                entities: extract_entities(&chunk.text),
                text: chunk.text,
                embedding,
            })
            .collect();
        let added = indexed.len();

        // The graph is only updated after the store commit; a failed
        // persist must not leave phantom entities behind.
        let entity_sets: Vec<Vec<String>> = indexed.iter().map(|c| c.entities.clone()).collect();

        let mut index = self.index.write().await;
        index
            .store
            .append_document(source, indexed)
            .map_err(|e| EngineError::Ingest(e.to_string()))?;
        for entities in &entity_sets {
            index.graph.record_chunk(entities);
        }

        tracing::info!(source, chunks = added, "document ingested");
        Ok(added)
    }

    /// Answer a question under the given retrieval mode.
    pub async fn query(&self, question: &str, mode: QueryMode) -> Result<String, EngineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::Query("empty question".to_string()));
        }

        let query_embedding = self
            .backend
            .embed(&[question.to_string()])
            .await
            .map_err(|e| EngineError::Query(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Query("backend returned no embedding".to_string()))?;

        // Select under the read lock, then release it before the
        // completion round-trip.
        let context = {
            let index = self.index.read().await;
            if index.store.is_empty() {
                return Err(EngineError::Query(
                    "no documents have been ingested".to_string(),
                ));
            }
            let selected = self.select_chunks(&index, question, &query_embedding, mode);
            self.build_context(&selected)
        };

        let system = match mode {
            QueryMode::Global => SUMMARY_SYSTEM_PROMPT,
            _ => ANSWER_SYSTEM_PROMPT,
        };
        let prompt = format!(
            "---Context---\n{}\n\n---Question---\n{}",
            context, question
        );

        self.backend
            .complete(Some(system), &prompt)
            .await
            .map_err(|e| EngineError::Query(e.to_string()))
    }

    fn select_chunks<'a>(
        &self,
        index: &'a EngineIndex,
        question: &str,
        query_embedding: &[f32],
        mode: QueryMode,
    ) -> Vec<(f32, &'a IndexedChunk)> {
        let all = index.store.chunks();
        match mode {
            QueryMode::Naive => top_k(rank(all.iter(), query_embedding), self.config.top_k),
            QueryMode::Local => {
                let focused = self.entity_candidates(index, question);
                if focused.is_empty() {
                    // Nothing matched an entity, fall back to plain
                    // vector search.
                    top_k(rank(all.iter(), query_embedding), self.config.top_k)
                } else {
                    top_k(
                        rank(focused.into_iter(), query_embedding),
                        self.config.top_k,
                    )
                }
            }
            QueryMode::Global => {
                let hubs: HashSet<String> = index
                    .graph
                    .top_by_degree(self.config.global_entity_limit)
                    .into_iter()
                    .collect();
                let representative: Vec<&IndexedChunk> = all
                    .iter()
                    .filter(|chunk| chunk.entities.iter().any(|e| hubs.contains(e)))
                    .collect();
                let pool = if representative.is_empty() {
                    rank(all.iter(), query_embedding)
                } else {
                    rank(representative.into_iter(), query_embedding)
                };
                top_k(pool, self.config.top_k)
            }
            QueryMode::Hybrid => {
                let mut merged = rank(all.iter(), query_embedding);
                merged.truncate(self.config.top_k);
                let focused = top_k(
                    rank(
                        self.entity_candidates(index, question).into_iter(),
                        query_embedding,
                    ),
                    self.config.top_k,
                );

                let mut seen: HashSet<&str> =
                    merged.iter().map(|(_, c)| c.id.as_str()).collect();
                for (score, chunk) in focused {
                    if seen.insert(chunk.id.as_str()) {
                        merged.push((score, chunk));
                    }
                }
                merged.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
                merged.truncate(self.config.top_k);
                merged
            }
        }
    }

    /// Chunks mentioning a query entity or a one-hop graph neighbor.
    fn entity_candidates<'a>(
        &self,
        index: &'a EngineIndex,
        question: &str,
    ) -> Vec<&'a IndexedChunk> {
        let mut focus: HashSet<String> =
            query_entities(question, &index.graph).into_iter().collect();
        for entity in focus.clone() {
            for neighbor in index.graph.neighbors(&entity) {
                focus.insert(neighbor);
            }
        }
        if focus.is_empty() {
            return Vec::new();
        }

        index
            .store
            .chunks()
            .iter()
            .filter(|chunk| chunk.entities.iter().any(|e| focus.contains(e)))
            .collect()
    }

    fn build_context(&self, scored: &[(f32, &IndexedChunk)]) -> String {
        let mut context = String::new();
        let mut current_length = 0;

        for (i, (score, chunk)) in scored.iter().enumerate() {
            let addition_length = chunk.text.len() + 50;
            if current_length + addition_length > self.config.max_context_chars {
                break;
            }
            context.push_str(&format!(
                "[{}] (source: {}, relevance: {:.2})\n{}\n\n",
                i + 1,
                chunk.source,
                score,
                chunk.text
            ));
            current_length += addition_length;
        }

        context.trim().to_string()
    }
}

fn rank<'a>(
    chunks: impl Iterator<Item = &'a IndexedChunk>,
    query_embedding: &[f32],
) -> Vec<(f32, &'a IndexedChunk)> {
    let mut scored: Vec<(f32, &IndexedChunk)> = chunks
        .map(|chunk| {
            (
                cosine_similarity(query_embedding, &chunk.embedding),
                chunk,
            )
        })
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored
}

fn top_k(mut scored: Vec<(f32, &IndexedChunk)>, k: usize) -> Vec<(f32, &IndexedChunk)> {
    scored.truncate(k);
    scored
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
