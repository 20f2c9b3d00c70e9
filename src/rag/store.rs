//! Persisted chunk index for one session's working directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const INDEX_FILE: &str = "index.json";

/// A stored chunk with its embedding and the entities it mentions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: String,
    /// Source document name (the uploaded filename).
    pub source: String,
    pub chunk_index: usize,
    pub text: String,
    pub embedding: Vec<f32>,
    pub entities: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    documents: Vec<String>,
    chunks: Vec<IndexedChunk>,
}

/// JSON-backed store living in the session working directory. The
/// engine owns it behind a lock; every mutation is persisted before
/// the call returns.
pub struct IndexStore {
    path: PathBuf,
    documents: Vec<String>,
    chunks: Vec<IndexedChunk>,
}

impl IndexStore {
    pub fn load(working_dir: &Path) -> Result<Self> {
        let path = working_dir.join(INDEX_FILE);
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read index: {}", path.display()))?;
            serde_json::from_str::<IndexFile>(&contents)
                .with_context(|| format!("corrupt index file: {}", path.display()))?
        } else {
            IndexFile::default()
        };

        Ok(Self {
            path,
            documents: data.documents,
            chunks: data.chunks,
        })
    }

    /// Persist first, commit in-memory state only after the write
    /// lands; a failed write leaves the store exactly as it was.
    pub fn append_document(&mut self, source: &str, chunks: Vec<IndexedChunk>) -> Result<()> {
        let mut documents = self.documents.clone();
        if !documents.iter().any(|d| d == source) {
            documents.push(source.to_string());
        }
        let mut all_chunks = self.chunks.clone();
        all_chunks.extend(chunks);

        self.persist(&IndexFile {
            documents: documents.clone(),
            chunks: all_chunks.clone(),
        })?;

        self.documents = documents;
        self.chunks = all_chunks;
        Ok(())
    }

    pub fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn persist(&self, data: &IndexFile) -> Result<()> {
        let json = serde_json::to_string(data).context("failed to serialize index")?;

        // Write-then-rename so a crash mid-write cannot corrupt the index.
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .with_context(|| format!("failed to write index: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to replace index: {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source: &str, text: &str) -> IndexedChunk {
        IndexedChunk {
            id: id.to_string(),
            source: source.to_string(),
            chunk_index: 0,
            text: text.to_string(),
            embedding: vec![1.0, 0.0],
            entities: vec![],
        }
    }

    #[test]
    fn persists_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");

        let mut store = IndexStore::load(dir.path()).expect("load empty");
        assert!(store.is_empty());

        store
            .append_document("a.txt", vec![chunk("1", "a.txt", "alpha")])
            .expect("append");
        store
            .append_document("b.txt", vec![chunk("2", "b.txt", "beta")])
            .expect("append");

        let reloaded = IndexStore::load(dir.path()).expect("reload");
        assert_eq!(reloaded.document_count(), 2);
        assert_eq!(reloaded.chunk_count(), 2);
        assert_eq!(reloaded.chunks()[0].text, "alpha");
    }

    #[test]
    fn failed_persist_leaves_memory_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = IndexStore::load(dir.path()).expect("load");

        // A non-empty directory at the index path makes the rename fail.
        let blocker = dir.path().join(INDEX_FILE);
        fs::create_dir(&blocker).expect("block path");
        fs::write(blocker.join("occupant"), b"x").expect("occupy");

        let err = store.append_document("a.txt", vec![chunk("1", "a.txt", "alpha")]);
        assert!(err.is_err());
        assert_eq!(store.document_count(), 0);
        assert_eq!(store.chunk_count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn same_source_counts_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = IndexStore::load(dir.path()).expect("load");

        store
            .append_document("a.txt", vec![chunk("1", "a.txt", "one")])
            .expect("append");
        store
            .append_document("a.txt", vec![chunk("2", "a.txt", "two")])
            .expect("append");

        assert_eq!(store.document_count(), 1);
        assert_eq!(store.chunk_count(), 2);
    }
}
