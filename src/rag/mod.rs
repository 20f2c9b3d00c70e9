//! Built-in retrieval engine: chunking, extraction, a persisted chunk
//! index, an entity co-occurrence graph, and the four query modes.

pub mod chunker;
pub mod engine;
pub mod extract;
pub mod graph;
pub mod store;

pub use engine::{EngineConfig, QueryMode, RagEngine};
