//! Overlapping character chunks with sentence-boundary trimming.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 80,
        }
    }
}

/// A chunk of source text, positioned within its document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub start_offset: usize,
    pub chunk_index: usize,
}

pub fn split_into_chunks(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    let chunk_size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(chunk_size.saturating_sub(1));

    let chars: Vec<char> = text.chars().collect();
    let total_chars = chars.len();
    let mut chunks = Vec::new();

    if total_chars == 0 {
        return chunks;
    }

    let mut start = 0;
    let mut chunk_index = 0;

    while start < total_chars {
        let end = (start + chunk_size).min(total_chars);
        let window: String = chars[start..end].iter().collect();

        // Avoid cutting mid-sentence except at the document tail.
        let final_text = if end < total_chars {
            trim_to_sentence_boundary(&window)
        } else {
            window
        };
        let consumed = final_text.chars().count();

        let trimmed = final_text.trim();
        if !trimmed.is_empty() {
            chunks.push(TextChunk {
                text: trimmed.to_string(),
                start_offset: start,
                chunk_index,
            });
            chunk_index += 1;
        }

        // The next window overlaps the tail of what this chunk kept,
        // so text past a trimmed boundary is never skipped.
        start += consumed.saturating_sub(overlap).max(1);
    }

    chunks
}

/// Cut the window back to the last sentence ending in its final fifth,
/// if one exists.
fn trim_to_sentence_boundary(text: &str) -> String {
    let sentence_endings = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let chars: Vec<char> = text.chars().collect();
    let search_start_char = (chars.len() * 4) / 5;
    let search_start: usize = chars[..search_start_char].iter().map(|c| c.len_utf8()).sum();
    let search_text = &text[search_start..];

    for ending in sentence_endings.iter() {
        if let Some(pos) = search_text.rfind(ending) {
            let cut = search_start + pos + ending.len();
            return text[..cut].to_string();
        }
    }

    text.to_string()
}
