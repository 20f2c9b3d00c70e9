//! Ingestion adapter: uploaded bytes go to a uniquely named transient
//! file, the engine's insert runs to completion, then the file is
//! removed. An insert failure returns before the removal, so a
//! residual transient file can remain on the error path.

use std::fs;
use std::io::Write;

use serde::Serialize;

use crate::core::errors::EngineError;
use crate::rag::extract::{file_extension, is_supported_extension};
use crate::rag::RagEngine;

/// Ingest one uploaded document. Returns the number of chunks indexed.
pub async fn ingest_document(
    engine: &RagEngine,
    bytes: &[u8],
    filename: &str,
) -> Result<usize, EngineError> {
    if bytes.is_empty() {
        return Err(EngineError::Ingest(format!("{} is empty", filename)));
    }

    let extension = file_extension(filename);
    if !is_supported_extension(&extension) {
        return Err(EngineError::Ingest(format!(
            "unsupported file type: {}",
            filename
        )));
    }

    let mut tmp = tempfile::Builder::new()
        .prefix("docchat-upload-")
        .suffix(&format!(".{}", extension))
        .tempfile()
        .map_err(|e| EngineError::Ingest(format!("cannot create transient file: {}", e)))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| EngineError::Ingest(format!("cannot write transient file: {}", e)))?;

    // Detach from the guard so the path stays valid for the insert.
    let tmp_path = tmp
        .into_temp_path()
        .keep()
        .map_err(|e| EngineError::Ingest(format!("cannot persist transient file: {}", e)))?;

    let added = engine.insert(&tmp_path, filename).await?;

    let _ = fs::remove_file(&tmp_path);
    Ok(added)
}

#[derive(Debug, Serialize)]
pub struct DocumentOutcome {
    pub filename: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub results: Vec<DocumentOutcome>,
    /// Successfully ingested files
    pub loaded: usize,
    /// Files attempted
    pub total: usize,
}

/// Ingest a batch strictly in order. Every file is attempted; one
/// failure never short-circuits its siblings.
pub async fn ingest_batch(engine: &RagEngine, files: Vec<(String, Vec<u8>)>) -> BatchReport {
    let total = files.len();
    let mut results = Vec::with_capacity(total);
    let mut loaded = 0;

    for (filename, bytes) in files {
        match ingest_document(engine, &bytes, &filename).await {
            Ok(chunks) => {
                loaded += 1;
                results.push(DocumentOutcome {
                    filename,
                    ok: true,
                    chunks: Some(chunks),
                    error: None,
                });
            }
            Err(err) => {
                tracing::warn!(file = %filename, error = %err, "ingestion failed");
                results.push(DocumentOutcome {
                    filename,
                    ok: false,
                    chunks: None,
                    error: Some(err.to_string()),
                });
            }
        }
    }

    BatchReport {
        results,
        loaded,
        total,
    }
}
