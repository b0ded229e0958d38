//! Per-chunk generation pipeline and aggregation.
//!
//! Drives extracted text through the chunker, completion invoker, and
//! repair pipeline, chunk by chunk, in order. Failure isolation is per
//! chunk: a chunk whose completion call fails contributes zero flashcards,
//! is recorded in the report, and never aborts processing of later chunks.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::chunk::chunk_text;
use crate::completion;
use crate::config::Config;
use crate::models::Flashcard;
use crate::repair;

/// A chunk that produced no flashcards because its completion call failed.
#[derive(Debug, Error)]
#[error("chunk {index}: {detail}")]
pub struct ChunkError {
    /// Zero-based position of the chunk in the document.
    pub index: usize,
    pub detail: String,
}

/// Outcome of one request's pipeline run.
///
/// The HTTP response exposes only `flashcards`; `failures` keeps the
/// per-chunk failures visible to library callers and tests.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub flashcards: Vec<Flashcard>,
    pub failures: Vec<ChunkError>,
}

/// Run the full pipeline over `text`. Whitespace-only chunks are skipped
/// without a completion call; everything else is completion + repair.
pub async fn generate_flashcards(config: &Config, api_key: &str, text: &str) -> GenerationReport {
    let chunks = chunk_text(text, config.generation.chunk_size());
    let total = chunks.len();
    let mut report = GenerationReport::default();

    for (index, chunk) in chunks.into_iter().enumerate() {
        if chunk.trim().is_empty() {
            continue;
        }
        info!(
            "processing chunk {}/{} ({} chars)",
            index + 1,
            total,
            chunk.chars().count()
        );
        match process_chunk(config, api_key, index, chunk).await {
            Ok(cards) if cards.is_empty() => {
                warn!("chunk {}: no usable flashcards in model output", index + 1);
            }
            Ok(cards) => {
                info!("chunk {}: generated {} flashcards", index + 1, cards.len());
                report.flashcards.extend(cards);
            }
            Err(e) => {
                error!("{e}");
                report.failures.push(e);
            }
        }
    }

    report
}

/// One chunk: completion call, then repair. Repair is total, so the only
/// failure mode is the completion call itself.
async fn process_chunk(
    config: &Config,
    api_key: &str,
    index: usize,
    chunk: &str,
) -> Result<Vec<Flashcard>, ChunkError> {
    let raw = completion::complete(config, api_key, chunk)
        .await
        .map_err(|e| ChunkError {
            index,
            detail: e.to_string(),
        })?;
    Ok(repair::repair(&raw))
}
