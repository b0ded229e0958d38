//! Core data types shared across the flashcard pipeline.

use serde::{Deserialize, Serialize};

/// A validated question/answer pair, the system's sole output unit.
///
/// Constructed transiently per chunk by the repair pipeline, never mutated
/// afterwards, and folded into the response batch in chunk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// The fixed schema the model is instructed to emit: a single JSON object
/// with a `flashcards` array. Used by the strict tier of the repair
/// pipeline; a missing `flashcards` key is a strict-parse failure.
#[derive(Debug, Clone, Deserialize)]
pub struct FlashcardList {
    pub flashcards: Vec<Flashcard>,
}
