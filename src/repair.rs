//! Two-tier repair of raw model output into validated flashcards.
//!
//! Language models reliably produce *approximately* correct JSON: trailing
//! commas, truncated objects, missing fields, echoes of the schema, prose
//! wrappers. A rigid schema parse is attempted first, so field semantics
//! are honored whenever the output is well-formed; a lenient generic-JSON
//! pass then salvages whatever flashcard records a structurally broken
//! response still contains. A chunk whose output defeats both tiers yields
//! an empty batch: the chunk is dropped, never the request.
//!
//! Field discipline: questions must be non-empty after trimming (records
//! failing this are dropped); empty answers are replaced with
//! [`ANSWER_PLACEHOLDER`].

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Flashcard, FlashcardList};

/// Substituted when the model leaves an answer empty.
pub const ANSWER_PLACEHOLDER: &str = "Answer not provided in text.";

static RE_TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// Remove trailing commas immediately before a closing brace or bracket,
/// the most common mechanical defect in model-emitted JSON.
pub fn clean_json_output(text: &str) -> Cow<'_, str> {
    RE_TRAILING_COMMA.replace_all(text, "$1")
}

/// Which tier, if any, produced a usable parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Schema parse succeeded with a non-empty `flashcards` array.
    Strict(Vec<Flashcard>),
    /// Generic JSON salvage; may legitimately be empty.
    Lenient(Vec<Flashcard>),
    /// Neither tier could parse the output.
    Failed,
}

impl ParseOutcome {
    /// Flatten to the flashcard batch, empty on failure.
    pub fn into_flashcards(self) -> Vec<Flashcard> {
        match self {
            ParseOutcome::Strict(cards) | ParseOutcome::Lenient(cards) => cards,
            ParseOutcome::Failed => Vec::new(),
        }
    }
}

/// Repair `raw` into a flashcard batch. Total: never errors, never panics.
pub fn repair(raw: &str) -> Vec<Flashcard> {
    parse_flashcards(raw).into_flashcards()
}

/// Two-tier parse with short-circuit fallback. Cleanup runs once on the
/// raw text and feeds both tiers.
pub fn parse_flashcards(raw: &str) -> ParseOutcome {
    let cleaned = clean_json_output(raw);
    if let Some(cards) = parse_strict(&cleaned) {
        return ParseOutcome::Strict(cards);
    }
    match parse_lenient(&cleaned) {
        Some(cards) => ParseOutcome::Lenient(cards),
        None => ParseOutcome::Failed,
    }
}

/// Strict tier: the fixed schema. `None` when the parse fails or the
/// `flashcards` array is missing or empty; both fall through to the
/// lenient tier.
fn parse_strict(cleaned: &str) -> Option<Vec<Flashcard>> {
    let parsed: FlashcardList = serde_json::from_str(cleaned).ok()?;
    if parsed.flashcards.is_empty() {
        return None;
    }
    Some(parsed.flashcards.into_iter().filter_map(repair_card).collect())
}

/// Lenient tier: any JSON shape. Accepts a `flashcards` key on an object
/// or a top-level array; non-object entries are skipped. `None` only when
/// the text is not JSON at all.
fn parse_lenient(cleaned: &str) -> Option<Vec<Flashcard>> {
    let value: serde_json::Value = serde_json::from_str(cleaned).ok()?;
    let entries = match value {
        serde_json::Value::Object(mut map) => match map.remove("flashcards") {
            Some(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        },
        serde_json::Value::Array(items) => items,
        _ => Vec::new(),
    };
    Some(entries.iter().filter_map(repair_entry).collect())
}

fn repair_card(card: Flashcard) -> Option<Flashcard> {
    normalize(card.question.trim(), card.answer.trim())
}

/// Missing or non-string fields are treated as empty strings.
fn repair_entry(entry: &serde_json::Value) -> Option<Flashcard> {
    let map = entry.as_object()?;
    let question = map.get("question").and_then(|v| v.as_str()).unwrap_or("");
    let answer = map.get("answer").and_then(|v| v.as_str()).unwrap_or("");
    normalize(question.trim(), answer.trim())
}

fn normalize(question: &str, answer: &str) -> Option<Flashcard> {
    if question.is_empty() {
        return None;
    }
    let answer = if answer.is_empty() {
        ANSWER_PLACEHOLDER
    } else {
        answer
    };
    Some(Flashcard {
        question: question.to_string(),
        answer: answer.to_string(),
    })
}
