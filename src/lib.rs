//! # Flashdeck
//!
//! Turn uploaded documents into question/answer flashcards with an LLM.
//!
//! A document (PDF, DOCX, PPTX, or plain text) is decoded, its text
//! extracted and split into bounded chunks, and each chunk is sent to a
//! chat-completion call instructed to emit a fixed JSON schema. Model
//! output being unreliable, a two-tier repair pipeline recovers a
//! validated flashcard list per chunk, dropping chunks it cannot salvage
//! rather than failing the request.
//!
//! ```text
//! bytes ──▶ extract ──▶ chunk ──▶ completion ──▶ repair ──▶ aggregate ──▶ HTTP
//! ```
//!
//! Nothing is persisted; every value lives for one request.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Environment-derived configuration |
//! | [`models`] | Core data types |
//! | [`extract`] | Multi-format text extraction |
//! | [`chunk`] | Bounded text chunking |
//! | [`completion`] | Prompt template + completion API client |
//! | [`repair`] | Two-tier repair of raw model output |
//! | [`generate`] | Per-chunk pipeline loop and aggregation |
//! | [`server`] | HTTP server |

pub mod chunk;
pub mod completion;
pub mod config;
pub mod extract;
pub mod generate;
pub mod models;
pub mod repair;
pub mod server;
