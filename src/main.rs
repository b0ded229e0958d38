//! # Flashdeck CLI (`flashdeck`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `flashdeck serve` | Start the HTTP server |
//! | `flashdeck generate <FILE>` | Generate flashcards for a local file |
//!
//! ## Configuration
//!
//! All configuration is environment-based and read once at startup:
//! `OPENAI_API_KEY` (required for generation), `APP_PASSWORD` (required
//! for `/verify-password`), `OPENAI_BASE_URL`, `FLASHDECK_MODEL`,
//! `FLASHDECK_MAX_PAGES`.
//!
//! ## Examples
//!
//! ```bash
//! # Start the server
//! OPENAI_API_KEY=sk-... flashdeck serve --bind 127.0.0.1:7400
//!
//! # One-shot generation from a local file
//! OPENAI_API_KEY=sk-... flashdeck generate notes.pdf
//! ```

mod chunk;
mod completion;
mod config;
mod extract;
mod generate;
mod models;
mod repair;
mod server;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Flashdeck — turn documents into question/answer flashcards with an LLM.
#[derive(Parser)]
#[command(
    name = "flashdeck",
    about = "Turn documents into question/answer flashcards with an LLM",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Address to bind, e.g. 127.0.0.1:7400.
        #[arg(long, default_value = "127.0.0.1:7400")]
        bind: String,
    },
    /// Generate flashcards for a local file and print them as JSON.
    Generate {
        /// Path to the document (.pdf, .docx, .pptx, or .txt).
        file: PathBuf,
        /// Declared media type; inferred from the extension when omitted.
        #[arg(long)]
        file_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::Config::from_env()?;

    match cli.command {
        Commands::Serve { bind } => {
            server::run_server(cfg, &bind).await?;
        }
        Commands::Generate { file, file_type } => {
            run_generate(&cfg, &file, file_type.as_deref()).await?;
        }
    }

    Ok(())
}

/// One-shot pipeline run over a local file; flashcard JSON goes to stdout,
/// logs to stderr.
async fn run_generate(config: &config::Config, file: &Path, file_type: Option<&str>) -> Result<()> {
    let api_key = config
        .openai_api_key
        .as_deref()
        .context("OPENAI_API_KEY not set")?;

    let media_type = match file_type {
        Some(media_type) => media_type.to_string(),
        None => media_type_for(file)?,
    };
    let bytes =
        std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

    let text = extract::extract_text(&bytes, &media_type, config.generation.max_pdf_pages)
        .map_err(|e| anyhow::anyhow!("{} ({})", e, e.kind()))?;
    if text.trim().is_empty() {
        anyhow::bail!("no text could be extracted from {}", file.display());
    }

    let report = generate::generate_flashcards(config, api_key, &text).await;
    if !report.failures.is_empty() {
        tracing::warn!(
            "{} chunk(s) failed; output is partial",
            report.failures.len()
        );
    }
    println!("{}", serde_json::to_string_pretty(&report.flashcards)?);
    Ok(())
}

/// Map a file extension to its declared media type.
fn media_type_for(file: &Path) -> Result<String> {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "pdf" => extract::MIME_PDF,
        "docx" => extract::MIME_DOCX,
        "pptx" => extract::MIME_PPTX,
        "txt" | "text" | "md" => extract::MIME_TEXT,
        other => anyhow::bail!("cannot infer media type for extension '{other}'; pass --file-type"),
    };
    Ok(media_type.to_string())
}
