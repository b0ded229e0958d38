//! Environment-derived configuration.
//!
//! The configuration struct is built once at process start with
//! [`Config::from_env`] and passed by reference into the server and the
//! generation pipeline. Nothing reads ambient environment state
//! mid-request; a missing credential is carried as `None` and surfaced as
//! a 500 when a request actually needs it.

use anyhow::{Context, Result};

/// Approximate chars-per-token ratio used to convert the per-chunk token
/// budget into a character budget for the chunker.
pub const CHARS_PER_TOKEN: usize = 4;

/// Default completion API base URL. Overridable via `OPENAI_BASE_URL`.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    /// Model-access credential (`OPENAI_API_KEY`).
    pub openai_api_key: Option<String>,
    /// Comparison secret for `/verify-password` (`APP_PASSWORD`).
    pub app_password: Option<String>,
    /// Completion API base URL (`OPENAI_BASE_URL`).
    pub openai_base_url: String,
    pub generation: GenerationConfig,
}

/// Fixed model and pipeline parameters. Not request-controlled: output
/// cost stays bounded and factuality settings stay put regardless of what
/// a caller sends.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    /// Completion output cap per chunk, in tokens.
    pub max_output_tokens: u32,
    /// Input budget per chunk, in approximate tokens.
    pub max_input_tokens: usize,
    /// Retries around one completion call (429/5xx/transport only).
    pub max_retries: u32,
    /// Per-call request timeout.
    pub timeout_secs: u64,
    /// PDF page-count ceiling; longer documents are rejected before any
    /// extraction work is done.
    pub max_pdf_pages: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.3,
            max_output_tokens: 4000,
            max_input_tokens: 6000,
            max_retries: 2,
            timeout_secs: 60,
            max_pdf_pages: 100,
        }
    }
}

impl GenerationConfig {
    /// Character budget for one chunk.
    pub fn chunk_size(&self) -> usize {
        self.max_input_tokens * CHARS_PER_TOKEN
    }
}

impl Config {
    /// Build the configuration from the environment.
    ///
    /// Recognized variables: `OPENAI_API_KEY`, `APP_PASSWORD`,
    /// `OPENAI_BASE_URL`, `FLASHDECK_MODEL`, `FLASHDECK_MAX_PAGES`.
    /// Empty values are treated as unset.
    pub fn from_env() -> Result<Self> {
        let mut generation = GenerationConfig::default();
        if let Some(model) = env_non_empty("FLASHDECK_MODEL") {
            generation.model = model;
        }
        if let Some(pages) = env_non_empty("FLASHDECK_MAX_PAGES") {
            generation.max_pdf_pages = pages
                .parse()
                .with_context(|| format!("FLASHDECK_MAX_PAGES must be an integer, got '{pages}'"))?;
        }

        let config = Self {
            openai_api_key: env_non_empty("OPENAI_API_KEY"),
            app_password: env_non_empty("APP_PASSWORD"),
            openai_base_url: env_non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            generation,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.generation.max_input_tokens == 0 {
            anyhow::bail!("max_input_tokens must be > 0");
        }
        if self.generation.max_pdf_pages == 0 {
            anyhow::bail!("max_pdf_pages must be > 0");
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            anyhow::bail!("temperature must be in [0.0, 2.0]");
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
