//! Completion call against the OpenAI chat API.
//!
//! One chunk in, one raw model string out. The instruction template lives
//! here as a single constant so it can be changed (and unit-tested) without
//! touching retry or transport logic. Model parameters come from
//! [`GenerationConfig`](crate::config::GenerationConfig) and are never
//! request-controlled.
//!
//! Retry strategy:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use std::time::Duration;

use anyhow::{bail, Result};

use crate::config::Config;

/// Instruction template sent with every chunk. The chunk text is appended
/// directly after the trailing newline.
pub const FLASHCARD_PROMPT: &str = r#"You are a flashcard generator for theory-based subjects.
Output a valid JSON object with a key "flashcards" containing a list of flashcards.
Each flashcard must have:
  - "question": a clear, concise question (string)
  - "answer": a 2-3 sentence explanatory answer (string)
Stay strictly factual, based only on the provided text.
If the text contains no usable information, output {"flashcards": []}.
Do not explain, apologize, or return any text outside the JSON object.

Text:
"#;

/// Build the user prompt for one chunk.
pub fn build_prompt(chunk: &str) -> String {
    format!("{FLASHCARD_PROMPT}{chunk}")
}

/// Build the JSON request body for one completion call.
///
/// `response_format: json_object` asks the API to constrain output to a
/// JSON object; the repair pipeline still treats the result as untrusted.
fn build_request_body(config: &Config, chunk: &str) -> serde_json::Value {
    serde_json::json!({
        "model": config.generation.model,
        "temperature": config.generation.temperature,
        "max_tokens": config.generation.max_output_tokens,
        "response_format": { "type": "json_object" },
        "messages": [
            { "role": "user", "content": build_prompt(chunk) }
        ],
    })
}

/// Send one chunk to the completion API and return the raw model output.
pub async fn complete(config: &Config, api_key: &str, chunk: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.generation.timeout_secs))
        .build()?;

    let url = format!(
        "{}/chat/completions",
        config.openai_base_url.trim_end_matches('/')
    );
    let body = build_request_body(config, chunk);

    let mut last_err = None;

    for attempt in 0..=config.generation.max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_completion_response(&json);
                }

                // Rate limited or server error — retry
                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "completion API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                // Client error (not 429) — don't retry
                let body_text = response.text().await.unwrap_or_default();
                bail!("completion API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Completion failed after retries")))
}

/// Extract `choices[0].message.content` from the API response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| {
            anyhow::anyhow!("Invalid completion response: missing choices[0].message.content")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, DEFAULT_OPENAI_BASE_URL};

    fn test_config() -> Config {
        Config {
            openai_api_key: Some("test-key".to_string()),
            app_password: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            generation: GenerationConfig::default(),
        }
    }

    #[test]
    fn prompt_contains_chunk_and_instructions() {
        let prompt = build_prompt("Photosynthesis converts light to energy.");
        assert!(prompt.starts_with("You are a flashcard generator"));
        assert!(prompt.contains(r#"{"flashcards": []}"#));
        assert!(prompt.ends_with("Text:\nPhotosynthesis converts light to energy."));
    }

    #[test]
    fn request_body_uses_fixed_model_parameters() {
        let config = test_config();
        let body = build_request_body(&config, "some text");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 4000);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "user");
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.contains("some text"));
    }

    #[test]
    fn parse_response_extracts_first_choice_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  {\"flashcards\": []}  " } }
            ]
        });
        assert_eq!(
            parse_completion_response(&json).unwrap(),
            r#"{"flashcards": []}"#
        );
    }

    #[test]
    fn parse_response_rejects_missing_content() {
        let json = serde_json::json!({ "choices": [] });
        assert!(parse_completion_response(&json).is_err());
        let json = serde_json::json!({ "error": { "message": "boom" } });
        assert!(parse_completion_response(&json).is_err());
    }
}
