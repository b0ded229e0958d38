//! HTTP transport for the flashcard generator.
//!
//! Browser clients upload from a static front end on another origin, so
//! CORS is wide open: every response carries
//! `Access-Control-Allow-Origin: *` and OPTIONS answers 200 with the
//! allowed methods and headers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/generate-flashcards` | Document in, flashcard batch out |
//! | `POST` | `/verify-password` | Check the shared front-end password |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error bodies are `{"success": false, "error": ...}`; structured
//! extraction errors add a `message` and, for oversized PDFs, `page_count`
//! and `max_allowed`. Validation order mirrors the pipeline: method →
//! credential (500) → content type (400) → body parse (500) → file type
//! (400) → base64 decode (500) → extraction (400). The file type is
//! checked before the payload is decoded, so an unsupported type is 400
//! regardless of body content.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::extract::{self, ExtractError};
use crate::generate::generate_flashcards;
use crate::models::Flashcard;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Starts the HTTP server on `bind_addr`. Runs until the process exits.
pub async fn run_server(config: Config, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(Arc::new(config));
    tracing::info!("flashdeck listening on http://{}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the application router.
pub fn router(config: Arc<Config>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(
            "/generate-flashcards",
            post(handle_generate).options(handle_preflight),
        )
        .route(
            "/verify-password",
            post(handle_verify_password).options(handle_preflight),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState {
            config,
        })
}

// ============ Error response ============

/// JSON error body. `message` and the page-count context appear only for
/// structured extraction errors.
#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_allowed: Option<usize>,
}

impl ErrorBody {
    fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            message: None,
            page_count: None,
            max_allowed: None,
        }
    }
}

/// Internal error type that converts into an HTTP response.
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Constructs a 400 Bad Request error with a fixed message.
fn bad_request(error: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorBody::new(error),
    }
}

/// Constructs a 500 Internal Server Error. The message is the error text
/// only; stack traces stay in the log.
fn internal_error(error: impl Into<String>) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: ErrorBody::new(error),
    }
}

/// Merge a structured extraction error into a 400 body: the kind becomes
/// the `error` field, the display text the `message`.
fn extraction_error(err: ExtractError) -> ApiError {
    let (page_count, max_allowed) = match &err {
        ExtractError::DocumentTooLong {
            page_count,
            max_allowed,
        } => (Some(*page_count), Some(*max_allowed)),
        _ => (None, None),
    };
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorBody {
            success: false,
            error: err.kind().to_string(),
            message: Some(err.to_string()),
            page_count,
            max_allowed,
        },
    }
}

// ============ OPTIONS (CORS preflight) ============

/// Bare OPTIONS handler. Preflights carrying `Access-Control-Request-*`
/// headers are answered by the CORS layer before reaching here; plain
/// OPTIONS probes get the same 200 with the allow lists and an empty body.
async fn handle_preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Health check used by monitors and the integration tests' readiness poll.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /generate-flashcards ============

#[derive(Deserialize)]
struct GenerateRequest {
    /// Base64-encoded file bytes.
    file_content: String,
    /// Declared MIME type of the upload.
    file_type: String,
}

#[derive(Serialize)]
struct GenerateResponse {
    success: bool,
    flashcards: Vec<Flashcard>,
    count: usize,
}

async fn handle_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<GenerateResponse>, ApiError> {
    let config = &state.config;

    let api_key = config
        .openai_api_key
        .as_deref()
        .ok_or_else(|| internal_error("OpenAI API key not configured"))?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.contains("application/json") {
        return Err(bad_request("Content-Type must be application/json"));
    }

    let request: GenerateRequest = serde_json::from_slice(&body)
        .map_err(|e| internal_error(format!("invalid request body: {}", e)))?;

    if !extract::is_supported(&request.file_type) {
        return Err(bad_request("Unsupported file type"));
    }

    let file_bytes = base64::engine::general_purpose::STANDARD
        .decode(request.file_content.as_bytes())
        .map_err(|e| internal_error(format!("invalid base64 file content: {}", e)))?;

    let text = extract::extract_text(
        &file_bytes,
        &request.file_type,
        config.generation.max_pdf_pages,
    )
    .map_err(extraction_error)?;

    if text.trim().is_empty() {
        return Err(ApiError {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                success: false,
                error: "empty_extracted_text".to_string(),
                message: Some("Could not extract text from file".to_string()),
                page_count: None,
                max_allowed: None,
            },
        });
    }

    let report = generate_flashcards(config, api_key, &text).await;
    let flashcards = report.flashcards;
    let count = flashcards.len();
    Ok(Json(GenerateResponse {
        success: true,
        flashcards,
        count,
    }))
}

// ============ POST /verify-password ============

#[derive(Deserialize)]
struct VerifyRequest {
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    success: bool,
    authenticated: bool,
}

/// Plain equality against the configured secret. Deliberately not a
/// hardened authentication scheme; it gates a static front end.
async fn handle_verify_password(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(secret) = state.config.app_password.as_deref() else {
        return internal_error("Password not configured").into_response();
    };
    let request: VerifyRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return internal_error(format!("invalid request body: {}", e)).into_response(),
    };
    if request.password == secret {
        (
            StatusCode::OK,
            Json(VerifyResponse {
                success: true,
                authenticated: true,
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                success: false,
                authenticated: false,
            }),
        )
            .into_response()
    }
}
