//! HTTP surface.
//!
//! - `POST /api/reader`    `{url}` or `{text}` -> `{summary, content}`
//! - `POST /api/normalize` `{text}` -> `{cleaned, changed}`
//! - `GET  /health`
//!
//! Errors are always JSON: `{error, details?}`. A 500 means nothing was retrieved; a
//! degraded summary still comes back as a 200 with the extracted content.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use webreader_core::{
    normalize_report, Error, NormalizeReport, Reader, ReaderInput, ReaderResponse, Role,
};

#[derive(Clone)]
pub struct AppState {
    pub reader: Arc<Reader>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/reader", post(reader_handler))
        .route("/api/normalize", post(normalize_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ReaderRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NormalizeRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(msg) => Self::new(StatusCode::BAD_REQUEST, msg, None),
            Error::InvalidUrl(msg) => Self::new(StatusCode::BAD_REQUEST, "Invalid URL", Some(msg)),
            Error::NotConfigured(msg) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error",
                Some(msg),
            ),
            Error::AllCredentialsFailed {
                role: Role::Extraction,
                last_error,
                ..
            } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch content",
                Some(last_error),
            ),
            other => Self::new(StatusCode::INTERNAL_SERVER_ERROR, other.to_string(), None),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub async fn reader_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReaderRequest>, JsonRejection>,
) -> Result<Json<ReaderResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "URL is required",
            Some(e.body_text()),
        )
    })?;

    let input = ReaderInput::parse(req.url.as_deref(), req.text.as_deref())?;
    match &input {
        ReaderInput::Url(url) => info!(mode = "url", url = without_query(url), "reader request"),
        ReaderInput::Text(text) => info!(mode = "text", chars = text.chars().count(), "reader request"),
    }

    let out = state.reader.process(&input).await.map_err(|e| {
        warn!(error = %e, "reader request failed");
        ApiError::from(e)
    })?;
    Ok(Json(out))
}

/// Query strings carry click ids and signed tokens; keep them out of request logs.
fn without_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

pub async fn normalize_handler(
    payload: Result<Json<NormalizeRequest>, JsonRejection>,
) -> Result<Json<NormalizeReport>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "Invalid request body",
            Some(e.body_text()),
        )
    })?;
    Ok(Json(normalize_report(&req.text)))
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "name": "webreader",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
