//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use super::endpoint::{ENDPOINTS, Endpoint};
use super::envelope::Envelope;
use super::validation::ValidationError;
use crate::psn::PsnApi;

/// Default request body limit
const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Shared application state
pub struct AppState {
    /// Upstream PlayStation Network client
    pub psn: Arc<dyn PsnApi>,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
}

impl AppState {
    /// State with the default body limit
    pub fn new(psn: Arc<dyn PsnApi>) -> Self {
        Self {
            psn,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler));

    for endpoint in ENDPOINTS {
        let handler = move |State(state): State<Arc<AppState>>,
                            body: Result<Bytes, BytesRejection>| async move {
            match body {
                Ok(body) => endpoint_handler(&state, endpoint, &body)
                    .await
                    .into_response(),
                Err(rejection) => unreadable_body(&rejection),
            }
        };
        for path in endpoint.paths() {
            router = router.route(&path, post(handler));
        }
    }

    router
        .fallback(not_found_handler)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .layer(DefaultBodyLimit::max(state.max_body_size))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST handler shared by every gateway route
async fn endpoint_handler(state: &AppState, endpoint: &Endpoint, body: &[u8]) -> Envelope {
    let body = match parse_body(body) {
        Ok(body) => body,
        Err(err) => return err.into(),
    };

    endpoint.process(state.psn.as_ref(), body).await
}

/// An empty body is an empty object; anything else must be JSON
fn parse_body(body: &[u8]) -> Result<Value, ValidationError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    serde_json::from_slice(body).map_err(|e| {
        ValidationError::new(format!("Invalid JSON body: {e}"), Vec::<String>::new())
    })
}

/// Body that could not be buffered, e.g. over the size limit
fn unreadable_body(rejection: &BytesRejection) -> Response {
    (
        rejection.status(),
        Json(json!({ "error": rejection.body_text() })),
    )
        .into_response()
}

/// Welcome message
async fn root_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "message": "🚀 Welcome to psn-gateway!" })),
    )
}

/// Liveness probe; never calls upstream
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

async fn method_not_allowed_handler() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_empty_object() {
        assert_eq!(parse_body(b"").unwrap(), json!({}));
        assert_eq!(parse_body(b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn malformed_body_is_a_validation_error() {
        let err = parse_body(b"{\"npsso\":").unwrap_err();
        assert!(err.message.starts_with("Invalid JSON body"));
        assert!(err.fields.is_empty());
    }

    #[test]
    fn json_body_is_parsed() {
        assert_eq!(
            parse_body(br#"{"npsso":"abc"}"#).unwrap(),
            json!({"npsso": "abc"})
        );
    }
}
