//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse, ErrorResponse,
    HealthResponse,
};
use common::ServiceError;
use tracing::{error, warn};

use super::state::AppState;
use crate::service::EnvelopeError;

/// `POST /encrypt` — encrypt a plaintext string into an envelope.
pub async fn encrypt(State(state): State<AppState>, Json(req): Json<EncryptRequest>) -> Response {
    match state.service.encrypt(&req.plaintext).await {
        Ok(ciphertext) => (StatusCode::OK, Json(EncryptResponse { ciphertext })).into_response(),
        Err(e) => error_response("encrypt", e),
    }
}

/// `POST /decrypt` — recover the plaintext string from an envelope.
///
/// Failures after the envelope has been parsed all produce the same response
/// body; the specific cause is only logged.
pub async fn decrypt(State(state): State<AppState>, Json(req): Json<DecryptRequest>) -> Response {
    match state.service.decrypt(&req.ciphertext).await {
        Ok(plaintext) => (StatusCode::OK, Json(DecryptResponse { plaintext })).into_response(),
        Err(e) => error_response("decrypt", e),
    }
}

/// `GET /health` — liveness check reporting the configured cipher suite.
///
/// The credential store is not contacted.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        cipher_suite: state.service.suite().to_string(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

fn error_response(operation: &'static str, err: EnvelopeError) -> Response {
    match err {
        EnvelopeError::SecretUnavailable
        | EnvelopeError::RandomUnavailable
        | EnvelopeError::Internal => error!(operation, error = %err, "request failed"),
        _ => warn!(operation, error = %err, "request rejected"),
    }

    let service_err = ServiceError::from(err);
    let status = StatusCode::from_u16(service_err.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&service_err))).into_response()
}
