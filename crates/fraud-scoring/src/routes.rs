//! Superficie HTTP del servicio.
//!
//! Dos endpoints con el mismo contrato de entrada:
//! - `POST /data`: responde el registro (array de uno) con `Predicted_Class`.
//! - `POST /cross_validate`: además anexa la fila al log de auditoría antes
//!   de responder.
//!
//! Toda falla de procesamiento (body ilegible, columna ausente, valor no
//! numérico, auditoría) responde `{"error": ...}` con status 500, que el
//! relay poller trata como fallo reintenable del lote.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use log::{debug, warn};
use serde_json::json;

use fraud_domain::{ScoringRequest, ScoringResponse};

use crate::audit::AuditLog;
use crate::context::ScoringContext;

#[derive(Clone)]
pub struct AppState {
    pub context: Arc<ScoringContext>,
    pub audit: Arc<AuditLog>,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/data", post(handle_data))
                 .route("/cross_validate", post(handle_cross_validate))
                 .with_state(state)
}

fn error_response(message: String) -> Response {
    warn!("request rechazado: {message}");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message }))).into_response()
}

pub(crate) async fn handle_data(
    State(state): State<AppState>,
    payload: Result<Json<ScoringRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return error_response(rejection.body_text()),
    };
    match state.context.score(&request) {
        Ok(predicted) => {
            debug!("scored Predicted_Class={predicted}");
            let response = ScoringResponse::from_request(request, predicted);
            (StatusCode::OK, Json(vec![response])).into_response()
        }
        Err(e) => error_response(e.to_string()),
    }
}

pub(crate) async fn handle_cross_validate(
    State(state): State<AppState>,
    payload: Result<Json<ScoringRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return error_response(rejection.body_text()),
    };
    match state.context.score(&request) {
        Ok(predicted) => {
            let response = ScoringResponse::from_request(request, predicted);
            // Auditoría síncrona: la fila queda anexada antes del 200.
            if let Err(e) = state.audit.append(&response) {
                return error_response(e.to_string());
            }
            (StatusCode::OK, Json(json!({ "message": "Data saved to CSV successfully!" })))
                .into_response()
        }
        Err(e) => error_response(e.to_string()),
    }
}
