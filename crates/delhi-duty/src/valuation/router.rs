use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::accounts::UserId;
use crate::history::{EventLog, HistoryRepository};

use super::service::{
    DdaValuationRequest, ValuationRequest, ValuationService, ValuationServiceError,
};

/// Router builder exposing the public calculator endpoints.
pub fn valuation_router<H, E>(service: Arc<ValuationService<H, E>>) -> Router
where
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
{
    Router::new()
        .route("/api/v1/valuations", post(calculate_handler::<H, E>))
        .route("/api/v1/valuations/dda", post(calculate_dda_handler::<H, E>))
        .route("/api/v1/history", post(save_history_handler::<H, E>))
        .route("/api/v1/history/:user_id", get(history_handler::<H, E>))
        .route("/api/v1/colonies", get(colonies_handler::<H, E>))
        .route("/api/v1/colonies/:name", get(colony_handler::<H, E>))
        .with_state(service)
}

pub(crate) async fn calculate_handler<H, E>(
    State(service): State<Arc<ValuationService<H, E>>>,
    axum::Json(request): axum::Json<ValuationRequest>,
) -> Response
where
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
{
    match service.calculate(&request, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn calculate_dda_handler<H, E>(
    State(service): State<Arc<ValuationService<H, E>>>,
    axum::Json(request): axum::Json<DdaValuationRequest>,
) -> Response
where
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
{
    match service.calculate_dda(&request, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveHistoryRequest {
    pub(crate) user_id: String,
    pub(crate) request: ValuationRequest,
}

pub(crate) async fn save_history_handler<H, E>(
    State(service): State<Arc<ValuationService<H, E>>>,
    axum::Json(payload): axum::Json<SaveHistoryRequest>,
) -> Response
where
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
{
    match service.save(UserId(payload.user_id), &payload.request, Utc::now()) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<H, E>(
    State(service): State<Arc<ValuationService<H, E>>>,
    Path(user_id): Path<String>,
) -> Response
where
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
{
    match service.history_for(&UserId(user_id)) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn colonies_handler<H, E>(
    State(service): State<Arc<ValuationService<H, E>>>,
) -> Response
where
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
{
    (
        StatusCode::OK,
        axum::Json(service.colonies().records().to_vec()),
    )
        .into_response()
}

pub(crate) async fn colony_handler<H, E>(
    State(service): State<Arc<ValuationService<H, E>>>,
    Path(name): Path<String>,
) -> Response
where
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
{
    match service.colonies().lookup(&name) {
        Some(record) => (StatusCode::OK, axum::Json(record.clone())).into_response(),
        None => {
            let payload = json!({ "error": format!("unknown colony '{name}'") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

fn error_response(error: ValuationServiceError) -> Response {
    let status = match &error {
        ValuationServiceError::Valuation(_) | ValuationServiceError::MissingCategory => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ValuationServiceError::UnknownColony(_) => StatusCode::NOT_FOUND,
        ValuationServiceError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
