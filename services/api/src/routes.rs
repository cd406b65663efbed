use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Extension, Json, Router};
use delhi_duty::accounts::{OtpStore, UserId, UserRepository};
use delhi_duty::history::{EventLog, HistoryRepository};
use delhi_duty::valuation::PropertyUse;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Shared stores behind the staff endpoints. Session/authorization for staff
/// is the host's concern; these routes only expose the data operations.
pub(crate) struct AdminState<U, H, E, O> {
    pub(crate) users: Arc<U>,
    pub(crate) history: Arc<H>,
    pub(crate) events: Arc<E>,
    pub(crate) otps: Arc<O>,
}

const ADMIN_LIST_LIMIT: usize = 200;

#[derive(Debug, Serialize)]
pub(crate) struct AdminOverview {
    pub(crate) users: usize,
    pub(crate) history_records: usize,
    pub(crate) events: usize,
    pub(crate) residential_events: usize,
    pub(crate) commercial_events: usize,
    pub(crate) total_duty_assessed: f64,
}

pub(crate) fn admin_router<U, H, E, O>(state: Arc<AdminState<U, H, E, O>>) -> Router
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    Router::new()
        .route("/api/v1/admin/overview", get(overview_handler::<U, H, E, O>))
        .route("/api/v1/admin/users", get(list_users_handler::<U, H, E, O>))
        .route(
            "/api/v1/admin/users/:user_id",
            delete(delete_user_handler::<U, H, E, O>),
        )
        .route(
            "/api/v1/admin/history",
            get(list_history_handler::<U, H, E, O>).delete(clear_history_handler::<U, H, E, O>),
        )
        .route(
            "/api/v1/admin/events",
            get(list_events_handler::<U, H, E, O>).delete(clear_events_handler::<U, H, E, O>),
        )
        .route(
            "/api/v1/admin/otps",
            get(list_otps_handler::<U, H, E, O>).delete(clear_otps_handler::<U, H, E, O>),
        )
        .with_state(state)
}

pub(crate) async fn overview_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    let users = state.users.list().map(|users| users.len());
    let history_records = state.history.recent(usize::MAX).map(|records| records.len());
    let events = state.events.recent(usize::MAX);

    match (users, history_records, events) {
        (Ok(users), Ok(history_records), Ok(events)) => {
            let residential_events = events
                .iter()
                .filter(|event| event.property_use == PropertyUse::Residential)
                .count();
            let total_duty_assessed = events.iter().map(|event| event.total_duty).sum();
            let overview = AdminOverview {
                users,
                history_records,
                events: events.len(),
                residential_events,
                commercial_events: events.len() - residential_events,
                total_duty_assessed,
            };
            (StatusCode::OK, Json(overview)).into_response()
        }
        _ => storage_unavailable(),
    }
}

pub(crate) async fn list_users_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    match state.users.list() {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(_) => storage_unavailable(),
    }
}

/// Removing an account also removes its saved history, so no orphaned
/// records survive the deletion.
pub(crate) async fn delete_user_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    let id = UserId(user_id);
    match state.users.delete(&id) {
        Ok(()) => match state.history.delete_for_user(&id) {
            Ok(removed_history) => (
                StatusCode::OK,
                Json(json!({ "deleted": id.0, "history_removed": removed_history })),
            )
                .into_response(),
            Err(_) => storage_unavailable(),
        },
        Err(_) => {
            let payload = json!({ "error": format!("no user '{}'", id.0) });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
    }
}

pub(crate) async fn list_history_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    match state.history.recent(ADMIN_LIST_LIMIT) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(_) => storage_unavailable(),
    }
}

pub(crate) async fn clear_history_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    match state.history.clear() {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(_) => storage_unavailable(),
    }
}

pub(crate) async fn list_events_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    match state.events.recent(ADMIN_LIST_LIMIT) {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(_) => storage_unavailable(),
    }
}

pub(crate) async fn clear_events_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    match state.events.clear() {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(_) => storage_unavailable(),
    }
}

pub(crate) async fn list_otps_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    match state.otps.list() {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(_) => storage_unavailable(),
    }
}

pub(crate) async fn clear_otps_handler<U, H, E, O>(
    State(state): State<Arc<AdminState<U, H, E, O>>>,
) -> impl IntoResponse
where
    U: UserRepository + 'static,
    H: HistoryRepository + 'static,
    E: EventLog + 'static,
    O: OtpStore + 'static,
{
    match state.otps.clear() {
        Ok(removed) => (StatusCode::OK, Json(json!({ "removed": removed }))).into_response(),
        Err(_) => storage_unavailable(),
    }
}

fn storage_unavailable() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "storage unavailable" })),
    )
        .into_response()
}
