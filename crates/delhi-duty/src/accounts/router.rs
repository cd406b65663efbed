use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::repository::{OtpSender, OtpStore, UserRepository};
use super::service::{AccountError, AccountService};

/// Router builder exposing the OTP-gated account endpoints.
pub fn account_router<U, O, S>(service: Arc<AccountService<U, O, S>>) -> Router
where
    U: UserRepository + 'static,
    O: OtpStore + 'static,
    S: OtpSender + 'static,
{
    Router::new()
        .route("/api/v1/accounts/signup", post(begin_signup_handler::<U, O, S>))
        .route(
            "/api/v1/accounts/signup/confirm",
            post(confirm_signup_handler::<U, O, S>),
        )
        .route("/api/v1/accounts/login", post(login_handler::<U, O, S>))
        .route("/api/v1/accounts/reset", post(begin_reset_handler::<U, O, S>))
        .route(
            "/api/v1/accounts/reset/confirm",
            post(confirm_reset_handler::<U, O, S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct BeginSignupRequest {
    pub(crate) email: String,
    pub(crate) username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmSignupRequest {
    pub(crate) email: String,
    pub(crate) username: String,
    pub(crate) code: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) identifier: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BeginResetRequest {
    pub(crate) identifier: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ConfirmResetRequest {
    pub(crate) email: String,
    pub(crate) code: String,
    pub(crate) new_password: String,
}

pub(crate) async fn begin_signup_handler<U, O, S>(
    State(service): State<Arc<AccountService<U, O, S>>>,
    axum::Json(request): axum::Json<BeginSignupRequest>,
) -> Response
where
    U: UserRepository + 'static,
    O: OtpStore + 'static,
    S: OtpSender + 'static,
{
    match service.begin_signup(&request.email, &request.username, Utc::now()) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            axum::Json(json!({ "status": "otp_sent" })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn confirm_signup_handler<U, O, S>(
    State(service): State<Arc<AccountService<U, O, S>>>,
    axum::Json(request): axum::Json<ConfirmSignupRequest>,
) -> Response
where
    U: UserRepository + 'static,
    O: OtpStore + 'static,
    S: OtpSender + 'static,
{
    match service.confirm_signup(
        &request.email,
        &request.username,
        &request.code,
        &request.password,
        Utc::now(),
    ) {
        Ok(account) => (StatusCode::CREATED, axum::Json(account)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn login_handler<U, O, S>(
    State(service): State<Arc<AccountService<U, O, S>>>,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Response
where
    U: UserRepository + 'static,
    O: OtpStore + 'static,
    S: OtpSender + 'static,
{
    match service.login(&request.identifier, &request.password, Utc::now()) {
        Ok(account) => (StatusCode::OK, axum::Json(account)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn begin_reset_handler<U, O, S>(
    State(service): State<Arc<AccountService<U, O, S>>>,
    axum::Json(request): axum::Json<BeginResetRequest>,
) -> Response
where
    U: UserRepository + 'static,
    O: OtpStore + 'static,
    S: OtpSender + 'static,
{
    match service.begin_password_reset(&request.identifier, Utc::now()) {
        Ok(email) => (
            StatusCode::ACCEPTED,
            axum::Json(json!({ "status": "otp_sent", "email": email })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn confirm_reset_handler<U, O, S>(
    State(service): State<Arc<AccountService<U, O, S>>>,
    axum::Json(request): axum::Json<ConfirmResetRequest>,
) -> Response
where
    U: UserRepository + 'static,
    O: OtpStore + 'static,
    S: OtpSender + 'static,
{
    match service.confirm_password_reset(
        &request.email,
        &request.code,
        &request.new_password,
        Utc::now(),
    ) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({ "status": "password_updated" })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: AccountError) -> Response {
    let status = match &error {
        AccountError::EmailTaken(_) | AccountError::UsernameTaken(_) => StatusCode::CONFLICT,
        AccountError::UnknownUser(_) => StatusCode::NOT_FOUND,
        AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AccountError::InvalidOtp => StatusCode::UNPROCESSABLE_ENTITY,
        AccountError::Repository(_) | AccountError::Delivery(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
