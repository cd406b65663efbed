use crate::cli::ServeArgs;
use crate::infra::{
    load_colonies, load_schedule, AppState, InMemoryEventLog, InMemoryHistoryRepository,
    InMemoryOtpStore, InMemoryUserRepository, RecordingOtpSender,
};
use crate::routes::{
    admin_router, healthcheck, metrics_endpoint, readiness_endpoint, AdminState,
};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use delhi_duty::accounts::{account_router, AccountService};
use delhi_duty::config::AppConfig;
use delhi_duty::error::AppError;
use delhi_duty::telemetry;
use delhi_duty::valuation::{valuation_router, ValuationService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let schedule = Arc::new(load_schedule(&config.data)?);
    let colonies = Arc::new(load_colonies(&config.data)?);

    let history = Arc::new(InMemoryHistoryRepository::default());
    let events = Arc::new(InMemoryEventLog::default());
    let valuation_service = Arc::new(ValuationService::new(
        schedule,
        colonies,
        history.clone(),
        events.clone(),
    ));

    let users = Arc::new(InMemoryUserRepository::default());
    let otps = Arc::new(InMemoryOtpStore::default());
    let otp_sender = Arc::new(RecordingOtpSender::default());
    let account_service = Arc::new(AccountService::with_otp_ttl_minutes(
        users.clone(),
        otps.clone(),
        otp_sender,
        config.data.otp_ttl_minutes,
    ));

    let admin_state = Arc::new(AdminState {
        users,
        history,
        events,
        otps,
    });

    let app = valuation_router(valuation_service)
        .merge(account_router(account_service))
        .merge(admin_router(admin_state))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "duty calculator service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
