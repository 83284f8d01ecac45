use crate::cli::ServeArgs;
use crate::infra::{
    shared_roster, ApiBackend, AppState, InMemoryAssignmentStore, InMemoryFeedbackStore,
    InMemorySubmissionStore, LoggingNotificationSink, RosterDirectory,
};
use crate::routes::with_submission_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use peergrade::config::AppConfig;
use peergrade::error::AppError;
use peergrade::telemetry;
use peergrade::workflows::submissions::SubmissionLifecycleService;
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

    let roster = shared_roster();
    let submissions = Arc::new(InMemorySubmissionStore::new(roster.clone()));
    let feedback = Arc::new(InMemoryFeedbackStore::default());
    let assignments = Arc::new(InMemoryAssignmentStore::default());
    let directory = Arc::new(RosterDirectory::new(roster));
    let notifications = Arc::new(LoggingNotificationSink);

    let backend = ApiBackend::from_config(&config.ai)?;
    if !backend.is_configured() {
        info!("no completion backend configured; feedback uses the rule-based fallback");
    }

    let service = Arc::new(SubmissionLifecycleService::new(
        submissions,
        feedback,
        assignments,
        directory,
        notifications,
        Arc::new(backend),
        config.review.policy(),
        config.ai.generation_params(),
    ));

    let app = with_submission_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "submission review service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
