use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryEntityStore};
use crate::routes::with_risk_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use riskwatch::config::AppConfig;
use riskwatch::error::AppError;
use riskwatch::scoring::{HttpScoringOracle, RiskScoringService};
use riskwatch::telemetry;
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
    if let Some(oracle_url) = args.oracle_url.take() {
        config.oracle.base_url = oracle_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryEntityStore::seeded());
    let oracle = Arc::new(HttpScoringOracle::new(&config.oracle)?);
    let scoring_service = Arc::new(RiskScoringService::new(store, oracle, config.scoring));

    let app = with_risk_routes(scoring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        oracle = %config.oracle.base_url,
        "risk scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
