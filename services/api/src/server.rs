use crate::cli::ServeArgs;
use crate::infra::{sample_directory, AppState};
use crate::routes::with_placement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement::config::AppConfig;
use placement::error::AppError;
use placement::telemetry;
use placement::workflows::internships::{
    Clock, InMemoryNoticeBox, InMemoryPlacementStore, PlacementContext, PlacementService,
    SystemClock,
};
use std::sync::atomic::{AtomicBool, Ordering};
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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = if args.empty {
        InMemoryPlacementStore::new()
    } else {
        sample_directory(clock.today())
    };
    let context = PlacementContext::new(
        Arc::new(store),
        Arc::new(InMemoryNoticeBox::default()),
        clock,
        config.limits,
    );
    let service = Arc::new(PlacementService::new(context));

    let app = with_placement_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        seeded = !args.empty,
        max_active_applications = config.limits.max_active_applications,
        "internship placement service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
