use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Extension;
use axum::Json;
use placement::workflows::internships::{
    placement_router, NotificationSink, PlacementService, PlacementStore,
};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Placement routes plus the health and metrics endpoints served next to them.
pub(crate) fn with_placement_routes<S, N>(service: Arc<PlacementService<S, N>>) -> axum::Router
where
    S: PlacementStore + 'static,
    N: NotificationSink + 'static,
{
    placement_router(service)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
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
