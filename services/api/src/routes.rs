use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use screening_relay::workflows::screening::{
    listen_router, ResultStore, ScreeningClient, ScreeningService,
};

pub(crate) fn with_screening_routes<S, C>(service: Arc<ScreeningService<S, C>>) -> axum::Router
where
    S: ResultStore + 'static,
    C: ScreeningClient + 'static,
{
    listen_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::RelayService;
    use axum::body::Body;
    use axum::http::Request;
    use screening_relay::config::{PollMode, ProviderDirectory, ScreeningConfig};
    use screening_relay::workflows::screening::{HttpScreeningClient, InMemoryResultStore};
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_service() -> Arc<RelayService> {
        let config = ScreeningConfig {
            providers: ProviderDirectory::default(),
            callback_base_url: "http://127.0.0.1:3000".to_string(),
            poll_mode: PollMode::Retain,
            poll_interval_secs: 2,
        };
        Arc::new(ScreeningService::new(
            Arc::new(InMemoryResultStore::default()),
            Arc::new(
                HttpScreeningClient::new(Duration::from_secs(5)).expect("client builds"),
            ),
            config,
        ))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(payload) = healthcheck().await;
        assert_eq!(payload, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_flips_with_the_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let state = AppState {
            readiness: flag.clone(),
            metrics: Arc::new(
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle(),
            ),
        };

        let response = readiness_endpoint(Extension(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        flag.store(true, std::sync::atomic::Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listen_routes_are_mounted_alongside_health() {
        let router = with_screening_routes(test_service());

        let response = router
            .clone()
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(
                Request::get("/api/listen/some-request")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body reads");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("body is JSON");
        assert_eq!(payload["success"], true);
        assert!(payload["data"].is_null());
    }
}
