//! HTTP server for the Prometheus metrics endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::collector::SharedCollector;
use crate::exposition;
use crate::mi::SharedProvider;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
    provider: SharedProvider,
}

/// Create the HTTP router.
fn create_router(collector: SharedCollector, provider: SharedProvider, metrics_path: &str) -> Router {
    let state = AppState {
        collector,
        provider,
    };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint.
///
/// Each request fetches a fresh snapshot and runs one collection cycle; a
/// fetch failure is the one error surfaced to the monitoring client.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let snapshot = match state.provider.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            state.collector.record_failure();
            warn!(error = %e, "failed to fetch statistics");
            return (
                StatusCode::BAD_GATEWAY,
                format!("failed to fetch statistics: {}\n", e),
            )
                .into_response();
        }
    };

    let output = state.collector.collect(snapshot);
    let body = exposition::render(&output, state.collector.namespace(), &state.collector.stats());

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Handler for the /ready endpoint.
async fn ready_handler(State(state): State<AppState>) -> Response {
    let stats = state.collector.stats();

    if stats.scrapes > stats.scrape_failures {
        (StatusCode::OK, "ready\n").into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "not ready - no successful scrape yet\n",
        )
            .into_response()
    }
}

/// HTTP server configuration.
pub struct HttpServer {
    collector: SharedCollector,
    provider: SharedProvider,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(
        collector: SharedCollector,
        provider: SharedProvider,
        listen_addr: SocketAddr,
        metrics_path: String,
    ) -> Self {
        Self {
            collector,
            provider,
            listen_addr,
            metrics_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.collector, self.provider, &self.metrics_path);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            path = %self.metrics_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::mi::{MiError, StatisticsProvider};
    use crate::registry::Registry;
    use crate::snapshot::{Snapshot, Statistic};
    use axum::body::Body;
    use axum::http::Request;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StaticProvider(Snapshot);

    impl StatisticsProvider for StaticProvider {
        fn snapshot(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Snapshot, MiError>> + Send + '_>> {
            let snapshot = self.0.clone();
            Box::pin(async move { Ok(snapshot) })
        }
    }

    struct FailingProvider;

    impl StatisticsProvider for FailingProvider {
        fn snapshot(
            &self,
        ) -> Pin<Box<dyn Future<Output = Result<Snapshot, MiError>> + Send + '_>> {
            Box::pin(async { Err(MiError::Response("connection refused".to_string())) })
        }
    }

    fn make_collector() -> SharedCollector {
        Arc::new(Collector::new(
            Registry::with_default_processors("opensips").unwrap(),
        ))
    }

    fn registrar_snapshot() -> Snapshot {
        [
            Statistic::new("registrar", "max_expires", 3600.0),
            Statistic::new("registrar", "accepted_regs", 10.0),
        ]
        .into_iter()
        .collect()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let router = create_router(
            make_collector(),
            Arc::new(StaticProvider(registrar_snapshot())),
            "/metrics",
        );

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("opensips_registrar_max_expires 3600"));
        assert!(body.contains("opensips_registrar_registrations{type=\"accepted\"} 10"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_fetch_failure() {
        let collector = make_collector();
        let router = create_router(collector.clone(), Arc::new(FailingProvider), "/metrics");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(collector.stats().scrape_failures, 1);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let router = create_router(
            make_collector(),
            Arc::new(StaticProvider(Snapshot::new())),
            "/metrics",
        );

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint_not_ready() {
        let router = create_router(
            make_collector(),
            Arc::new(StaticProvider(Snapshot::new())),
            "/metrics",
        );

        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ready_endpoint_after_successful_scrape() {
        let collector = make_collector();
        let router = create_router(
            collector.clone(),
            Arc::new(StaticProvider(registrar_snapshot())),
            "/metrics",
        );

        let response = router
            .clone()
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let router = create_router(
            make_collector(),
            Arc::new(StaticProvider(Snapshot::new())),
            "/opensips/metrics",
        );

        let response = router
            .clone()
            .oneshot(
                Request::get("/opensips/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
