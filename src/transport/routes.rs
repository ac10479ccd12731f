//! The public HTTP surface.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::{Dispatcher, Inbound, Lifespan, TransportError};
use crate::config::ServerConfig;

/// Shared state for the HTTP routes
#[derive(Debug, Clone)]
pub struct AppState {
    service_name: Arc<str>,
    dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(service_name: impl Into<Arc<str>>, dispatcher: Dispatcher) -> Self {
        Self {
            service_name: service_name.into(),
            dispatcher,
        }
    }
}

/// Static routes plus the dispatcher as fallback for everything else
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_banner))
        .route("/healthz", get(health))
        .fallback(dispatch)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn service_banner(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "service": &*state.service_name, "status": "ok" }))
}

async fn health() -> &'static str {
    "ok"
}

async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    state
        .dispatcher
        .dispatch(Inbound::Http(request))
        .await
        .into_response()
}

/// Bind, start the mounted sub-application, and serve until Ctrl-C or SIGTERM
pub async fn serve(config: &ServerConfig, dispatcher: Dispatcher) -> Result<(), TransportError> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;

    dispatcher
        .dispatch(Inbound::Lifespan(Lifespan::Startup))
        .await
        .into_lifespan()?;

    let mounts: Vec<String> = dispatcher.mounts().iter().map(|m| m.to_string()).collect();
    tracing::info!(
        mounts = ?mounts,
        "{} listening on {}",
        config.service_name,
        listener.local_addr()?
    );

    let app = router(AppState::new(config.service_name.as_str(), dispatcher.clone()));
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(e) = dispatcher
        .dispatch(Inbound::Lifespan(Lifespan::Shutdown))
        .await
        .into_lifespan()
    {
        tracing::warn!("Sub-application shutdown failed: {}", e);
    }

    served.map_err(TransportError::Io)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MountedAt, Outbound, SubApp};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::StatusCode;
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Echoes the forwarded path back as the body
    #[derive(Default)]
    struct Echo {
        forwarded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SubApp for Echo {
        async fn call(&self, event: Inbound) -> Outbound {
            match event {
                Inbound::Http(request) => {
                    assert!(request.extensions().get::<MountedAt>().is_some());
                    let path = request.uri().path().to_string();
                    self.forwarded.lock().unwrap().push(path.clone());
                    Outbound::Http(path.into_response())
                }
                Inbound::Lifespan(_) => Outbound::Lifespan(Ok(())),
            }
        }
    }

    fn app(echo: Arc<Echo>) -> Router {
        let dispatcher = Dispatcher::new(["/mcp", "/sse"], echo);
        router(AppState::new("pubmed-mcp-server", dispatcher))
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_service_banner() {
        let (status, body) = get(app(Arc::default()), "/").await;
        assert_eq!(status, StatusCode::OK);

        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value, json!({"service": "pubmed-mcp-server", "status": "ok"}));
    }

    #[tokio::test]
    async fn test_healthz() {
        let (status, body) = get(app(Arc::default()), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_mounted_paths_are_forwarded() {
        let echo = Arc::new(Echo::default());

        let (status, body) = get(app(echo.clone()), "/mcp/events").await;
        assert_eq!((status, body.as_str()), (StatusCode::OK, "/events"));

        let (_, body) = get(app(echo.clone()), "/mcp").await;
        assert_eq!(body, "/");

        let (_, body) = get(app(echo.clone()), "/sse/").await;
        assert_eq!(body, "/");

        assert_eq!(echo.forwarded.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unmounted_paths_are_not_found() {
        let echo = Arc::new(Echo::default());

        for uri in ["/mcpextra", "/nope", "/healthz/extra"] {
            let (status, body) = get(app(echo.clone()), uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
            assert_eq!(body, "Not Found");
        }
        assert!(echo.forwarded.lock().unwrap().is_empty());
    }
}
