//! The MCP streamable-HTTP transport as a mountable sub-application.
//!
//! pmcp's streamable HTTP server owns its listener, so [`EmbeddedMcp`] starts
//! it on a loopback port during [`Lifespan::Startup`] and relays mounted
//! requests to it. Response bodies are streamed back unbuffered so SSE
//! channels keep working through the relay.

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures_util::TryStreamExt;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::{Inbound, Lifespan, MountedAt, Outbound, SubApp, TransportError};
use crate::mcp::McpServer;

/// Largest request body relayed to the MCP transport
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

struct Running {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

/// The pmcp streamable-HTTP server, mounted behind the dispatcher
pub struct EmbeddedMcp {
    server: McpServer,
    bind: SocketAddr,
    client: reqwest::Client,
    running: RwLock<Option<Running>>,
}

impl std::fmt::Debug for EmbeddedMcp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedMcp")
            .field("bind", &self.bind)
            .finish_non_exhaustive()
    }
}

impl EmbeddedMcp {
    /// Wrap an MCP server; it is started on an ephemeral loopback port at startup
    pub fn new(server: McpServer) -> Result<Self, TransportError> {
        // Bodies and encodings pass through untouched
        let client = reqwest::Client::builder()
            .no_gzip()
            .no_brotli()
            .no_deflate()
            .build()
            .map_err(|e| TransportError::Startup(format!("Failed to create relay client: {}", e)))?;

        Ok(Self {
            server,
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            client,
            running: RwLock::new(None),
        })
    }

    /// Address of the running inner transport
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.read().await.as_ref().map(|running| running.addr)
    }

    async fn startup(&self) -> Result<(), TransportError> {
        let mut running = self.running.write().await;
        if running.is_some() {
            return Ok(());
        }

        let (addr, handle) = self
            .server
            .start_http(self.bind)
            .await
            .map_err(|e| TransportError::Startup(e.to_string()))?;

        tracing::info!("MCP transport listening internally on {}", addr);
        *running = Some(Running { addr, handle });
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        if let Some(running) = self.running.write().await.take() {
            running.handle.abort();
            tracing::info!("MCP transport on {} stopped", running.addr);
        }
        Ok(())
    }

    async fn relay(&self, request: Request) -> Response {
        let Some(addr) = self.local_addr().await else {
            return (StatusCode::SERVICE_UNAVAILABLE, "MCP transport not started").into_response();
        };

        match self.forward(addr, request).await {
            Ok(response) => response,
            Err(e @ TransportError::PayloadTooLarge(_)) => {
                tracing::debug!("{}", e);
                (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response()
            }
            Err(e) => {
                tracing::warn!("{}", e);
                (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
            }
        }
    }

    async fn forward(&self, addr: SocketAddr, request: Request) -> Result<Response, TransportError> {
        let (parts, body) = request.into_parts();

        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("http://{}{}", addr, target);

        let mut headers = parts.headers.clone();
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        if let Some(MountedAt(prefix)) = parts.extensions.get::<MountedAt>() {
            if let Ok(value) = HeaderValue::from_str(prefix.as_str()) {
                headers.insert(HeaderName::from_static("x-forwarded-prefix"), value);
            }
        }

        let body = Limited::new(body, MAX_BODY_BYTES)
            .collect()
            .await
            .map_err(|e| {
                if e.downcast_ref::<LengthLimitError>().is_some() {
                    TransportError::PayloadTooLarge(MAX_BODY_BYTES)
                } else {
                    TransportError::Relay(format!("Failed to read request body: {}", e))
                }
            })?
            .to_bytes();

        let upstream = self
            .client
            .request(parts.method.clone(), &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Relay(format!("{} {}: {}", parts.method, url, e)))?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        strip_hop_by_hop(&mut headers);

        let stream = upstream
            .bytes_stream()
            .inspect_err(|e| tracing::warn!("MCP relay stream interrupted: {}", e));

        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

#[async_trait]
impl SubApp for EmbeddedMcp {
    async fn call(&self, event: Inbound) -> Outbound {
        match event {
            Inbound::Http(request) => Outbound::Http(self.relay(request).await),
            Inbound::Lifespan(Lifespan::Startup) => Outbound::Lifespan(self.startup().await),
            Inbound::Lifespan(Lifespan::Shutdown) => Outbound::Lifespan(self.shutdown().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;
    use std::sync::Arc;

    fn embedded() -> EmbeddedMcp {
        let server = McpServer::new(Arc::new(MockSource::new())).unwrap();
        EmbeddedMcp::new(server).unwrap()
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        strip_hop_by_hop(&mut headers);

        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(header::CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_request_before_startup_is_unavailable() {
        let app = embedded();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        match app.call(Inbound::Http(request)).await {
            Outbound::Http(response) => {
                assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE)
            }
            Outbound::Lifespan(_) => panic!("expected an HTTP response"),
        }
    }

    #[tokio::test]
    async fn test_forward_relays_request_and_response() {
        let mut upstream = mockito::Server::new_async().await;
        let mock = upstream
            .mock("POST", "/")
            .match_query(mockito::Matcher::UrlEncoded("session".into(), "abc".into()))
            .match_header("x-forwarded-prefix", "/mcp")
            .match_header("content-type", "application/json")
            .match_body(r#"{"jsonrpc":"2.0"}"#)
            .with_status(202)
            .with_header("mcp-session-id", "s-1")
            .with_body("relayed")
            .create_async()
            .await;

        let mut request = Request::builder()
            .method("POST")
            .uri("/?session=abc")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONNECTION, "keep-alive")
            .body(Body::from(r#"{"jsonrpc":"2.0"}"#))
            .unwrap();
        request
            .extensions_mut()
            .insert(MountedAt(crate::transport::MountPrefix::new("/mcp")));

        let response = embedded()
            .forward(upstream.socket_address(), request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["mcp-session-id"], "s-1");
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"relayed");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected() {
        let mut upstream = mockito::Server::new_async().await;
        let mock = upstream
            .mock("POST", "/")
            .expect(0)
            .create_async()
            .await;

        let request = Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(vec![b'x'; MAX_BODY_BYTES + 1]))
            .unwrap();

        let err = embedded()
            .forward(upstream.socket_address(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::PayloadTooLarge(MAX_BODY_BYTES)));

        let app = embedded();
        app.call(Inbound::Lifespan(Lifespan::Startup))
            .await
            .into_lifespan()
            .unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(vec![b'x'; MAX_BODY_BYTES + 1]))
            .unwrap();
        match app.call(Inbound::Http(request)).await {
            Outbound::Http(response) => {
                assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE)
            }
            Outbound::Lifespan(_) => panic!("expected an HTTP response"),
        }
        app.call(Inbound::Lifespan(Lifespan::Shutdown)).await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_startup_and_shutdown() {
        let app = embedded();

        assert!(app.call(Inbound::Lifespan(Lifespan::Startup)).await.into_lifespan().is_ok());
        let addr = app.local_addr().await.expect("transport should be running");
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);

        assert!(app.call(Inbound::Lifespan(Lifespan::Shutdown)).await.into_lifespan().is_ok());
        assert!(app.local_addr().await.is_none());
    }
}
