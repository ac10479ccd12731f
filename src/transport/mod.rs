//! HTTP transport: path dispatch in front of the embedded MCP sub-application.
//!
//! The HTTP surface is a small axum router serving `GET /` and `GET /healthz`.
//! Every other request goes to the [`Dispatcher`], which forwards requests
//! under a configured mount prefix (e.g. `/mcp`, `/sse`) to a [`SubApp`]
//! with the prefix stripped, and answers `404 Not Found` for the rest.
//!
//! Lifecycle events travel through the same dispatcher so the sub-application
//! can start and stop its own resources alongside the server.

mod dispatch;
mod embedded;
mod routes;

pub use dispatch::{not_found, Dispatcher, MountPrefix, MountedAt};
pub use embedded::EmbeddedMcp;
pub use routes::{router, serve, AppState};

use async_trait::async_trait;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Server lifecycle events delivered to the sub-application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifespan {
    Startup,
    Shutdown,
}

/// An event delivered to a [`SubApp`]
#[derive(Debug)]
pub enum Inbound {
    Http(Request),
    Lifespan(Lifespan),
}

/// What a [`SubApp`] produced for an [`Inbound`] event
#[derive(Debug)]
pub enum Outbound {
    Http(Response),
    Lifespan(Result<(), TransportError>),
}

impl Outbound {
    /// Outcome of a lifecycle event; an HTTP answer counts as success
    pub fn into_lifespan(self) -> Result<(), TransportError> {
        match self {
            Outbound::Lifespan(result) => result,
            Outbound::Http(_) => Ok(()),
        }
    }
}

impl IntoResponse for Outbound {
    fn into_response(self) -> Response {
        match self {
            Outbound::Http(response) => response,
            Outbound::Lifespan(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// An application mounted under a path prefix
///
/// Implementations handle their own errors; the dispatcher returns whatever
/// they produce unchanged.
#[async_trait]
pub trait SubApp: Send + Sync {
    async fn call(&self, event: Inbound) -> Outbound;
}

/// Errors raised by the transport layer
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The sub-application could not start
    #[error("Startup failed: {0}")]
    Startup(String),

    /// A request could not be relayed to the sub-application
    #[error("Relay failed: {0}")]
    Relay(String),

    /// A request body exceeded the relay limit
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// IO error (binding or serving)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
