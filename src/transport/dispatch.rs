//! Prefix-based request dispatch.

use std::fmt;
use std::sync::Arc;

use axum::extract::Request;
use axum::http::uri::{PathAndQuery, Uri};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::{Inbound, Outbound, SubApp};

/// A normalized mount prefix
///
/// Leading `/` is added and trailing `/` removed, so `mcp/`, `/mcp` and
/// `/mcp/` are the same prefix. `/` mounts at the root and matches every path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPrefix(String);

impl MountPrefix {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            Self(String::new())
        } else if trimmed.starts_with('/') {
            Self(trimmed.to_string())
        } else {
            Self(format!("/{}", trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        if self.0.is_empty() {
            "/"
        } else {
            &self.0
        }
    }

    /// Residual path after removing this prefix, or `None` if the path is not under it
    ///
    /// Only an exact match or the prefix followed by `/` counts: `/mcpx` is not
    /// under `/mcp`. An exact match leaves `/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.0.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

impl fmt::Display for MountPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for MountPrefix {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Request extension recording the prefix a forwarded request was mounted under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedAt(pub MountPrefix);

/// The fixed response for paths outside every mount
pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}

/// Routes inbound events to a sub-application mounted under one or more prefixes
#[derive(Clone)]
pub struct Dispatcher {
    mounts: Arc<[MountPrefix]>,
    app: Arc<dyn SubApp>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("mounts", &self.mounts)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn new<I, P>(mounts: I, app: Arc<dyn SubApp>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<MountPrefix>,
    {
        Self {
            mounts: mounts.into_iter().map(Into::into).collect(),
            app,
        }
    }

    pub fn mounts(&self) -> &[MountPrefix] {
        &self.mounts
    }

    /// Forward an event to the sub-application, or answer `404` for unmounted paths
    ///
    /// Lifecycle events are forwarded untouched. HTTP requests under a mount
    /// are forwarded with the prefix removed from their path.
    pub async fn dispatch(&self, event: Inbound) -> Outbound {
        match event {
            Inbound::Lifespan(lifespan) => self.app.call(Inbound::Lifespan(lifespan)).await,
            Inbound::Http(request) => match self.route(request) {
                Some(Ok(forwarded)) => self.app.call(Inbound::Http(forwarded)).await,
                Some(Err(response)) => Outbound::Http(response),
                None => Outbound::Http(not_found()),
            },
        }
    }

    /// Rewrite a request for the first mount containing its path
    fn route(&self, request: Request) -> Option<Result<Request, Response>> {
        let path = request.uri().path();
        let (mount, residual) = self
            .mounts
            .iter()
            .find_map(|mount| mount.strip(path).map(|rest| (mount, rest.to_string())))?;

        tracing::trace!("{} -> {} (mounted at {})", path, residual, mount);
        Some(rewrite(request, mount, &residual))
    }
}

fn rewrite(request: Request, mount: &MountPrefix, residual: &str) -> Result<Request, Response> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = match parts.uri.query() {
        Some(query) => format!("{}?{}", residual, query),
        None => residual.to_string(),
    };

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|_| StatusCode::BAD_REQUEST.into_response())?,
    );
    parts.uri = Uri::from_parts(uri_parts).map_err(|_| StatusCode::BAD_REQUEST.into_response())?;
    parts.extensions.insert(MountedAt(mount.clone()));

    Ok(Request::from_parts(parts, body))
}
