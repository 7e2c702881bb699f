//! The pull server, each request runs one full resolution.

use std::net::SocketAddr;

use http::{Method, Request, StatusCode};
use hyper::body::Incoming;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::http::{HttpResponse, empty, json, serve};
use crate::resolve::Resolver;
use crate::{Error, Result};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        ErrorBody {
            error: err.to_string(),
        }
    }
}

/// Bind `addr` and serve until `shutdown` is cancelled.
pub async fn run(addr: SocketAddr, resolver: Resolver, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| Error::io(err, format!("bind {addr}")))?;

    info!(message = "discovery server started", listen = %addr);

    serve_with(listener, resolver, shutdown).await;

    info!(message = "discovery server stopped");

    Ok(())
}

/// Serve on an already bound listener.
pub async fn serve_with(listener: TcpListener, resolver: Resolver, shutdown: CancellationToken) {
    serve(
        listener,
        move |req: Request<Incoming>| {
            let resolver = resolver.clone();
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            async move { route(&resolver, &method, &path).await }
        },
        shutdown,
    )
    .await
}

/// The last path segment, percent decoded. Nested paths are not matched.
fn path_param<'a>(path: &'a str, prefix: &str) -> Option<std::borrow::Cow<'a, str>> {
    let raw = path.strip_prefix(prefix)?;
    if raw.is_empty() || raw.contains('/') {
        return None;
    }

    percent_decode_str(raw).decode_utf8().ok()
}

pub async fn route(resolver: &Resolver, method: &Method, path: &str) -> HttpResponse {
    if method != Method::GET {
        return empty(StatusCode::METHOD_NOT_ALLOWED);
    }

    if path == "/_health" {
        return match resolver.ping().await {
            Ok(ping) => json(StatusCode::OK, &ping),
            Err(err) => {
                warn!(message = "health check failed", %err);

                json(StatusCode::SERVICE_UNAVAILABLE, &ErrorBody::from(&err))
            }
        };
    }

    if let Some(collector) = path_param(path, "/targets/") {
        return match resolver.discover(&collector).await {
            Ok(targets) => json(StatusCode::OK, &targets),
            Err(err) => {
                error!(message = "discover targets failed", %collector, %err);

                json(StatusCode::INTERNAL_SERVER_ERROR, &ErrorBody::from(&err))
            }
        };
    }

    if let Some(collector) = path_param(path, "/debug/") {
        return match resolver.resolve(&collector).await {
            Ok(resolved) => json(StatusCode::OK, &resolved),
            Err(err) => {
                error!(message = "resolve targets failed", %collector, %err);

                json(StatusCode::INTERNAL_SERVER_ERROR, &ErrorBody::from(&err))
            }
        };
    }

    empty(StatusCode::NOT_FOUND)
}
