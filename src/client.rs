//! The polling client, keeps a file based service discovery file up to date.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::http::{HttpResponse, empty, json, serve};
use crate::resolve::Resolver;
use crate::targets::{FileTargetGroup, ScrapeTarget};
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Unreserved characters of RFC 3986 stay as they are.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Asks a discovery server for the targets.
#[derive(Clone)]
pub struct Remote {
    http: Client<HttpConnector, Full<Bytes>>,
    server: String,
}

impl Remote {
    pub fn new(server: impl Into<String>) -> Self {
        let http = Client::builder(TokioExecutor::new()).build_http();
        let server = server.into().trim_end_matches('/').to_string();

        Self { http, server }
    }

    async fn get(&self, path: &str) -> Result<Bytes> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(format!("{}{path}", self.server))
            .body(Full::<Bytes>::default())?;

        let (status, data) = tokio::time::timeout(REQUEST_TIMEOUT, async {
            let resp = self.http.request(req).await?;
            let (parts, incoming) = resp.into_parts();
            let data = incoming.collect().await?.to_bytes();

            Ok::<_, Error>((parts.status, data))
        })
        .await
        .map_err(|_| Error::Timeout(REQUEST_TIMEOUT))??;

        if !status.is_success() {
            return Err(Error::UnexpectedStatus {
                code: status,
                body: String::from_utf8_lossy(&data).into_owned(),
            });
        }

        Ok(data)
    }

    pub async fn fetch(&self, collector: &str) -> Result<Vec<ScrapeTarget>> {
        let path = format!("/targets/{}", utf8_percent_encode(collector, PATH_SEGMENT));
        let data = self.get(&path).await?;

        Ok(serde_json::from_slice(&data)?)
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let data = self.get("/_health").await?;

        Ok(serde_json::from_slice(&data)?)
    }
}

/// Where the client gets its targets from.
#[derive(Clone)]
pub enum TargetSource {
    /// A discovery server
    Remote(Remote),
    /// Resolve in process against the cluster API
    Local(Resolver),
}

impl TargetSource {
    pub async fn fetch(&self, collector: &str) -> Result<Vec<ScrapeTarget>> {
        match self {
            TargetSource::Remote(remote) => remote.fetch(collector).await,
            TargetSource::Local(resolver) => resolver.discover(collector).await,
        }
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        match self {
            TargetSource::Remote(remote) => remote.health().await,
            TargetSource::Local(resolver) => Ok(serde_json::to_value(resolver.ping().await?)?),
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the targets in the file based service discovery format. The file is
/// replaced atomically, readers never observe a partial write.
pub async fn write_targets(path: &Path, targets: &[ScrapeTarget]) -> Result<()> {
    let groups = targets
        .iter()
        .map(FileTargetGroup::from)
        .collect::<Vec<_>>();
    let data = serde_json::to_vec_pretty(&groups)?;

    let tmp = tmp_path(path);
    tokio::fs::write(&tmp, &data)
        .await
        .map_err(|err| Error::io(err, format!("write {}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|err| Error::io(err, format!("rename {} to {}", tmp.display(), path.display())))?;

    Ok(())
}

/// Fetch, write and wait, until `shutdown` is cancelled or a cycle fails.
pub async fn run(
    source: &TargetSource,
    collector: &str,
    output: &Path,
    interval: Duration,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let targets = tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,
            result = source.fetch(collector) => result?,
        };

        write_targets(output, &targets).await?;

        info!(
            message = "targets written",
            collector,
            targets = targets.len(),
            output = %output.display(),
        );
    }

    Ok(())
}

async fn health_route(source: &TargetSource, method: &Method, path: &str) -> HttpResponse {
    if method != Method::GET {
        return empty(StatusCode::METHOD_NOT_ALLOWED);
    }

    if path != "/_health" {
        return empty(StatusCode::NOT_FOUND);
    }

    match source.health().await {
        Ok(value) => json(StatusCode::OK, &value),
        Err(err) => {
            warn!(message = "health check failed", %err);

            json(
                StatusCode::SERVICE_UNAVAILABLE,
                &serde_json::json!({ "error": err.to_string() }),
            )
        }
    }
}

/// Expose the health of the target source at `/_health`.
pub async fn serve_health(
    addr: SocketAddr,
    source: TargetSource,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| Error::io(err, format!("bind {addr}")))?;

    info!(message = "health endpoint started", listen = %addr);

    serve(
        listener,
        move |req: Request<hyper::body::Incoming>| {
            let source = source.clone();
            let method = req.method().clone();
            let path = req.uri().path().to_string();

            async move { health_route(&source, &method, &path).await }
        },
        shutdown,
    )
    .await;

    Ok(())
}
