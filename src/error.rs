use std::path::PathBuf;
use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The named collector service does not exist.
    #[error("could not find service {0}")]
    NotFound(String),

    /// More than one service carries exactly the collector's name.
    #[error("service name {name} is ambiguous, {count} services match")]
    AmbiguousMatch { name: String, count: usize },

    /// A call to the cluster API failed.
    #[error("cluster api request failed, {0}")]
    Upstream(#[from] docker::Error),

    #[error("resolution timed out after {0:?}")]
    Timeout(Duration),

    /// Requesting targets from a discovery server failed.
    #[error("request discovery server failed, {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("unexpected status code {code} from discovery server, body: {body}")]
    UnexpectedStatus { code: StatusCode, body: String },

    #[error(transparent)]
    Http(#[from] http::Error),

    #[error(transparent)]
    Hyper(#[from] hyper::Error),

    #[error("invalid json, {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {err}, {msg}")]
    Io { err: std::io::Error, msg: String },

    #[error("load config {path:?} failed, {err}")]
    Config { path: PathBuf, err: String },
}

impl Error {
    pub(crate) fn io(err: std::io::Error, msg: impl Into<String>) -> Self {
        Error::Io {
            err,
            msg: msg.into(),
        }
    }
}
