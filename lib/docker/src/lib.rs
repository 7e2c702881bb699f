mod connector;
pub mod networks;
pub mod swarm;
pub mod system;

use std::collections::BTreeMap;
use std::fmt::Display;

use bytes::Bytes;
use http::response::Parts;
use http::{Method, Request};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioExecutor;
use percent_encoding::{NON_ALPHANUMERIC, percent_encode};

pub use connector::{Connector, Endpoint};

#[derive(Debug)]
pub enum Error {
    UnexpectedStatusCode {
        code: http::StatusCode,
        body: String,
    },

    Http(http::Error),

    Hyper(hyper::Error),

    Client(hyper_util::client::legacy::Error),

    Deserialize(serde_json::Error),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnexpectedStatusCode { code, body } => {
                write!(f, "unexpected status code {code}, body: {body}")
            }
            Error::Http(err) => err.fmt(f),
            Error::Hyper(err) => err.fmt(f),
            Error::Client(err) => err.fmt(f),
            Error::Deserialize(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Error::Http(err)
    }
}

/// Engine API list filters, encoded as the JSON object `{"key": ["value", ...]}`.
#[derive(Clone, Debug, Default)]
pub struct Filters(BTreeMap<String, Vec<String>>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.entry(key.into()).or_default().push(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn encode(&self) -> String {
        // a map of strings to string lists always serializes
        let filters = serde_json::to_string(&self.0).unwrap_or_default();

        percent_encode(filters.as_bytes(), NON_ALPHANUMERIC).to_string()
    }

    /// Build the request uri for `path`, appending the filters if there are any.
    fn uri(&self, path: &str) -> String {
        if self.is_empty() {
            format!("http://localhost{path}")
        } else {
            format!("http://localhost{path}?filters={}", self.encode())
        }
    }
}

/// Client for the Docker Engine API. Cloning is cheap, all clones share the
/// same connection pool.
#[derive(Clone)]
pub struct Client {
    endpoint: Endpoint,
    http: hyper_util::client::legacy::Client<Connector, Full<Bytes>>,
}

impl Client {
    pub fn new(endpoint: Endpoint) -> Self {
        let connector = Connector::new(endpoint.clone());
        let http =
            hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build(connector);

        Self { endpoint, http }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn send(&self, uri: String) -> Result<(Parts, Bytes), Error> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Full::<Bytes>::default())?;

        let resp = self.http.request(req).await.map_err(Error::Client)?;
        let (parts, incoming) = resp.into_parts();
        let data = incoming.collect().await.map_err(Error::Hyper)?.to_bytes();

        if !parts.status.is_success() {
            return Err(Error::UnexpectedStatusCode {
                code: parts.status,
                body: String::from_utf8_lossy(&data).into_owned(),
            });
        }

        Ok((parts, data))
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, uri: String) -> Result<T, Error> {
        let (_parts, data) = self.send(uri).await?;

        serde_json::from_slice(&data).map_err(Error::Deserialize)
    }
}
