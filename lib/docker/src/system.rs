use http::HeaderMap;
use serde::Serialize;

use super::{Client, Error};

/// Result of pinging the Engine, assembled from the response headers.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ping {
    #[serde(rename = "APIVersion")]
    pub api_version: String,
    #[serde(rename = "OSType")]
    pub os_type: String,
    pub experimental: bool,
    /// Local node state, e.g. `active/manager`, reported by Engine 24.0+
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swarm_status: Option<String>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

impl Ping {
    fn from_headers(headers: &HeaderMap) -> Self {
        Ping {
            api_version: header(headers, "api-version").unwrap_or_default(),
            os_type: header(headers, "ostype").unwrap_or_default(),
            experimental: header(headers, "docker-experimental").as_deref() == Some("true"),
            swarm_status: header(headers, "swarm"),
        }
    }
}

impl Client {
    /// Ping the Engine, https://docs.docker.com/reference/api/engine/version/v1.47/#tag/System/operation/SystemPing
    pub async fn ping(&self) -> Result<Ping, Error> {
        let (parts, _body) = self.send("http://localhost/_ping".to_string()).await?;

        Ok(Ping::from_headers(&parts.headers))
    }
}
