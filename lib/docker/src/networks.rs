use serde::{Deserialize, Serialize};

use super::{Client, Error, Filters};

/// An entry of the network listing, which is keyed by `Id` rather than the
/// `ID` used by swarm objects.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkResource {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub ingress: bool,
}

impl Client {
    /// List networks, https://docs.docker.com/reference/api/engine/version/v1.47/#tag/Network/operation/NetworkList
    pub async fn list_networks(&self, filters: &Filters) -> Result<Vec<NetworkResource>, Error> {
        self.fetch(filters.uri("/networks")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode() {
        let networks = serde_json::from_str::<Vec<NetworkResource>>(
            r#"[
                {"Name": "ingress", "Id": "4qvuz4ko70xa", "Scope": "swarm", "Driver": "overlay", "Ingress": true},
                {"Name": "bridge", "Id": "f2de39df4171", "Scope": "local", "Driver": "bridge", "EnableIPv6": false}
            ]"#,
        )
        .unwrap();

        assert_eq!(networks.len(), 2);
        assert!(networks[0].ingress);
        assert_eq!(networks[0].driver, "overlay");
        assert_eq!(networks[1].id, "f2de39df4171");
        assert!(!networks[1].ingress);
    }
}
