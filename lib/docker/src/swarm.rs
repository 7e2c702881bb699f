//! Swarm mode objects: services, tasks and nodes.
//!
//! Only the fields needed for target discovery are decoded, everything else
//! the Engine returns is ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::{Client, Error, Filters};

/// The Engine encodes empty maps and lists as `null` in some places.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerSpec {
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskSpec {
    #[serde(default)]
    pub container_spec: ContainerSpec,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSpec {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub task_template: TaskSpec,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VirtualIp {
    #[serde(rename = "NetworkID")]
    pub network_id: String,
    /// CIDR form, e.g. `10.0.1.2/24`
    #[serde(default)]
    pub addr: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceEndpoint {
    #[serde(rename = "VirtualIPs", default, deserialize_with = "null_as_default")]
    pub virtual_ips: Vec<VirtualIp>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    #[serde(rename = "ID")]
    pub id: String,
    pub spec: ServiceSpec,
    #[serde(default)]
    pub endpoint: ServiceEndpoint,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub ingress: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Driver {
    #[serde(default)]
    pub name: String,
}

/// The network record embedded in a task's attachment.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Network {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub spec: NetworkSpec,
    #[serde(default)]
    pub driver_state: Driver,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkAttachment {
    pub network: Network,
    /// Addresses in CIDR form, e.g. `10.0.1.5/24`
    #[serde(default, deserialize_with = "null_as_default")]
    pub addresses: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskStatus {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ServiceID", default)]
    pub service_id: String,
    /// Empty until the task is scheduled onto a node
    #[serde(rename = "NodeID", default)]
    pub node_id: String,
    #[serde(default)]
    pub slot: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub spec: TaskSpec,
    #[serde(default)]
    pub desired_state: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub networks_attachments: Vec<NetworkAttachment>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeDescription {
    #[serde(default)]
    pub hostname: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeSpec {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub availability: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Node {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub description: NodeDescription,
    #[serde(default)]
    pub spec: NodeSpec,
}

impl Client {
    /// List services, https://docs.docker.com/reference/api/engine/version/v1.47/#tag/Service/operation/ServiceList
    ///
    /// Note: the `name` filter matches name prefixes, not exact names.
    pub async fn list_services(&self, filters: &Filters) -> Result<Vec<Service>, Error> {
        self.fetch(filters.uri("/services")).await
    }

    /// List tasks, https://docs.docker.com/reference/api/engine/version/v1.47/#tag/Task/operation/TaskList
    pub async fn list_tasks(&self, filters: &Filters) -> Result<Vec<Task>, Error> {
        self.fetch(filters.uri("/tasks")).await
    }

    pub async fn inspect_task(&self, id: &str) -> Result<Task, Error> {
        self.fetch(format!("http://localhost/tasks/{id}")).await
    }

    pub async fn list_nodes(&self, filters: &Filters) -> Result<Vec<Node>, Error> {
        self.fetch(filters.uri("/nodes")).await
    }
}
