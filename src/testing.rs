//! In-memory cluster fixtures.

use std::collections::BTreeMap;

use async_trait::async_trait;
use docker::networks::NetworkResource;
use docker::swarm::{
    ContainerSpec, Driver, Network, NetworkAttachment, NetworkSpec, Node, NodeDescription,
    Service, ServiceEndpoint, ServiceSpec, Task, TaskSpec, VirtualIp,
};
use docker::system::Ping;
use http::StatusCode;

use crate::Result;
use crate::cluster::ClusterState;

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn service(id: &str, name: &str, pairs: &[(&str, &str)], networks: &[&str]) -> Service {
    Service {
        id: id.to_string(),
        spec: ServiceSpec {
            name: name.to_string(),
            labels: labels(pairs),
            task_template: TaskSpec::default(),
        },
        endpoint: ServiceEndpoint {
            virtual_ips: networks
                .iter()
                .map(|id| VirtualIp {
                    network_id: id.to_string(),
                    addr: "10.0.0.2/24".to_string(),
                })
                .collect(),
        },
    }
}

/// An overlay attachment record as embedded in tasks
pub fn attachment(network_id: &str, name: &str, addresses: &[&str]) -> NetworkAttachment {
    NetworkAttachment {
        network: Network {
            id: network_id.to_string(),
            spec: NetworkSpec {
                name: name.to_string(),
                labels: BTreeMap::new(),
                ingress: name == "ingress",
            },
            driver_state: Driver {
                name: "overlay".to_string(),
            },
        },
        addresses: addresses.iter().map(ToString::to_string).collect(),
    }
}

pub fn task(id: &str, service_id: &str, node_id: &str, attachments: Vec<NetworkAttachment>) -> Task {
    Task {
        id: id.to_string(),
        service_id: service_id.to_string(),
        node_id: node_id.to_string(),
        slot: 1,
        labels: BTreeMap::new(),
        spec: TaskSpec {
            container_spec: ContainerSpec::default(),
        },
        desired_state: "running".to_string(),
        status: Default::default(),
        networks_attachments: attachments,
    }
}

pub fn node(id: &str, hostname: &str) -> Node {
    Node {
        id: id.to_string(),
        description: NodeDescription {
            hostname: hostname.to_string(),
        },
        spec: Default::default(),
    }
}

pub fn network(id: &str, name: &str, driver: &str) -> NetworkResource {
    NetworkResource {
        id: id.to_string(),
        name: name.to_string(),
        driver: driver.to_string(),
        scope: "swarm".to_string(),
        ingress: name == "ingress",
    }
}

/// Answers like the Engine would: prefix match for names, exact match for
/// labels.
#[derive(Default)]
pub struct Cluster {
    services: Vec<Service>,
    tasks: Vec<Task>,
    nodes: Vec<Node>,
    networks: Vec<NetworkResource>,
    failing: bool,
}

impl Cluster {
    pub fn with_service(mut self, service: Service) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_network(mut self, network: NetworkResource) -> Self {
        self.networks.push(network);
        self
    }

    /// Every call fails as if the Engine were unavailable.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(docker::Error::UnexpectedStatusCode {
                code: StatusCode::SERVICE_UNAVAILABLE,
                body: "This node is not a swarm manager.".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

#[async_trait]
impl ClusterState for Cluster {
    async fn services_by_name(&self, name: &str) -> Result<Vec<Service>> {
        self.check()?;

        Ok(self
            .services
            .iter()
            .filter(|service| service.spec.name.starts_with(name))
            .cloned()
            .collect())
    }

    async fn services_by_label(&self, key: &str, value: &str) -> Result<Vec<Service>> {
        self.check()?;

        Ok(self
            .services
            .iter()
            .filter(|service| service.spec.labels.get(key).map(String::as_str) == Some(value))
            .cloned()
            .collect())
    }

    async fn service_tasks(&self, service_id: &str) -> Result<Vec<Task>> {
        self.check()?;

        Ok(self
            .tasks
            .iter()
            .filter(|task| task.service_id == service_id)
            .cloned()
            .collect())
    }

    async fn nodes(&self) -> Result<Vec<Node>> {
        self.check()?;
        Ok(self.nodes.clone())
    }

    async fn networks(&self) -> Result<Vec<NetworkResource>> {
        self.check()?;
        Ok(self.networks.clone())
    }

    async fn ping(&self) -> Result<Ping> {
        self.check()?;

        Ok(Ping {
            api_version: "1.47".to_string(),
            os_type: "linux".to_string(),
            experimental: false,
            swarm_status: Some("active/manager".to_string()),
        })
    }
}
