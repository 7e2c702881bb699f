//! Point-in-time reads of the cluster state.

use std::collections::HashMap;

use async_trait::async_trait;
use docker::networks::NetworkResource;
use docker::swarm::{Node, Service, Task};
use docker::system::Ping;
use docker::{Client, Filters};

use crate::labels::ENABLE_LABEL;
use crate::{Error, Result};

/// Read-only access to the orchestrator's object store.
///
/// Implementations must be safe to share between concurrent resolutions.
#[async_trait]
pub trait ClusterState: Send + Sync {
    /// Services whose name starts with `name`, like the Engine's `name` filter.
    async fn services_by_name(&self, name: &str) -> Result<Vec<Service>>;

    /// Services carrying the label `key` set to `value`.
    async fn services_by_label(&self, key: &str, value: &str) -> Result<Vec<Service>>;

    /// Tasks of the service in any state.
    async fn service_tasks(&self, service_id: &str) -> Result<Vec<Task>>;

    async fn nodes(&self) -> Result<Vec<Node>>;

    async fn networks(&self) -> Result<Vec<NetworkResource>>;

    async fn ping(&self) -> Result<Ping>;
}

#[async_trait]
impl ClusterState for Client {
    async fn services_by_name(&self, name: &str) -> Result<Vec<Service>> {
        let filters = Filters::new().add("name", name);
        Ok(self.list_services(&filters).await?)
    }

    async fn services_by_label(&self, key: &str, value: &str) -> Result<Vec<Service>> {
        let filters = Filters::new().add("label", format!("{key}={value}"));
        Ok(self.list_services(&filters).await?)
    }

    async fn service_tasks(&self, service_id: &str) -> Result<Vec<Task>> {
        let filters = Filters::new().add("service", service_id);
        Ok(self.list_tasks(&filters).await?)
    }

    async fn nodes(&self) -> Result<Vec<Node>> {
        Ok(self.list_nodes(&Filters::new()).await?)
    }

    async fn networks(&self) -> Result<Vec<NetworkResource>> {
        Ok(self.list_networks(&Filters::new()).await?)
    }

    async fn ping(&self) -> Result<Ping> {
        Ok(Client::ping(self).await?)
    }
}

/// Everything one resolution cycle needs, read fresh each time. Tasks refer
/// to nodes and networks by ID, lookups go through the maps.
#[derive(Debug)]
pub struct Snapshot {
    pub collector: Service,
    /// Monitoring enabled services, each with its tasks
    pub services: Vec<(Service, Vec<Task>)>,
    pub nodes: HashMap<String, Node>,
    pub networks: HashMap<String, NetworkResource>,
}

impl Snapshot {
    pub async fn read(state: &dyn ClusterState, collector: &str) -> Result<Snapshot> {
        let collector = find_service_by_name(state, collector).await?;

        let enabled = state.services_by_label(ENABLE_LABEL, "true").await?;

        let nodes = state
            .nodes()
            .await?
            .into_iter()
            .map(|node| (node.id.clone(), node))
            .collect::<HashMap<_, _>>();

        let networks = state
            .networks()
            .await?
            .into_iter()
            .map(|network| (network.id.clone(), network))
            .collect::<HashMap<_, _>>();

        let mut services = Vec::with_capacity(enabled.len());
        for service in enabled {
            // the label filter is evaluated by the upstream, it must be exactly "true"
            if service.spec.labels.get(ENABLE_LABEL).map(String::as_str) != Some("true") {
                continue;
            }

            let tasks = state.service_tasks(&service.id).await?;
            services.push((service, tasks));
        }

        debug!(
            message = "cluster snapshot read",
            collector = %collector.spec.name,
            services = services.len(),
            nodes = nodes.len(),
            networks = networks.len(),
        );

        Ok(Snapshot {
            collector,
            services,
            nodes,
            networks,
        })
    }
}

/// Find the service named exactly `name`.
pub async fn find_service_by_name(state: &dyn ClusterState, name: &str) -> Result<Service> {
    let mut matched = state
        .services_by_name(name)
        .await?
        .into_iter()
        .filter(|service| service.spec.name == name)
        .collect::<Vec<_>>();

    match matched.len() {
        0 => Err(Error::NotFound(name.to_string())),
        1 => Ok(matched.remove(0)),
        count => Err(Error::AmbiguousMatch {
            name: name.to_string(),
            count,
        }),
    }
}
