use std::collections::HashMap;
use std::fmt::Display;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use docker::networks::NetworkResource;
use docker::swarm::{NetworkAttachment, Node, Service, Task};
use docker::system::Ping;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::cluster::{ClusterState, Snapshot};
use crate::membership::collector_networks;
use crate::targets::{ScrapeTarget, assemble_all};
use crate::{Error, Result};

const OVERLAY_DRIVER: &str = "overlay";
const INGRESS_NETWORK: &str = "ingress";

/// Which tasks of an enabled service are scrape candidates.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPolicy {
    /// Tasks in any state, so failing tasks stay visible
    #[default]
    All,
    /// Only tasks whose desired state is `running`
    Running,
}

impl TaskPolicy {
    fn accepts(&self, task: &Task) -> bool {
        match self {
            TaskPolicy::All => true,
            TaskPolicy::Running => task.desired_state == "running",
        }
    }
}

impl FromStr for TaskPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(TaskPolicy::All),
            "running" => Ok(TaskPolicy::Running),
            _ => Err(format!("unknown task policy {s:?}, expect \"all\" or \"running\"")),
        }
    }
}

impl Display for TaskPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPolicy::All => f.write_str("all"),
            TaskPolicy::Running => f.write_str("running"),
        }
    }
}

/// A task reachable from the collector, joined with its service and node.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResolvedTarget {
    /// Empty if the node vanished between listing calls
    pub node: Node,
    pub service: Service,
    pub task: Task,
    #[serde(rename = "IP")]
    pub ip: IpAddr,
}

/// Only non-ingress overlay networks link tasks to the collector. The network
/// listing is authoritative, the record embedded in the attachment is used
/// when the network is not listed.
fn is_scrape_network(
    attachment: &NetworkAttachment,
    networks: &HashMap<String, NetworkResource>,
) -> bool {
    let (name, driver, ingress) = match networks.get(&attachment.network.id) {
        Some(network) => (&network.name, &network.driver, network.ingress),
        None => (
            &attachment.network.spec.name,
            &attachment.network.driver_state.name,
            attachment.network.spec.ingress,
        ),
    };

    driver == OVERLAY_DRIVER && name != INGRESS_NETWORK && !ingress
}

/// Addresses of the task grouped by network, in attachment order. Prefix
/// lengths are dropped, malformed addresses are skipped.
fn task_addresses<'a>(
    task: &'a Task,
    networks: &HashMap<String, NetworkResource>,
) -> Vec<(&'a str, Vec<IpAddr>)> {
    task.networks_attachments
        .iter()
        .filter(|attachment| is_scrape_network(attachment, networks))
        .filter_map(|attachment| {
            let addrs = attachment
                .addresses
                .iter()
                .filter_map(|addr| match IpNet::from_str(addr) {
                    Ok(net) => Some(net.addr()),
                    Err(err) => {
                        warn!(
                            message = "skip malformed task address",
                            task = %task.id,
                            network = %attachment.network.id,
                            address = %addr,
                            %err,
                        );

                        None
                    }
                })
                .collect::<Vec<_>>();

            if addrs.is_empty() {
                None
            } else {
                Some((attachment.network.id.as_str(), addrs))
            }
        })
        .collect()
}

/// Find the tasks sharing a network with the collector. A task attached to
/// several shared networks is reported once, through the first of them, and
/// always with the first address on that network.
pub fn resolve(snapshot: &Snapshot, policy: TaskPolicy) -> Vec<ResolvedTarget> {
    let membership = collector_networks(&snapshot.collector);
    let mut resolved = Vec::new();

    for (service, tasks) in &snapshot.services {
        for task in tasks.iter().filter(|task| policy.accepts(task)) {
            let Some(ip) = task_addresses(task, &snapshot.networks)
                .into_iter()
                .find(|(network, _)| membership.contains(network))
                .map(|(_, addrs)| addrs[0])
            else {
                continue;
            };

            let node = match snapshot.nodes.get(&task.node_id) {
                Some(node) => node.clone(),
                None => {
                    debug!(
                        message = "node of task not found",
                        task = %task.id,
                        node = %task.node_id,
                    );

                    Node::default()
                }
            };

            resolved.push(ResolvedTarget {
                node,
                service: service.clone(),
                task: task.clone(),
                ip,
            });
        }
    }

    resolved
}

/// Runs resolution cycles against the cluster. Holds no state between
/// cycles, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct Resolver {
    state: Arc<dyn ClusterState>,
    policy: TaskPolicy,
    timeout: Duration,
}

impl Resolver {
    pub fn new(state: Arc<dyn ClusterState>, policy: TaskPolicy, timeout: Duration) -> Self {
        Self {
            state,
            policy,
            timeout,
        }
    }

    /// Resolve the tasks reachable from the service named `collector`.
    pub async fn resolve(&self, collector: &str) -> Result<Vec<ResolvedTarget>> {
        let snapshot = tokio::time::timeout(
            self.timeout,
            Snapshot::read(self.state.as_ref(), collector),
        )
        .await
        .map_err(|_| Error::Timeout(self.timeout))??;

        let resolved = resolve(&snapshot, self.policy);
        debug!(
            message = "targets resolved",
            collector,
            policy = %self.policy,
            targets = resolved.len(),
        );

        Ok(resolved)
    }

    /// Resolve and turn the result into scrape targets.
    pub async fn discover(&self, collector: &str) -> Result<Vec<ScrapeTarget>> {
        let resolved = self.resolve(collector).await?;

        Ok(assemble_all(&resolved))
    }

    /// Check the connectivity to the cluster API.
    pub async fn ping(&self) -> Result<Ping> {
        tokio::time::timeout(self.timeout, self.state.ping())
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }
}
