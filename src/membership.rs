use std::collections::HashSet;

use docker::swarm::Service;

/// The networks the collector service is attached to, taken from its
/// virtual IPs. A service without virtual IPs yields an empty set, which
/// makes every task unreachable.
pub fn collector_networks(service: &Service) -> HashSet<&str> {
    service
        .endpoint
        .virtual_ips
        .iter()
        .map(|vip| vip.network_id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::service;

    #[test]
    fn from_virtual_ips() {
        let prometheus = service("p", "prometheus", &[], &["ingress-id", "net-a", "net-a"]);

        let networks = collector_networks(&prometheus);
        assert_eq!(networks, HashSet::from(["ingress-id", "net-a"]));
    }

    #[test]
    fn no_virtual_ips() {
        let prometheus = service("p", "prometheus", &[], &[]);

        assert!(collector_networks(&prometheus).is_empty());
    }
}
