use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::labels::{PORT_LABEL, build_labels};
use crate::resolve::ResolvedTarget;

/// One scrape target group, as served over HTTP.
///
/// The decoder accepts the lowercase keys of the file form as well.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ScrapeTarget {
    #[serde(rename = "Targets", alias = "targets")]
    pub targets: Vec<String>,
    #[serde(rename = "Labels", alias = "labels")]
    pub labels: BTreeMap<String, String>,
}

/// The file based service discovery form of [`ScrapeTarget`].
#[derive(Debug, PartialEq, Serialize)]
pub struct FileTargetGroup<'a> {
    pub targets: &'a [String],
    pub labels: &'a BTreeMap<String, String>,
}

impl<'a> From<&'a ScrapeTarget> for FileTargetGroup<'a> {
    fn from(target: &'a ScrapeTarget) -> Self {
        FileTargetGroup {
            targets: &target.targets,
            labels: &target.labels,
        }
    }
}

/// The address list of a target, `ip` or `ip:port` when the service sets a
/// port label. The port value is appended verbatim, it is neither validated
/// nor normalised.
pub fn build_targets(ip: IpAddr, port: Option<&str>) -> Vec<String> {
    let addr = match port {
        Some(port) => match ip {
            IpAddr::V4(ip) => format!("{ip}:{port}"),
            IpAddr::V6(ip) => format!("[{ip}]:{port}"),
        },
        None => ip.to_string(),
    };

    vec![addr]
}

pub fn assemble(target: &ResolvedTarget) -> ScrapeTarget {
    let port = target
        .service
        .spec
        .labels
        .get(PORT_LABEL)
        .map(String::as_str);

    ScrapeTarget {
        targets: build_targets(target.ip, port),
        labels: build_labels(target),
    }
}

/// Preserves the order of the resolved targets.
pub fn assemble_all(resolved: &[ResolvedTarget]) -> Vec<ScrapeTarget> {
    resolved.iter().map(assemble).collect()
}
