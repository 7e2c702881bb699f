//! Label sets attached to every scrape target.

use std::collections::BTreeMap;

use crate::resolve::ResolvedTarget;

/// Services opt in to monitoring by setting this label to exactly `true`.
pub const ENABLE_LABEL: &str = "prometheus.enable";
/// Appended to the target address as `address:port`.
pub const PORT_LABEL: &str = "prometheus.port";
/// Overrides the metrics path.
pub const PATH_LABEL: &str = "prometheus.path";
/// Overrides the job name, which defaults to the service name.
pub const JOB_LABEL: &str = "prometheus.job";

const STACK_NAMESPACE_LABEL: &str = "com.docker.stack.namespace";

const META_LABEL_PREFIX: &str = "__meta_";
const SWARM_LABEL_PREFIX: &str = "__meta_swarm_label_";
const METRICS_PATH: &str = "__metrics_path__";

#[inline]
const fn invalid_label_name_character(c: char) -> bool {
    // Essentially, needs to match the regex pattern of [a-zA-Z0-9_].
    !(c.is_ascii_alphanumeric() || c == '_')
}

/// Replace every character outside of `[a-zA-Z0-9_]` with `_`.
pub fn sanitize_label_name(name: &str) -> String {
    name.replace(invalid_label_name_character, "_")
}

/// Build the label set of a resolved target.
///
/// Labels of the service, the task and the task's container spec are passed
/// through under `__meta_swarm_label_`, in that order, so on key collision the
/// container spec wins over the task, and the task wins over the service.
pub fn build_labels(target: &ResolvedTarget) -> BTreeMap<String, String> {
    let ResolvedTarget {
        node,
        service,
        task,
        ..
    } = target;
    let service_labels = &service.spec.labels;

    let job = service_labels
        .get(JOB_LABEL)
        .unwrap_or(&service.spec.name)
        .clone();

    let mut labels = BTreeMap::from([
        ("job".to_string(), job),
        (
            "container_label_com_docker_stack_namespace".to_string(),
            service_labels
                .get(STACK_NAMESPACE_LABEL)
                .cloned()
                .unwrap_or_default(),
        ),
        (
            "container_label_com_docker_swarm_node_id".to_string(),
            node.id.clone(),
        ),
        (
            "container_label_com_docker_swarm_node_hostname".to_string(),
            node.description.hostname.clone(),
        ),
        (
            "container_label_com_docker_swarm_service_id".to_string(),
            service.id.clone(),
        ),
        (
            "container_label_com_docker_swarm_service_name".to_string(),
            service.spec.name.clone(),
        ),
        (
            "container_label_com_docker_swarm_task_id".to_string(),
            task.id.clone(),
        ),
        (
            "container_label_com_docker_swarm_task_name".to_string(),
            format!("{}.{}.{}", service.spec.name, task.slot, task.id),
        ),
        (
            format!("{META_LABEL_PREFIX}swarm_task_desired_state"),
            task.desired_state.clone(),
        ),
    ]);

    if let Some(path) = service_labels.get(PATH_LABEL) {
        labels.insert(METRICS_PATH.to_string(), path.clone());
    }

    for (key, value) in service_labels
        .iter()
        .chain(task.labels.iter())
        .chain(task.spec.container_spec.labels.iter())
    {
        labels.insert(
            sanitize_label_name(&format!("{SWARM_LABEL_PREFIX}{key}")),
            value.clone(),
        );
    }

    labels
}
