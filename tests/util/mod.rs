#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::Full;
use serde_json::{Value, json};
use swarm_discovery::resolve::{Resolver, TaskPolicy};
use testify::http::not_found;

fn filters(query: Option<&str>) -> BTreeMap<String, Vec<String>> {
    let Some(encoded) = query.and_then(|query| query.strip_prefix("filters=")) else {
        return BTreeMap::new();
    };

    let decoded = percent_encoding::percent_decode_str(encoded)
        .decode_utf8()
        .expect("filters are utf8");
    serde_json::from_str(&decoded).expect("filters are json")
}

fn attachment(id: &str, name: &str, addr: &str) -> Value {
    json!({
        "Network": {
            "ID": id,
            "Spec": { "Name": name, "Ingress": name == "ingress" },
            "DriverState": { "Name": "overlay" }
        },
        "Addresses": [addr]
    })
}

fn services() -> Vec<Value> {
    vec![
        json!({
            "ID": "svc-prom",
            "Spec": { "Name": "prometheus", "Labels": {} },
            "Endpoint": {
                "VirtualIPs": [
                    { "NetworkID": "net-ingress", "Addr": "10.255.0.2/16" },
                    { "NetworkID": "net-mon", "Addr": "10.0.1.2/24" }
                ]
            }
        }),
        // the name filter of the engine matches this one as well
        json!({
            "ID": "svc-agent",
            "Spec": { "Name": "prometheus-agent", "Labels": {} },
            "Endpoint": {
                "VirtualIPs": [{ "NetworkID": "net-back", "Addr": "10.0.2.2/24" }]
            }
        }),
        json!({
            "ID": "svc-api",
            "Spec": {
                "Name": "shop_api",
                "Labels": {
                    "prometheus.enable": "true",
                    "prometheus.port": "9100",
                    "com.docker.stack.namespace": "shop"
                }
            },
            "Endpoint": {
                "VirtualIPs": [{ "NetworkID": "net-mon", "Addr": "10.0.1.3/24" }]
            }
        }),
        json!({
            "ID": "svc-worker",
            "Spec": { "Name": "shop_worker", "Labels": { "prometheus.enable": "true" } },
            "Endpoint": {
                "VirtualIPs": [{ "NetworkID": "net-back", "Addr": "10.0.2.3/24" }]
            }
        }),
        json!({
            "ID": "svc-web",
            "Spec": { "Name": "shop_web", "Labels": { "prometheus.enable": "false" } }
        }),
    ]
}

fn tasks() -> Vec<Value> {
    vec![
        json!({
            "ID": "task-api-1",
            "ServiceID": "svc-api",
            "NodeID": "node-1",
            "Slot": 1,
            "Spec": { "ContainerSpec": { "Image": "shop/api:1.0", "Labels": { "team": "checkout" } } },
            "DesiredState": "running",
            "Status": { "State": "running" },
            "NetworksAttachments": [
                attachment("net-ingress", "ingress", "10.255.0.7/16"),
                attachment("net-mon", "monitoring", "10.0.1.5/24")
            ]
        }),
        json!({
            "ID": "task-api-2",
            "ServiceID": "svc-api",
            "NodeID": "node-2",
            "Slot": 2,
            "Spec": { "ContainerSpec": { "Image": "shop/api:1.0" } },
            "DesiredState": "shutdown",
            "Status": { "State": "failed", "Message": "task: non-zero exit (1)" },
            "NetworksAttachments": [attachment("net-mon", "monitoring", "10.0.1.6/24")]
        }),
        json!({
            "ID": "task-worker-1",
            "ServiceID": "svc-worker",
            "NodeID": "node-1",
            "Slot": 1,
            "Spec": { "ContainerSpec": { "Image": "shop/worker:1.0" } },
            "DesiredState": "running",
            "Status": { "State": "running" },
            "NetworksAttachments": [attachment("net-back", "backend", "10.0.2.5/24")]
        }),
    ]
}

fn nodes() -> Value {
    json!([
        { "ID": "node-1", "Description": { "Hostname": "worker-1" }, "Spec": { "Role": "worker", "Availability": "active" } },
        { "ID": "node-2", "Description": { "Hostname": "worker-2" }, "Spec": { "Role": "worker", "Availability": "active" } }
    ])
}

fn networks() -> Value {
    json!([
        { "Id": "net-ingress", "Name": "ingress", "Driver": "overlay", "Scope": "swarm", "Ingress": true },
        { "Id": "net-mon", "Name": "monitoring", "Driver": "overlay", "Scope": "swarm", "Ingress": false },
        { "Id": "net-back", "Name": "backend", "Driver": "overlay", "Scope": "swarm", "Ingress": false },
        { "Id": "net-bridge", "Name": "bridge", "Driver": "bridge", "Scope": "local", "Ingress": false }
    ])
}

fn matches(service: &Value, filters: &BTreeMap<String, Vec<String>>) -> bool {
    let name = service["Spec"]["Name"].as_str().unwrap_or_default();
    let labels = &service["Spec"]["Labels"];

    filters.iter().all(|(key, values)| {
        values.iter().all(|value| match key.as_str() {
            "name" => name.starts_with(value.as_str()),
            "label" => match value.split_once('=') {
                Some((k, v)) => labels[k].as_str() == Some(v),
                None => !labels[value.as_str()].is_null(),
            },
            _ => panic!("unexpected filter {key}"),
        })
    })
}

fn reply(value: Value) -> Response<Full<Bytes>> {
    testify::http::json(StatusCode::OK, value.to_string())
}

/// Serve a swarm manager's API with a fixed cluster state.
pub async fn fake_engine() -> SocketAddr {
    testify::http::serve(|req| {
        let filters = filters(req.uri().query());

        match req.uri().path() {
            "/_ping" => Response::builder()
                .header("Api-Version", "1.47")
                .header("Ostype", "linux")
                .header("Swarm", "active/manager")
                .body(Full::new(Bytes::from_static(b"OK")))
                .unwrap(),
            "/services" => reply(Value::Array(
                services()
                    .into_iter()
                    .filter(|service| matches(service, &filters))
                    .collect(),
            )),
            "/tasks" => {
                let service = filters.get("service").cloned().unwrap_or_default();
                reply(Value::Array(
                    tasks()
                        .into_iter()
                        .filter(|task| {
                            service.is_empty()
                                || service.iter().any(|id| task["ServiceID"] == id.as_str())
                        })
                        .collect(),
                ))
            }
            "/nodes" => reply(nodes()),
            "/networks" => reply(networks()),
            _ => not_found(),
        }
    })
    .await
}

/// Every call fails like a node that left the swarm.
pub async fn broken_engine() -> SocketAddr {
    testify::http::serve(|_req| {
        testify::http::json(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"message":"This node is not a swarm manager."}"#,
        )
    })
    .await
}

pub fn resolver(engine: SocketAddr, policy: TaskPolicy) -> Resolver {
    Resolver::new(
        Arc::new(docker::Client::new(docker::Endpoint::from(engine))),
        policy,
        Duration::from_secs(5),
    )
}
