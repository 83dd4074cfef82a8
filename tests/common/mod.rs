#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ContainerStatus, Pod, PodStatus, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use release_status::k8s::{ClusterClient, ClusterError};
use release_status::release::{
    INSTANCE_LABEL, MembershipPolicy, RELEASE_NAME_ANNOTATION,
};
use release_status::server::{self, AppState};
use tokio::net::TcpListener;

/// Which list call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failing {
    Pods,
    Deployments,
    Services,
    Ingresses,
}

/// In-memory cluster that applies `key=value` label selectors the way the API
/// server would.
#[derive(Default)]
pub struct FakeCluster {
    pub namespace: String,
    pub pods: Vec<Pod>,
    pub deployments: Vec<Deployment>,
    pub services: Vec<Service>,
    pub ingresses: Vec<Ingress>,
    pub failing: Option<Failing>,
    pub pod_selectors: Mutex<Vec<Option<String>>>,
}

impl FakeCluster {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Self::default()
        }
    }

    fn check(&self, call: Failing) -> Result<(), ClusterError> {
        if self.failing == Some(call) {
            return Err(ClusterError::Kube(kube::Error::Service(
                "connection refused".into(),
            )));
        }
        Ok(())
    }

    fn select<K: Clone>(
        &self,
        namespace: &str,
        items: &[K],
        selector: Option<&str>,
        meta: impl Fn(&K) -> &ObjectMeta,
    ) -> Vec<K> {
        if namespace != self.namespace {
            return Vec::new();
        }
        items
            .iter()
            .filter(|item| match selector {
                None => true,
                Some(selector) => {
                    let (key, value) = selector.split_once('=').unwrap_or((selector, ""));
                    meta(*item)
                        .labels
                        .as_ref()
                        .and_then(|labels| labels.get(key))
                        .is_some_and(|v| v == value)
                }
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_pods(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, ClusterError> {
        self.pod_selectors
            .lock()
            .unwrap()
            .push(selector.map(str::to_string));
        self.check(Failing::Pods)?;
        Ok(self.select(namespace, &self.pods, selector, |p| &p.metadata))
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClusterError> {
        self.check(Failing::Deployments)?;
        Ok(self.select(namespace, &self.deployments, None, |d| &d.metadata))
    }

    async fn list_services(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Service>, ClusterError> {
        self.check(Failing::Services)?;
        Ok(self.select(namespace, &self.services, selector, |s| &s.metadata))
    }

    async fn list_ingresses(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Ingress>, ClusterError> {
        self.check(Failing::Ingresses)?;
        Ok(self.select(namespace, &self.ingresses, selector, |i| &i.metadata))
    }
}

/// Metadata carrying both the Helm annotation and the instance label.
pub fn release_meta(name: &str, release: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        annotations: Some(BTreeMap::from([(
            RELEASE_NAME_ANNOTATION.to_string(),
            release.to_string(),
        )])),
        labels: Some(BTreeMap::from([(
            INSTANCE_LABEL.to_string(),
            release.to_string(),
        )])),
        ..ObjectMeta::default()
    }
}

/// Pod metadata as a ReplicaSet stamps it: the template's instance label and
/// no Helm annotation.
pub fn instance_meta(name: &str, release: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        labels: Some(BTreeMap::from([(
            INSTANCE_LABEL.to_string(),
            release.to_string(),
        )])),
        ..ObjectMeta::default()
    }
}

pub fn plain_meta(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..ObjectMeta::default()
    }
}

pub fn deployment(meta: ObjectMeta) -> Deployment {
    Deployment {
        metadata: meta,
        ..Deployment::default()
    }
}

pub fn pod(meta: ObjectMeta, phase: &str, ready: &[bool]) -> Pod {
    let container_statuses = ready
        .iter()
        .enumerate()
        .map(|(i, ready)| ContainerStatus {
            name: format!("c{i}"),
            ready: *ready,
            ..ContainerStatus::default()
        })
        .collect();
    Pod {
        metadata: meta,
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: Some(container_statuses),
            ..PodStatus::default()
        }),
        ..Pod::default()
    }
}

pub fn service(meta: ObjectMeta, target_port: i32, node_port: Option<i32>) -> Service {
    Service {
        metadata: meta,
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port: 80,
                target_port: Some(IntOrString::Int(target_port)),
                node_port,
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

pub fn ingress(meta: ObjectMeta, host: &str, service_name: &str, port: i32) -> Ingress {
    Ingress {
        metadata: meta,
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service_name.to_string(),
                                port: Some(ServiceBackendPort {
                                    number: Some(port),
                                    ..ServiceBackendPort::default()
                                }),
                            }),
                            ..IngressBackend::default()
                        },
                    }],
                }),
            }]),
            ..IngressSpec::default()
        }),
        ..Ingress::default()
    }
}

/// `demo` namespace with release `app1` plus unrelated neighbours.
pub fn demo_cluster() -> FakeCluster {
    let mut cluster = FakeCluster::new("demo");
    cluster.deployments = vec![
        deployment(release_meta("other-web", "other")),
        deployment(release_meta("web", "app1")),
    ];
    cluster.pods = vec![
        pod(instance_meta("web-1", "app1"), "Running", &[true, true]),
        pod(instance_meta("web-2", "app1"), "Running", &[true]),
        pod(instance_meta("other-web-1", "other"), "Pending", &[false]),
    ];
    cluster.services = vec![
        service(release_meta("web", "app1"), 8080, Some(30080)),
        service(plain_meta("kubernetes"), 6443, None),
    ];
    cluster.ingresses = vec![
        ingress(release_meta("web", "app1"), "demo.example.com", "web", 80),
        ingress(release_meta("other", "other"), "other.example.com", "other", 80),
    ];
    cluster
}

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub cluster: Arc<FakeCluster>,
    server_handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestApp {
    pub async fn pod_status(&self, query: &[(&str, &str)]) -> reqwest::Response {
        self.api_client
            .get(format!("{}/pod-status", &self.address))
            .query(query)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn root(&self) -> reqwest::Response {
        self.api_client
            .get(format!("{}/", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

pub async fn spawn_test_app(cluster: FakeCluster) -> TestApp {
    spawn_test_app_with_policy(cluster, MembershipPolicy::default()).await
}

pub async fn spawn_test_app_with_policy(cluster: FakeCluster, policy: MembershipPolicy) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let cluster = Arc::new(cluster);
    let state = AppState {
        cluster: cluster.clone(),
        policy,
    };
    let server_handle = tokio::spawn(server::serve(listener, state, std::future::pending()));

    TestApp {
        address: format!("http://127.0.0.1:{port}"),
        api_client: reqwest::Client::new(),
        cluster,
        server_handle,
    }
}
