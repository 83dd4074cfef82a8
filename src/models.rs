use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::{HTTPIngressPath, Ingress, IngressRule};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;

use crate::readiness::is_pod_ready;

/// Port reference that is either numeric or a named container/service port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PortRef {
    Number(i32),
    Name(String),
}

impl From<&IntOrString> for PortRef {
    fn from(value: &IntOrString) -> Self {
        match value {
            IntOrString::Int(port) => PortRef::Number(*port),
            IntOrString::String(name) => PortRef::Name(name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSummary {
    pub name: String,
    pub status: String,
    pub ready: bool,
    pub created_at: Option<Time>,
}

impl From<&Pod> for PodSummary {
    fn from(pod: &Pod) -> Self {
        let status = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            status,
            ready: is_pod_ready(pod),
            created_at: pod.metadata.creation_timestamp.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePortSummary {
    pub target_port: Option<PortRef>,
    pub node_port: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub name: String,
    pub release_name: String,
    pub port: Vec<ServicePortSummary>,
}

impl ServiceSummary {
    pub fn new(service: &Service, release: &str) -> Self {
        let port = service
            .spec
            .as_ref()
            .and_then(|s| s.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|p| ServicePortSummary {
                        target_port: p.target_port.as_ref().map(PortRef::from),
                        node_port: p.node_port,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: service.metadata.name.clone().unwrap_or_default(),
            release_name: release.to_string(),
            port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressPathSummary {
    pub path: String,
    pub service_name: String,
    pub service_port: Option<PortRef>,
}

impl IngressPathSummary {
    /// `None` for paths routed to a resource backend instead of a service.
    fn from_path(path: &HTTPIngressPath) -> Option<Self> {
        let service = path.backend.service.as_ref()?;
        let service_port = service.port.as_ref().and_then(|port| {
            port.number
                .map(PortRef::Number)
                .or_else(|| port.name.clone().map(PortRef::Name))
        });

        Some(Self {
            path: path.path.clone().unwrap_or_else(|| "/".to_string()),
            service_name: service.name.clone(),
            service_port,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressRuleSummary {
    pub host: Option<String>,
    pub paths: Vec<IngressPathSummary>,
}

impl From<&IngressRule> for IngressRuleSummary {
    fn from(rule: &IngressRule) -> Self {
        let paths = rule
            .http
            .as_ref()
            .map(|http| {
                http.paths
                    .iter()
                    .filter_map(IngressPathSummary::from_path)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            host: rule.host.clone(),
            paths,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressSummary {
    pub name: String,
    pub release_name: String,
    pub rules: Vec<IngressRuleSummary>,
}

impl IngressSummary {
    pub fn new(ingress: &Ingress, release: &str) -> Self {
        let rules = ingress
            .spec
            .as_ref()
            .and_then(|s| s.rules.as_ref())
            .map(|rules| rules.iter().map(IngressRuleSummary::from).collect())
            .unwrap_or_default();

        Self {
            name: ingress.metadata.name.clone().unwrap_or_default(),
            release_name: release.to_string(),
            rules,
        }
    }
}

/// Response payload for `/pod-status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseAggregate {
    pub namespace: String,
    pub release_name: String,
    pub pods_count: usize,
    pub pods: Vec<PodSummary>,
    pub services: Vec<ServiceSummary>,
    pub ingresses: Vec<IngressSummary>,
}
