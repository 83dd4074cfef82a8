//! Read-only access to the namespaced resources a release is made of.
//!
//! Handlers depend on [`ClusterClient`] rather than on [`kube::Client`] so
//! tests can substitute an in-memory cluster.

use std::fmt::Debug;
use std::path::Path;

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource, api::ListParams};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::config::ConfigError;

/// Errors raised while talking to the cluster API.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Transport, authentication or decoding failure reported by [`kube`].
    #[error("{0}")]
    Kube(#[from] kube::Error),
}

/// List operations needed to summarize a release.
///
/// A `selector` is a label selector pushed into the list call; `None` lists
/// every resource of that kind in the namespace.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_pods(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, ClusterError>;

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClusterError>;

    async fn list_services(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Service>, ClusterError>;

    async fn list_ingresses(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Ingress>, ClusterError>;
}

/// [`ClusterClient`] backed by a real API server.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from a kubeconfig file, optionally pinned to `context`.
    pub async fn from_kubeconfig(path: &Path, context: Option<String>) -> Result<Self, ConfigError> {
        let kubeconfig = Kubeconfig::read_from(path)?;
        let options = KubeConfigOptions {
            context,
            ..KubeConfigOptions::default()
        };
        let config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;
        let client = Client::try_from(config)?;
        Ok(Self::new(client))
    }

    async fn list<K>(&self, namespace: &str, selector: Option<&str>) -> Result<Vec<K>, ClusterError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let lp = match selector {
            Some(selector) => ListParams::default().labels(selector),
            None => ListParams::default(),
        };
        let list = api.list(&lp).await?;

        let dt = Default::default();
        let kind = K::kind(&dt);
        debug!(
            kind = %kind,
            namespace,
            selector,
            count = list.items.len(),
            "listed resources"
        );
        Ok(list.items)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_pods(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Pod>, ClusterError> {
        self.list(namespace, selector).await
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>, ClusterError> {
        self.list(namespace, None).await
    }

    async fn list_services(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Service>, ClusterError> {
        self.list(namespace, selector).await
    }

    async fn list_ingresses(
        &self,
        namespace: &str,
        selector: Option<&str>,
    ) -> Result<Vec<Ingress>, ClusterError> {
        self.list(namespace, selector).await
    }
}
