//! Builds the status summary of one release in one namespace.

use futures::try_join;
use tracing::{debug, instrument};

use crate::k8s::{ClusterClient, ClusterError};
use crate::models::{IngressSummary, PodSummary, ReleaseAggregate, ServiceSummary};
use crate::release::{MembershipPolicy, resolve_release};

/// Outcome of looking a release up. A missing release is a normal answer,
/// distinct from a failed cluster query.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseLookup {
    Found(ReleaseAggregate),
    NotFound,
}

pub struct Aggregator<'a> {
    cluster: &'a dyn ClusterClient,
    policy: MembershipPolicy,
}

impl<'a> Aggregator<'a> {
    pub fn new(cluster: &'a dyn ClusterClient, policy: MembershipPolicy) -> Self {
        Self { cluster, policy }
    }

    /// Lists the release's resources concurrently and reshapes them.
    ///
    /// Any failed list call aborts the whole lookup; partial results are never
    /// returned.
    #[instrument(skip(self))]
    pub async fn aggregate(
        &self,
        namespace: &str,
        release: &str,
    ) -> Result<ReleaseLookup, ClusterError> {
        let pod_selector = self.policy.pods.selector(release);
        let service_selector = self.policy.services.selector(release);
        let ingress_selector = self.policy.ingresses.selector(release);

        let (deployments, pods, services, ingresses) = try_join!(
            self.cluster.list_deployments(namespace),
            self.cluster.list_pods(namespace, pod_selector.as_deref()),
            self.cluster.list_services(namespace, service_selector.as_deref()),
            self.cluster.list_ingresses(namespace, ingress_selector.as_deref()),
        )?;

        let Some(deployment) = resolve_release(&deployments, release) else {
            debug!(deployments = deployments.len(), "no deployment annotated with release");
            return Ok(ReleaseLookup::NotFound);
        };
        debug!(deployment = ?deployment.metadata.name, "release resolved");

        let pods: Vec<PodSummary> = pods
            .iter()
            .filter(|p| self.policy.pods.retains_pod(p.metadata.labels.as_ref(), release))
            .map(PodSummary::from)
            .collect();

        let services = services
            .iter()
            .filter(|s| self.policy.services.retains(s.metadata.annotations.as_ref(), release))
            .map(|s| ServiceSummary::new(s, release))
            .collect();

        let ingresses = ingresses
            .iter()
            .filter(|i| self.policy.ingresses.retains(i.metadata.annotations.as_ref(), release))
            .map(|i| IngressSummary::new(i, release))
            .collect();

        Ok(ReleaseLookup::Found(ReleaseAggregate {
            namespace: namespace.to_string(),
            release_name: release.to_string(),
            pods_count: pods.len(),
            pods,
            services,
            ingresses,
        }))
    }
}
