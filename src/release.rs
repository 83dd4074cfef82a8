//! Deciding which resources belong to a Helm release.

use std::collections::BTreeMap;

use clap::ValueEnum;
use k8s_openapi::api::apps::v1::Deployment;

/// Annotation Helm stamps on every object it manages.
pub const RELEASE_NAME_ANNOTATION: &str = "meta.helm.sh/release-name";
/// Standard label carrying the release (instance) name.
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

/// How membership of a resource kind is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MembershipStrategy {
    /// List everything and filter client-side: the Helm release annotation for
    /// services and ingresses, the instance label for pods.
    Annotation,
    /// Push `app.kubernetes.io/instance=<release>` into the list call.
    Selector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipPolicy {
    pub pods: MembershipStrategy,
    pub services: MembershipStrategy,
    pub ingresses: MembershipStrategy,
}

impl Default for MembershipPolicy {
    fn default() -> Self {
        Self {
            pods: MembershipStrategy::Selector,
            services: MembershipStrategy::Annotation,
            ingresses: MembershipStrategy::Annotation,
        }
    }
}

impl MembershipStrategy {
    /// Label selector to pass to the list call, if this strategy pushes one down.
    pub fn selector(self, release: &str) -> Option<String> {
        match self {
            MembershipStrategy::Annotation => None,
            MembershipStrategy::Selector => Some(release_selector(release)),
        }
    }

    /// Client-side check applied after listing. Selector-listed objects were
    /// already filtered by the API server.
    pub fn retains(self, annotations: Option<&BTreeMap<String, String>>, release: &str) -> bool {
        match self {
            MembershipStrategy::Annotation => belongs_to_release(annotations, release),
            MembershipStrategy::Selector => true,
        }
    }

    /// Client-side check for pods. Helm annotates only the objects it creates,
    /// so pods are matched on the instance label propagated from the template.
    pub fn retains_pod(self, labels: Option<&BTreeMap<String, String>>, release: &str) -> bool {
        match self {
            MembershipStrategy::Annotation => has_instance_label(labels, release),
            MembershipStrategy::Selector => true,
        }
    }
}

pub fn release_selector(release: &str) -> String {
    format!("{INSTANCE_LABEL}={release}")
}

/// True iff `annotations` carries the release annotation with exactly `release`.
///
/// Objects without annotations never match.
pub fn belongs_to_release(annotations: Option<&BTreeMap<String, String>>, release: &str) -> bool {
    annotations
        .and_then(|a| a.get(RELEASE_NAME_ANNOTATION))
        .is_some_and(|value| value == release)
}

/// True iff `labels` carries `app.kubernetes.io/instance` with exactly `release`.
pub fn has_instance_label(labels: Option<&BTreeMap<String, String>>, release: &str) -> bool {
    labels
        .and_then(|l| l.get(INSTANCE_LABEL))
        .is_some_and(|value| value == release)
}

/// Label values are at most 63 characters of `[A-Za-z0-9._-]`, beginning and
/// ending with an alphanumeric. Anything else cannot name a release.
pub fn is_valid_label_value(value: &str) -> bool {
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= 63
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        }
        _ => false,
    }
}

/// Namespaces are RFC 1123 labels: lowercase alphanumerics and `-`, at most
/// 63 characters, alphanumeric at both ends.
pub fn is_valid_namespace(value: &str) -> bool {
    let bytes = value.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            bytes.len() <= 63
                && (first.is_ascii_lowercase() || first.is_ascii_digit())
                && (last.is_ascii_lowercase() || last.is_ascii_digit())
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        }
        _ => false,
    }
}

/// Finds a deployment owned by `release`, looking at every deployment rather
/// than the first annotated one.
pub fn resolve_release<'a>(deployments: &'a [Deployment], release: &str) -> Option<&'a Deployment> {
    deployments
        .iter()
        .find(|d| belongs_to_release(d.metadata.annotations.as_ref(), release))
}
