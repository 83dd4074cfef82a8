use k8s_openapi::api::core::v1::Pod;

/// A simplified view of a pod phase. Unknown values map to [`PodPhase::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<&str> for PodPhase {
    fn from(value: &str) -> Self {
        match value {
            "Pending" => PodPhase::Pending,
            "Running" => PodPhase::Running,
            "Succeeded" => PodPhase::Succeeded,
            "Failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

pub fn pod_phase(pod: &Pod) -> PodPhase {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(PodPhase::from)
        .unwrap_or(PodPhase::Unknown)
}

/// A pod is ready when it is running and every observed container reports ready.
///
/// A running pod with no container statuses yet is not ready.
pub fn is_pod_ready(pod: &Pod) -> bool {
    if pod_phase(pod) != PodPhase::Running {
        return false;
    }

    match pod.status.as_ref().and_then(|s| s.container_statuses.as_ref()) {
        Some(statuses) if !statuses.is_empty() => statuses.iter().all(|c| c.ready),
        _ => false,
    }
}
