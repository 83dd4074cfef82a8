use std::future::Future;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Instrument, debug, error, info, info_span};

use crate::aggregate::{Aggregator, ReleaseLookup};
use crate::k8s::{ClusterClient, ClusterError};
use crate::release::{MembershipPolicy, is_valid_label_value, is_valid_namespace};

pub const USAGE_HINT: &str =
    "Go to this path: /pod-status?namespace=<your-namespace-name>&release-name=<your-release-name>";

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub cluster: Arc<dyn ClusterClient>,
    pub policy: MembershipPolicy,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    MissingParameter(&'static str),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    MalformedQuery(#[from] QueryRejection),

    #[error("Release '{release}' does not exist in namespace '{namespace}'")]
    ReleaseNotFound { namespace: String, release: String },

    #[error(transparent)]
    ClusterQuery(#[from] ClusterError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_)
            | ApiError::InvalidParameter(_)
            | ApiError::MalformedQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::ReleaseNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::ClusterQuery(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingParameter(_) => "Missing parameter",
            ApiError::InvalidParameter(_) | ApiError::MalformedQuery(_) => "Invalid parameter",
            ApiError::ReleaseNotFound { .. } => "Release not found",
            ApiError::ClusterQuery(_) => "Failed to fetch pods",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PodStatusParams {
    namespace: Option<String>,
    #[serde(rename = "release-name")]
    release_name: Option<String>,
}

/// Empty values count as missing.
fn required(value: Option<String>, message: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingParameter(message))
}

/// Presence is checked for both parameters before their format, namespace first.
fn validate(
    query: Result<Query<PodStatusParams>, QueryRejection>,
) -> Result<(String, String), ApiError> {
    let Query(PodStatusParams {
        namespace,
        release_name,
    }) = query?;

    let namespace = required(namespace, "Namespace is required")?;
    let release = required(release_name, "Release name is required")?;

    if !is_valid_namespace(&namespace) {
        return Err(ApiError::InvalidParameter(format!(
            "Namespace '{namespace}' is not a valid namespace name"
        )));
    }
    if !is_valid_label_value(&release) {
        return Err(ApiError::InvalidParameter(format!(
            "Release name '{release}' is not a valid label value"
        )));
    }

    Ok((namespace, release))
}

async fn usage() -> &'static str {
    USAGE_HINT
}

async fn pod_status(
    State(state): State<AppState>,
    query: Result<Query<PodStatusParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let (namespace, release) = validate(query).inspect_err(|err| {
        debug!(%err, "rejected pod-status request");
    })?;

    let span = info_span!("pod_status", namespace = %namespace, release = %release);
    let aggregator = Aggregator::new(state.cluster.as_ref(), state.policy);

    async {
        match aggregator.aggregate(&namespace, &release).await {
            Ok(ReleaseLookup::Found(aggregate)) => {
                info!(pods = aggregate.pods_count, "release status served");
                Ok(Json(aggregate).into_response())
            }
            Ok(ReleaseLookup::NotFound) => {
                info!("release not found");
                Err(ApiError::ReleaseNotFound {
                    namespace: namespace.clone(),
                    release: release.clone(),
                })
            }
            Err(err) => {
                error!(error = %err, "cluster query failed");
                Err(ApiError::ClusterQuery(err))
            }
        }
    }
    .instrument(span)
    .await
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(usage))
        .route("/pod-status", get(pod_status))
        .with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Server running at http://{addr}");
    }
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
