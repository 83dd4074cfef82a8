use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use release_status::config::Settings;
use release_status::k8s::KubeClusterClient;
use release_status::server::{self, AppState};
use release_status::telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    // 1. Initialize Crypto
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // 2. Logging
    telemetry::init_tracing(settings.log_format);

    // 3. Initialize Client ONCE
    let kubeconfig = settings.kubeconfig_path()?;
    info!("Using kubeconfig at: {}", kubeconfig.display());
    let cluster = KubeClusterClient::from_kubeconfig(&kubeconfig, settings.context.clone())
        .await
        .with_context(|| format!("failed to initialize cluster client from {}", kubeconfig.display()))?;

    let state = AppState {
        cluster: Arc::new(cluster),
        policy: settings.membership_policy(),
    };

    let addr = settings.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    server::serve(listener, state, server::shutdown_signal()).await?;
    Ok(())
}
