use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::release::{MembershipPolicy, MembershipStrategy};

/// File name looked up in the home directory when no kubeconfig is given.
pub const DEFAULT_KUBECONFIG_FILE: &str = "k3s.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("HOME is not set and no kubeconfig path was provided")]
    MissingHome,

    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to build kubernetes client: {0}")]
    Client(#[from] kube::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "release-status", about = "Release status for Helm-managed workloads", author, version, long_about = None)]
pub struct Settings {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address the HTTP server binds to
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Path to the kubeconfig file. Defaults to $HOME/k3s.yaml
    #[arg(long, env = "KUBECONFIG_PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current one
    #[arg(long, env = "KUBE_CONTEXT")]
    pub context: Option<String>,

    /// How pods are matched to a release
    #[arg(long, env = "POD_MEMBERSHIP", value_enum, default_value_t = MembershipStrategy::Selector)]
    pub pod_membership: MembershipStrategy,

    /// How services are matched to a release
    #[arg(long, env = "SERVICE_MEMBERSHIP", value_enum, default_value_t = MembershipStrategy::Annotation)]
    pub service_membership: MembershipStrategy,

    /// How ingresses are matched to a release
    #[arg(long, env = "INGRESS_MEMBERSHIP", value_enum, default_value_t = MembershipStrategy::Annotation)]
    pub ingress_membership: MembershipStrategy,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Settings {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Resolves the kubeconfig location, falling back to `$HOME/k3s.yaml`.
    pub fn kubeconfig_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.kubeconfig {
            return Ok(path.clone());
        }
        let home = std::env::var_os("HOME").ok_or(ConfigError::MissingHome)?;
        Ok(PathBuf::from(home).join(DEFAULT_KUBECONFIG_FILE))
    }

    pub fn membership_policy(&self) -> MembershipPolicy {
        MembershipPolicy {
            pods: self.pod_membership,
            services: self.service_membership,
            ingresses: self.ingress_membership,
        }
    }
}
