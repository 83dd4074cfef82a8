pub mod aggregate;
pub mod config;
pub mod k8s;
pub mod models;
pub mod readiness;
pub mod release;
pub mod server;
pub mod telemetry;
