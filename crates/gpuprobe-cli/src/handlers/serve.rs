//! Serve command handler.

use anyhow::Result;
use gpuprobe_axum::{ServerConfig, start_server};

use crate::bootstrap::CliConfig;

/// Run the HTTP server until Ctrl+C.
pub async fn execute(config: &CliConfig, port: u16, allowed_origins: Vec<String>) -> Result<()> {
    let mut server = ServerConfig::with_defaults()
        .with_port(port)
        .with_telemetry(config.telemetry.clone());
    if !allowed_origins.is_empty() {
        server = server.with_allowed_origins(allowed_origins);
    }
    start_server(server).await
}
