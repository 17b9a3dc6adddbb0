//! Composition root for the HTTP server.

use std::sync::Arc;

use anyhow::{Context, Result};
use gpuprobe_core::ports::{CommandRunner, CpuProbePort};
use gpuprobe_core::{TelemetryConfig, TelemetryService};
use gpuprobe_runtime::{SysinfoCpuProbe, TokioCommandRunner};
use tracing::{info, warn};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 9897;

#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    #[default]
    AllowAll,
    AllowOrigins(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub cors: CorsConfig,
    pub telemetry: TelemetryConfig,
}

impl ServerConfig {
    pub fn with_defaults() -> Self {
        Self {
            port: DEFAULT_PORT,
            cors: CorsConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Services needed by the HTTP handlers.
pub struct AxumContext {
    pub telemetry: Arc<TelemetryService>,
}

impl AxumContext {
    pub fn new(telemetry: TelemetryService) -> Self {
        Self {
            telemetry: Arc::new(telemetry),
        }
    }
}

/// Validate configuration and wire the OS-backed ports into the service.
pub fn bootstrap(config: &ServerConfig) -> Result<AxumContext> {
    config
        .telemetry
        .validate()
        .context("Invalid telemetry configuration")?;

    let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());
    let cpu: Arc<dyn CpuProbePort> = Arc::new(SysinfoCpuProbe::new());

    info!(
        nvidia = %config.telemetry.nvidia.program,
        amd = %config.telemetry.amd.program,
        timeout = ?config.telemetry.command_timeout,
        "Telemetry service configured"
    );

    Ok(AxumContext::new(TelemetryService::new(
        runner,
        cpu,
        config.telemetry.clone(),
    )))
}

/// Bind and serve until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    use tokio::net::TcpListener;

    let ctx = bootstrap(&config)?;
    let app = crate::routes::create_router(ctx, &config.cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("gpuprobe server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
