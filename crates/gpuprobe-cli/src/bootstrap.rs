//! CLI bootstrap - the composition root.
//!
//! The only place where the CLI wires concrete port implementations
//! (`gpuprobe-runtime`) into the core service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gpuprobe_core::{TelemetryConfig, TelemetryService};
use gpuprobe_runtime::{SysinfoCpuProbe, TokioCommandRunner};

use crate::parser::Cli;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub telemetry: TelemetryConfig,
}

impl CliConfig {
    /// Environment configuration, then command-line overrides on top.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let base = TelemetryConfig::from_env().context("Invalid environment configuration")?;
        Ok(Self::with_overrides(base, cli))
    }

    pub fn with_overrides(mut telemetry: TelemetryConfig, cli: &Cli) -> Self {
        if let Some(program) = &cli.nvidia_smi {
            telemetry = telemetry.with_nvidia_program(program.as_str());
        }
        if let Some(program) = &cli.amd_smi {
            telemetry = telemetry.with_amd_program(program.as_str());
        }
        if let Some(ms) = cli.timeout_ms {
            telemetry = telemetry.with_command_timeout(Duration::from_millis(ms));
        }
        Self { telemetry }
    }
}

/// Composed context for CLI commands.
pub struct CliContext {
    telemetry: TelemetryService,
}

impl CliContext {
    pub const fn telemetry(&self) -> &TelemetryService {
        &self.telemetry
    }
}

pub fn bootstrap(config: &CliConfig) -> Result<CliContext> {
    config
        .telemetry
        .validate()
        .context("Invalid telemetry configuration")?;

    let telemetry = TelemetryService::new(
        Arc::new(TokioCommandRunner::new()),
        Arc::new(SysinfoCpuProbe::new()),
        config.telemetry.clone(),
    );
    Ok(CliContext { telemetry })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_flags_override_base_config() {
        let cli = Cli::parse_from([
            "gpuprobe",
            "--amd-smi",
            "/opt/rocm/bin/amd-smi",
            "--timeout-ms",
            "1500",
            "query",
        ]);
        let base = TelemetryConfig::default().with_nvidia_program("/env/nvidia-smi");

        let config = CliConfig::with_overrides(base, &cli);
        assert_eq!(config.telemetry.nvidia.program, "/env/nvidia-smi");
        assert_eq!(config.telemetry.amd.program, "/opt/rocm/bin/amd-smi");
        assert_eq!(config.telemetry.command_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_bootstrap_rejects_zero_timeout() {
        let cli = Cli::parse_from(["gpuprobe", "--timeout-ms", "0", "query"]);
        let config = CliConfig::with_overrides(TelemetryConfig::default(), &cli);
        assert!(bootstrap(&config).is_err());
    }

    #[test]
    fn test_bootstrap_default() {
        let config = CliConfig {
            telemetry: TelemetryConfig::default(),
        };
        let ctx = bootstrap(&config).unwrap();
        assert_eq!(ctx.telemetry().config().amd.program, "amd-smi");
    }
}
