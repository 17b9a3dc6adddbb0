//! Capability detection.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::config::{PresenceProbe, TelemetryConfig, ToolConfig};
use crate::domain::Capability;
use crate::error::ProbeError;
use crate::ports::{CommandRunner, ToolInvocation};

/// Probes vendor tools in fixed priority order: NVIDIA, then AMD.
///
/// Probes run one after another; the first success wins. Nothing is cached.
pub struct CapabilityDetector {
    runner: Arc<dyn CommandRunner>,
    config: TelemetryConfig,
}

impl CapabilityDetector {
    pub fn new(runner: Arc<dyn CommandRunner>, config: TelemetryConfig) -> Self {
        Self { runner, config }
    }

    /// Determine which capability path this request should take.
    #[instrument(skip(self))]
    pub async fn detect(&self) -> Capability {
        let candidates = [
            (Capability::Nvidia, &self.config.nvidia),
            (Capability::Amd, &self.config.amd),
        ];

        for (capability, tool) in candidates {
            match self.probe(tool).await {
                Ok(()) => {
                    info!(%capability, tool = %tool.program, "GPU tooling detected");
                    return capability;
                }
                Err(e) => debug!("{}", e),
            }
        }

        debug!("No GPU tooling detected, using CPU fallback");
        Capability::None
    }

    /// Check a single tool's presence.
    ///
    /// Non-zero exit, spawn failure and timeout all mean "absent".
    pub async fn probe(&self, tool: &ToolConfig) -> Result<(), ProbeError> {
        let invocation = self.probe_invocation(tool);
        self.runner
            .run(&invocation)
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::ToolNotFound {
                tool: tool.program.clone(),
                reason: e.to_string(),
            })
    }

    fn probe_invocation(&self, tool: &ToolConfig) -> ToolInvocation {
        let timeout = self.config.command_timeout;
        match &self.config.presence_probe {
            PresenceProbe::Locate { locator } => {
                ToolInvocation::new(locator.as_str(), timeout).arg(tool.program.as_str())
            }
            PresenceProbe::Invoke => {
                ToolInvocation::new(tool.program.as_str(), timeout).args(tool.probe_args.iter().cloned())
            }
        }
    }
}
