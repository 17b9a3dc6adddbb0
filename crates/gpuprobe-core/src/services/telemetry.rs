//! The telemetry orchestrator.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, instrument, warn};

use crate::config::TelemetryConfig;
use crate::domain::{Capability, CpuSummary, TelemetryReport};
use crate::error::QueryError;
use crate::ports::{CommandRunner, CpuProbePort};

use super::{AmdAdapter, CapabilityDetector, NvidiaAdapter};

/// Runs one poll: detect, query the matching adapter, build the report.
///
/// This is the only place adapter failures are converted; [`collect`]
/// always returns a report.
///
/// [`collect`]: TelemetryService::collect
pub struct TelemetryService {
    runner: Arc<dyn CommandRunner>,
    cpu: Arc<dyn CpuProbePort>,
    config: TelemetryConfig,
}

impl TelemetryService {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        cpu: Arc<dyn CpuProbePort>,
        config: TelemetryConfig,
    ) -> Self {
        Self {
            runner,
            cpu,
            config,
        }
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    pub fn detector(&self) -> CapabilityDetector {
        CapabilityDetector::new(Arc::clone(&self.runner), self.config.clone())
    }

    /// Collect a telemetry report. Never fails.
    #[instrument(skip(self))]
    pub async fn collect(&self) -> TelemetryReport {
        let started = Instant::now();
        let capability = self.detector().detect().await;

        let report = match self.query(capability).await {
            Ok(report) => report,
            Err(e) => {
                error!(%capability, error = %e, "Telemetry query failed");
                TelemetryReport::failed(e.to_string())
            }
        };

        let report = report.with_elapsed(started.elapsed());
        debug!(
            capability = %report.capability,
            devices = report.devices.len(),
            elapsed_ms = report.elapsed_ms,
            "Telemetry collected"
        );
        report
    }

    async fn query(&self, capability: Capability) -> Result<TelemetryReport, QueryError> {
        match capability {
            Capability::Nvidia => {
                let devices = NvidiaAdapter::new(Arc::clone(&self.runner), &self.config)
                    .query()
                    .await?;
                Ok(TelemetryReport::gpu(capability, devices))
            }
            Capability::Amd => {
                let devices = AmdAdapter::new(Arc::clone(&self.runner), &self.config)
                    .query()
                    .await?;
                Ok(TelemetryReport::gpu(capability, devices))
            }
            Capability::None => Ok(TelemetryReport::cpu_only(self.query_cpu().await)),
        }
    }

    /// Probe the CPU on the blocking pool. A panicking probe yields `None`.
    pub async fn query_cpu(&self) -> Option<CpuSummary> {
        let probe = Arc::clone(&self.cpu);
        tokio::task::spawn_blocking(move || probe.probe())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "CPU probe task failed");
                None
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresenceProbe;
    use crate::ports::{CommandError, MockCpuProbePort};
    use crate::test_utils::{FakeRunner, FixedCpuProbe};

    const RTX_4090: &str =
        "0, RTX 4090, 535.1, 45, 12, 3, 24576, 20000, 4576, 120.5, 450.0, 2500, 10000, 55";

    fn config() -> TelemetryConfig {
        TelemetryConfig::default().with_presence_probe(PresenceProbe::locate("which"))
    }

    fn nvidia_line() -> String {
        NvidiaAdapter::new(Arc::new(FakeRunner::new()), &config())
            .invocation()
            .command_line()
    }

    fn no_cpu_calls() -> Arc<MockCpuProbePort> {
        let mut cpu = MockCpuProbePort::new();
        cpu.expect_probe().never();
        Arc::new(cpu)
    }

    #[tokio::test]
    async fn test_no_tools_returns_cpu_summary() {
        let mut cpu = MockCpuProbePort::new();
        cpu.expect_probe()
            .times(1)
            .returning(|| FixedCpuProbe::desktop().0);

        let service = TelemetryService::new(Arc::new(FakeRunner::new()), Arc::new(cpu), config());
        let report = service.collect().await;

        assert_eq!(report.capability, Capability::None);
        assert!(!report.capability.is_nvidia());
        assert!(!report.capability.is_amd());
        assert!(report.devices.is_empty());
        assert!(report.error.is_none());
        assert_eq!(report.cpu.unwrap().cores, 16);
    }

    #[tokio::test]
    async fn test_unavailable_cpu_is_still_success() {
        let service = TelemetryService::new(
            Arc::new(FakeRunner::new()),
            Arc::new(FixedCpuProbe(None)),
            config(),
        );
        let report = service.collect().await;
        assert!(report.cpu.is_none());
        assert!(!report.is_error());
    }

    #[tokio::test]
    async fn test_nvidia_path() {
        let runner = FakeRunner::new()
            .respond("which nvidia-smi", "/usr/bin/nvidia-smi")
            .respond(&nvidia_line(), RTX_4090);
        let service = TelemetryService::new(Arc::new(runner), no_cpu_calls(), config());

        let report = service.collect().await;
        assert_eq!(report.capability, Capability::Nvidia);
        assert_eq!(report.devices.len(), 1);
        assert_eq!(report.devices[0].name, "RTX 4090");
        assert!(report.cpu.is_none());
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_query_failure_becomes_error_envelope() {
        let runner = FakeRunner::new()
            .respond("which nvidia-smi", "/usr/bin/nvidia-smi")
            .fail(
                &nvidia_line(),
                CommandError::Failed {
                    program: "nvidia-smi".to_string(),
                    code: Some(15),
                    stderr: "Unable to determine the device handle".to_string(),
                },
            );
        let service = TelemetryService::new(Arc::new(runner), no_cpu_calls(), config());

        let report = service.collect().await;
        assert_eq!(report.capability, Capability::None);
        assert!(report.devices.is_empty());
        assert!(report.cpu.is_none());
        let message = report.error.unwrap();
        assert!(message.contains("nvidia-smi"));
    }

    #[tokio::test]
    async fn test_amd_path_with_partial_data() {
        let runner = FakeRunner::new()
            .respond("which amd-smi", "/opt/rocm/bin/amd-smi")
            .respond(
                "amd-smi static --json",
                r#"{"gpu_data":[{"gpu":"0","asic":{"market_name":"MI300"}}]}"#,
            );
        let service = TelemetryService::new(Arc::new(runner), no_cpu_calls(), config());

        let report = service.collect().await;
        assert_eq!(report.capability, Capability::Amd);
        assert!(report.error.is_none());
        assert_eq!(report.devices.len(), 1);
        assert_eq!(report.devices[0].name, "MI300");
        assert!(report.devices[0].temperature.abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_cpu_probe_panic_is_contained() {
        struct Exploding;
        impl CpuProbePort for Exploding {
            fn probe(&self) -> Option<CpuSummary> {
                panic!("sensor read exploded")
            }
        }

        let service = TelemetryService::new(Arc::new(FakeRunner::new()), Arc::new(Exploding), config());
        assert!(service.query_cpu().await.is_none());
    }
}
