//! Telemetry envelope DTO.

use chrono::{DateTime, Utc};
use gpuprobe_core::{CpuSummary, DeviceRecord, TelemetryReport};
use serde::{Deserialize, Serialize};

/// Response envelope for `GET /api/gpu`.
///
/// At most one of `nvidia`/`amd` is true. `cpu` is present only on the
/// no-GPU path and `error` only on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryResponseDto {
    pub nvidia: bool,
    pub amd: bool,
    pub devices: Vec<DeviceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<CpuSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl From<TelemetryReport> for TelemetryResponseDto {
    fn from(report: TelemetryReport) -> Self {
        Self {
            nvidia: report.capability.is_nvidia(),
            amd: report.capability.is_amd(),
            devices: report.devices,
            cpu: report.cpu,
            error: report.error,
            collected_at: report.collected_at,
            elapsed_ms: report.elapsed_ms,
        }
    }
}
