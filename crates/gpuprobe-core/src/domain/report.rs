//! Capability state and the per-request report.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DeviceRecord;

/// Which vendor path produced the device list.
///
/// Exactly one variant per request; never cached across requests since tools
/// may appear or disappear (driver reloads).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Nvidia,
    Amd,
    #[default]
    None,
}

impl Capability {
    pub const fn is_nvidia(self) -> bool {
        matches!(self, Self::Nvidia)
    }

    pub const fn is_amd(self) -> bool {
        matches!(self, Self::Amd)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nvidia => "nvidia",
            Self::Amd => "amd",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host CPU summary used when no GPU tooling is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuSummary {
    pub name: String,
    /// Physical cores.
    pub cores: usize,
    /// Logical processors.
    pub threads: usize,
    /// Highest current core frequency in MHz.
    pub speed_mhz: u64,
    /// Package temperature in °C, when a sensor is exposed.
    pub temperature: Option<f64>,
    /// Global usage percent, when sampled.
    pub usage_percent: Option<f64>,
}

/// Result of one telemetry poll.
///
/// Either a normal result (`error` is `None`; `devices` for a GPU path or
/// `cpu` for the fallback) or a failure (`capability` is `None`, no devices,
/// `error` populated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub capability: Capability,
    pub devices: Vec<DeviceRecord>,
    pub cpu: Option<CpuSummary>,
    pub error: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl TelemetryReport {
    fn empty() -> Self {
        Self {
            capability: Capability::None,
            devices: Vec::new(),
            cpu: None,
            error: None,
            collected_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    /// Devices produced by a vendor adapter.
    pub fn gpu(capability: Capability, devices: Vec<DeviceRecord>) -> Self {
        Self {
            capability,
            devices,
            ..Self::empty()
        }
    }

    /// No GPU tooling: the CPU fallback result (which may itself be absent).
    pub fn cpu_only(cpu: Option<CpuSummary>) -> Self {
        Self {
            cpu,
            ..Self::empty()
        }
    }

    /// Hard failure converted at the recovery boundary.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty()
        }
    }

    /// Record how long the poll took.
    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
