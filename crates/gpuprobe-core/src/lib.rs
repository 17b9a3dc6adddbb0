#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used types for convenience
pub use config::{
    DEFAULT_COMMAND_TIMEOUT, ENV_AMD_SMI, ENV_NVIDIA_SMI, ENV_TIMEOUT_MS, MAX_COMMAND_TIMEOUT,
    PresenceProbe, TelemetryConfig, ToolConfig,
};
pub use domain::{
    Capability, Clocks, CpuSummary, DeviceRecord, FanSpeed, FanUnit, MemoryUsage, PowerUsage,
    TelemetryReport, Utilization,
};
pub use error::{ConfigError, Defect, ProbeError, QueryError};
pub use ports::{CommandError, CommandOutput, CommandRunner, CpuProbePort, ToolInvocation};
pub use services::{
    AmdAdapter, CapabilityDetector, JsonShape, NvidiaAdapter, Parsed, TelemetryService,
};
