//! Domain types for normalized telemetry.
//!
//! All values are built fresh per request and dropped after serialization.

mod device;
mod report;

pub use device::{Clocks, DeviceRecord, FanSpeed, FanUnit, MemoryUsage, PowerUsage, Utilization};
pub use report::{Capability, CpuSummary, TelemetryReport};
