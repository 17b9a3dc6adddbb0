//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `tokio::process` or `sysinfo` types in any signature
//! - Every child invocation carries its own timeout
//! - CPU probing is infallible at the port level (`None` means unavailable)

pub mod command_runner;
pub mod cpu_probe;

pub use command_runner::{CommandError, CommandOutput, CommandRunner, ToolInvocation};
pub use cpu_probe::CpuProbePort;

#[cfg(test)]
pub use cpu_probe::MockCpuProbePort;
