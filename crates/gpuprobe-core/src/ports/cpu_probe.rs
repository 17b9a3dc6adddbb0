//! CPU probe port for the no-GPU fallback path.

use crate::domain::CpuSummary;

/// Port for querying host CPU identity and metrics.
///
/// Implementations may block; the orchestrator calls them on the blocking
/// pool. Failure is expressed as `None`, never as a panic or error.
#[cfg_attr(test, mockall::automock)]
pub trait CpuProbePort: Send + Sync {
    /// Summarize the host CPU, or `None` if it cannot be determined.
    fn probe(&self) -> Option<CpuSummary>;
}
