//! Detection, vendor adapters and the orchestrating service.
//!
//! Control flow per request: [`CapabilityDetector`] → first matching
//! adapter ([`NvidiaAdapter`], [`AmdAdapter`] or the CPU probe) →
//! [`TelemetryService`] builds the report.

pub mod amd;
pub mod detector;
pub mod nvidia;
pub mod telemetry;

use tracing::{debug, warn};

use crate::domain::DeviceRecord;
use crate::error::Defect;

pub use amd::{AmdAdapter, JsonShape};
pub use detector::CapabilityDetector;
pub use nvidia::NvidiaAdapter;
pub use telemetry::TelemetryService;

/// Records produced by a parse, plus the defects absorbed on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parsed {
    pub records: Vec<DeviceRecord>,
    pub defects: Vec<Defect>,
}

impl Parsed {
    /// Log absorbed defects. Per-field substitutions are routine (`N/A` for
    /// unsupported metrics) and only logged at debug.
    pub(crate) fn log_defects(&self, tool: &str) {
        for defect in &self.defects {
            match defect {
                Defect::ParseDefect { .. } => debug!(tool, %defect, "Substituted default"),
                _ => warn!(tool, %defect, "Skipped malformed tool output"),
            }
        }
    }
}
