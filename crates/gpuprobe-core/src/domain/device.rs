//! Normalized per-GPU record.

use serde::{Deserialize, Serialize};

/// Busy percentages, 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub gpu: f64,
    pub memory: f64,
}

/// Video memory in MiB.
///
/// `used + free` is not guaranteed to equal `total`: vendor tools may report
/// visible and total VRAM differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total: f64,
    pub used: f64,
    pub free: f64,
}

impl MemoryUsage {
    /// `used / total * 100`, or 0 when `total` is not positive.
    pub fn utilization_percent(&self) -> f64 {
        if self.total > 0.0 {
            self.used / self.total * 100.0
        } else {
            0.0
        }
    }
}

/// Board power in watts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerUsage {
    pub draw: f64,
    pub limit: f64,
}

/// Current clocks in MHz.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Clocks {
    pub graphics: f64,
    pub memory: f64,
}

/// Unit of [`FanSpeed::speed`], which depends on the reporting tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanUnit {
    #[default]
    Percent,
    Rpm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FanSpeed {
    pub speed: f64,
    pub unit: FanUnit,
}

/// One GPU, normalized across vendors.
///
/// `index` is unique within a single report and only stable for that poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub index: u32,
    pub name: String,
    pub driver_version: String,
    /// Degrees Celsius.
    pub temperature: f64,
    pub utilization: Utilization,
    pub memory: MemoryUsage,
    pub power: PowerUsage,
    pub clocks: Clocks,
    pub fan: FanSpeed,
}

impl DeviceRecord {
    /// A record carrying identity only, every telemetry field zeroed.
    pub fn identity(index: u32, name: impl Into<String>, driver_version: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            driver_version: driver_version.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_utilization_zero_total() {
        let mem = MemoryUsage {
            total: 0.0,
            used: 512.0,
            free: 0.0,
        };
        assert!(mem.utilization_percent().abs() < f64::EPSILON);
    }

    #[test]
    fn test_memory_utilization_ratio() {
        for (used, total) in [(0.0, 8.0), (2.0, 8.0), (8.0, 8.0), (4576.0, 24576.0)] {
            let mem = MemoryUsage {
                total,
                used,
                free: total - used,
            };
            let expected = used / total * 100.0;
            assert!((mem.utilization_percent() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = DeviceRecord::identity(1, "MI300", "6.7.0");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["driverVersion"], "6.7.0");
        assert!(json.get("driver_version").is_none());
        assert_eq!(json["fan"]["unit"], "percent");
        assert_eq!(json["memory"]["total"], 0.0);
    }

    #[test]
    fn test_fan_unit_serialization() {
        let fan = FanSpeed {
            speed: 1800.0,
            unit: FanUnit::Rpm,
        };
        let json = serde_json::to_string(&fan).unwrap();
        assert_eq!(json, r#"{"speed":1800.0,"unit":"rpm"}"#);
    }
}
