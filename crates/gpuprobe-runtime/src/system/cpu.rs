//! CPU fallback probe backed by `sysinfo`.

use gpuprobe_core::domain::CpuSummary;
use gpuprobe_core::ports::CpuProbePort;
use sysinfo::{Components, Cpu, System};
use tracing::debug;

/// Implements [`CpuProbePort`] with `sysinfo`.
///
/// Blocking: usage sampling sleeps for sysinfo's minimum update interval
/// between two refreshes.
#[derive(Debug, Clone)]
pub struct SysinfoCpuProbe {
    sample_usage: bool,
}

impl SysinfoCpuProbe {
    pub const fn new() -> Self {
        Self { sample_usage: true }
    }

    /// Skip the usage sample (and its sleep); `usage_percent` is then `None`.
    #[must_use]
    pub const fn without_usage_sample(mut self) -> Self {
        self.sample_usage = false;
        self
    }
}

impl Default for SysinfoCpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuProbePort for SysinfoCpuProbe {
    fn probe(&self) -> Option<CpuSummary> {
        let mut system = System::new();
        system.refresh_cpu_all();

        let usage_percent = if self.sample_usage {
            std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            system.refresh_cpu_all();
            Some(f64::from(system.global_cpu_usage()))
        } else {
            None
        };

        let cpus = system.cpus();
        let Some(first) = cpus.first() else {
            debug!("sysinfo reported no CPUs");
            return None;
        };

        let threads = cpus.len();
        let name = first.brand().trim();
        let summary = CpuSummary {
            name: if name.is_empty() {
                "Unknown CPU".to_string()
            } else {
                name.to_string()
            },
            cores: System::physical_core_count().unwrap_or(threads),
            threads,
            speed_mhz: cpus.iter().map(Cpu::frequency).max().unwrap_or(0),
            temperature: package_temperature(),
            usage_percent,
        };
        debug!(cpu = %summary.name, cores = summary.cores, "CPU probed");
        Some(summary)
    }
}

/// Hottest CPU sensor reading, if any sensor is exposed.
fn package_temperature() -> Option<f64> {
    let components = Components::new_with_refreshed_list();
    components
        .list()
        .iter()
        .filter(|component| is_cpu_sensor(component.label()))
        .filter_map(sysinfo::Component::temperature)
        .filter(|temp| temp.is_finite())
        .map(f64::from)
        .reduce(f64::max)
}

/// Whether a sensor label names a CPU package or core sensor.
fn is_cpu_sensor(label: &str) -> bool {
    let label = label.to_lowercase();
    ["cpu", "core", "package", "tctl", "tdie", "k10temp", "coretemp"]
        .iter()
        .any(|needle| label.contains(needle))
}
