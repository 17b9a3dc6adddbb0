//! AMD (`amd-smi`) adapter.
//!
//! Device identity and live telemetry are separate datasets:
//! `amd-smi static --json` and `amd-smi metric --json`. Both are JSON, but
//! the top level differs between tool versions: older releases print a bare
//! array of device objects, newer ones wrap it as `{"gpu_data": [...]}`.
//! Leaves are either scalars or `{"value": .., "unit": ..}` objects.
//!
//! Static entries drive the join. The metric entry for a device is found by
//! its own `gpu` index when every metric entry declares a distinct one, and
//! by array position otherwise. The positional fallback assumes both
//! invocations list devices in the same order; nothing verifies that.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::{TelemetryConfig, ToolConfig};
use crate::domain::{Clocks, DeviceRecord, FanSpeed, FanUnit, MemoryUsage, PowerUsage, Utilization};
use crate::error::{Defect, QueryError};
use crate::ports::{CommandRunner, ToolInvocation};
use crate::utils::{as_index, first_number, first_text, parse_number_value};

use super::Parsed;

/// Object keys known to wrap the device sequence.
pub const WRAPPER_KEYS: &[&str] = &["gpu_data"];

/// Stand-in for a missing metric entry: every lookup misses, every field is 0.
static EMPTY_METRIC: Value = Value::Null;

/// Top-level shape of an `amd-smi --json` document, decided once per parse.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonShape {
    /// `[ {...}, {...} ]`
    BareArray(Vec<Value>),
    /// `{ "gpu_data": [ {...}, {...} ] }`
    WrappedObject(Vec<Value>),
    /// Anything else.
    Unrecognized,
}

impl JsonShape {
    pub fn classify(document: Value) -> Self {
        match document {
            Value::Array(entries) => Self::BareArray(entries),
            Value::Object(mut map) => WRAPPER_KEYS
                .iter()
                .find_map(|key| match map.remove(*key) {
                    Some(Value::Array(entries)) => Some(Self::WrappedObject(entries)),
                    _ => None,
                })
                .unwrap_or(Self::Unrecognized),
            _ => Self::Unrecognized,
        }
    }

    /// The device sequence. Unrecognized shapes yield an empty sequence.
    pub fn into_entries(self) -> Vec<Value> {
        match self {
            Self::BareArray(entries) | Self::WrappedObject(entries) => entries,
            Self::Unrecognized => Vec::new(),
        }
    }
}

/// Parse tool output into its device sequence.
///
/// Whitespace-only output is an empty sequence. Only a JSON syntax error
/// fails.
pub fn parse_entries(text: &str) -> Result<Vec<Value>, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let document: Value = serde_json::from_str(text)?;
    let shape = JsonShape::classify(document);
    if shape == JsonShape::Unrecognized {
        debug!("Unrecognized amd-smi JSON shape, treating as empty");
    }
    Ok(shape.into_entries())
}

/// The device index an entry declares for itself.
fn device_index(entry: &Value) -> Option<u32> {
    entry.get("gpu").and_then(parse_number_value).and_then(as_index)
}

/// How metric entries are matched to static entries.
enum MetricLookup<'a> {
    Keyed(HashMap<u32, &'a Value>),
    Positional(&'a [Value]),
}

impl<'a> MetricLookup<'a> {
    fn build(metrics: &'a [Value]) -> Self {
        if metrics.is_empty() {
            return Self::Positional(metrics);
        }

        let mut keyed = HashMap::with_capacity(metrics.len());
        for entry in metrics {
            let Some(index) = device_index(entry) else {
                return Self::Positional(metrics);
            };
            if keyed.insert(index, entry).is_some() {
                return Self::Positional(metrics);
            }
        }
        Self::Keyed(keyed)
    }

    fn get(&self, index: u32) -> Option<&'a Value> {
        match self {
            Self::Keyed(map) => map.get(&index).copied(),
            Self::Positional(entries) => usize::try_from(index).ok().and_then(|i| entries.get(i)),
        }
    }
}

/// Join static and metric entries into device records.
///
/// Static entries whose index does not resolve to a non-negative integer are
/// dropped as [`Defect::UnresolvedIndex`], and a repeat of an index already
/// emitted as [`Defect::DuplicateIndex`]. A device without a metric entry
/// gets zeroed telemetry.
pub fn join_records(statics: &[Value], metrics: &[Value]) -> Parsed {
    let lookup = MetricLookup::build(metrics);
    if matches!(lookup, MetricLookup::Positional(entries) if !entries.is_empty()) {
        debug!("Metric entries lack distinct indices, joining by position");
    }

    let mut parsed = Parsed::default();
    let mut seen = HashSet::new();
    for (position, entry) in statics.iter().enumerate() {
        let Some(index) = device_index(entry) else {
            parsed.defects.push(Defect::UnresolvedIndex { position });
            continue;
        };
        if !seen.insert(index) {
            parsed.defects.push(Defect::DuplicateIndex { index, position });
            continue;
        }
        let metric = lookup.get(index).unwrap_or(&EMPTY_METRIC);
        parsed.records.push(build_record(index, entry, metric));
    }
    parsed
}

fn build_record(index: u32, identity: &Value, metric: &Value) -> DeviceRecord {
    let number = |root: &Value, paths: &[&[&str]]| first_number(root, paths).unwrap_or(0.0);

    let total = first_number(metric, &[&["mem_usage", "total_vram"]])
        .or_else(|| first_number(identity, &[&["vram", "size"]]))
        .unwrap_or(0.0);
    let memory = MemoryUsage {
        total,
        used: number(metric, &[&["mem_usage", "used_vram"]]),
        free: number(metric, &[&["mem_usage", "free_vram"]]),
    };

    let fan = if let Some(speed) = first_number(metric, &[&["fan", "usage"]]) {
        FanSpeed {
            speed,
            unit: FanUnit::Percent,
        }
    } else if let Some(speed) = first_number(metric, &[&["fan", "rpm"]]) {
        FanSpeed {
            speed,
            unit: FanUnit::Rpm,
        }
    } else {
        FanSpeed::default()
    };

    DeviceRecord {
        index,
        name: first_text(identity, &[&["asic", "market_name"], &["asic", "name"]])
            .unwrap_or_default(),
        driver_version: first_text(identity, &[&["driver", "version"]]).unwrap_or_default(),
        temperature: number(
            metric,
            &[&["temperature", "edge"], &["temperature", "hotspot"]],
        ),
        utilization: Utilization {
            gpu: number(metric, &[&["usage", "gfx_activity"]]),
            memory: memory.utilization_percent(),
        },
        memory,
        power: PowerUsage {
            draw: number(
                metric,
                &[&["power", "socket_power"], &["power", "average_socket_power"]],
            ),
            limit: first_number(
                identity,
                &[&["limit", "max_power"], &["limit", "ppt0", "max_power_limit"]],
            )
            .or_else(|| first_number(metric, &[&["power", "power_limit"]]))
            .unwrap_or(0.0),
        },
        clocks: Clocks {
            graphics: number(metric, &[&["clock", "gfx_0", "clk"]]),
            memory: number(metric, &[&["clock", "mem_0", "clk"]]),
        },
        fan,
    }
}

pub struct AmdAdapter {
    runner: Arc<dyn CommandRunner>,
    tool: ToolConfig,
    timeout: Duration,
}

impl AmdAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &TelemetryConfig) -> Self {
        Self {
            runner,
            tool: config.amd.clone(),
            timeout: config.command_timeout,
        }
    }

    /// Device identity query.
    pub fn static_invocation(&self) -> ToolInvocation {
        ToolInvocation::new(self.tool.program.as_str(), self.timeout).args(["static", "--json"])
    }

    /// Live telemetry query.
    pub fn metric_invocation(&self) -> ToolInvocation {
        ToolInvocation::new(self.tool.program.as_str(), self.timeout).args(["metric", "--json"])
    }

    /// Query every GPU.
    ///
    /// The static query must succeed. A failed metric query degrades to
    /// static-only records with zeroed telemetry.
    #[instrument(skip(self), fields(tool = %self.tool.program))]
    pub async fn query(&self) -> Result<Vec<DeviceRecord>, QueryError> {
        let static_output = self
            .runner
            .run(&self.static_invocation())
            .await
            .map_err(|source| QueryError::Invocation {
                tool: self.tool.program.clone(),
                source,
            })?;
        let statics =
            parse_entries(&static_output.stdout).map_err(|e| QueryError::InvalidOutput {
                tool: self.tool.program.clone(),
                reason: format!("static query: {e}"),
            })?;

        let metrics = match self.query_metrics().await {
            Ok(metrics) => metrics,
            Err(defect) => {
                warn!(%defect, "Using static data only");
                Vec::new()
            }
        };

        let parsed = join_records(&statics, &metrics);
        parsed.log_defects(&self.tool.program);
        debug!(
            devices = parsed.records.len(),
            metric_entries = metrics.len(),
            "Joined amd-smi output"
        );
        Ok(parsed.records)
    }

    async fn query_metrics(&self) -> Result<Vec<Value>, Defect> {
        let partial = |reason: String| Defect::PartialDataUnavailable {
            tool: self.tool.program.clone(),
            reason,
        };

        let output = self
            .runner
            .run(&self.metric_invocation())
            .await
            .map_err(|e| partial(e.to_string()))?;
        parse_entries(&output.stdout).map_err(|e| partial(e.to_string()))
    }
}
