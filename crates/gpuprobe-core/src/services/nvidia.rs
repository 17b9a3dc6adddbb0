//! NVIDIA (`nvidia-smi`) adapter.
//!
//! `nvidia-smi --query-gpu=<fields> --format=csv,noheader,nounits` prints one
//! comma-separated line per GPU in the requested field order, without a
//! header and without units. Unsupported metrics come back as `N/A` or
//! `[Not Supported]`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::config::{TelemetryConfig, ToolConfig};
use crate::domain::{Clocks, DeviceRecord, FanSpeed, FanUnit, MemoryUsage, PowerUsage, Utilization};
use crate::error::{Defect, QueryError};
use crate::ports::{CommandRunner, ToolInvocation};
use crate::utils::{as_index, parse_number};

use super::Parsed;

/// Requested fields, in output column order.
pub const QUERY_FIELDS: [&str; 14] = [
    "index",
    "name",
    "driver_version",
    "temperature.gpu",
    "utilization.gpu",
    "utilization.memory",
    "memory.total",
    "memory.free",
    "memory.used",
    "power.draw",
    "power.limit",
    "clocks.gr",
    "clocks.mem",
    "fan.speed",
];

/// Output format argument.
pub const QUERY_FORMAT: &str = "--format=csv,noheader,nounits";

pub struct NvidiaAdapter {
    runner: Arc<dyn CommandRunner>,
    tool: ToolConfig,
    timeout: Duration,
}

impl NvidiaAdapter {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &TelemetryConfig) -> Self {
        Self {
            runner,
            tool: config.nvidia.clone(),
            timeout: config.command_timeout,
        }
    }

    /// The query invocation.
    pub fn invocation(&self) -> ToolInvocation {
        ToolInvocation::new(self.tool.program.as_str(), self.timeout)
            .arg(format!("--query-gpu={}", QUERY_FIELDS.join(",")))
            .arg(QUERY_FORMAT)
    }

    /// Query every GPU.
    ///
    /// Only invocation failure is an error; malformed lines and fields are
    /// absorbed.
    #[instrument(skip(self), fields(tool = %self.tool.program))]
    pub async fn query(&self) -> Result<Vec<DeviceRecord>, QueryError> {
        let output = self
            .runner
            .run(&self.invocation())
            .await
            .map_err(|source| QueryError::Invocation {
                tool: self.tool.program.clone(),
                source,
            })?;

        let parsed = parse_query_output(&output.stdout);
        parsed.log_defects(&self.tool.program);
        debug!(devices = parsed.records.len(), "Parsed nvidia-smi output");
        Ok(parsed.records)
    }
}

/// Parse the delimited query output.
///
/// Blank lines are ignored. A line with fewer than [`QUERY_FIELDS`] fields
/// is skipped as [`Defect::MalformedRecord`]; extra trailing fields are
/// ignored. Non-numeric fields become 0 and are reported as
/// [`Defect::ParseDefect`]. A line repeating an index already seen is
/// dropped as [`Defect::DuplicateIndex`], with its line number as position.
pub fn parse_query_output(text: &str) -> Parsed {
    let mut parsed = Parsed::default();
    let mut seen = HashSet::new();

    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < QUERY_FIELDS.len() {
            parsed.defects.push(Defect::MalformedRecord {
                line: line_no + 1,
                expected: QUERY_FIELDS.len(),
                found: fields.len(),
            });
            continue;
        }

        let record = parse_fields(&fields, &mut parsed.defects);
        if !seen.insert(record.index) {
            parsed.defects.push(Defect::DuplicateIndex {
                index: record.index,
                position: line_no + 1,
            });
            continue;
        }
        parsed.records.push(record);
    }

    parsed
}

fn parse_fields(fields: &[&str], defects: &mut Vec<Defect>) -> DeviceRecord {
    // fractional and negative values are not indices
    let index = parse_number(fields[0]).and_then(as_index).unwrap_or_else(|| {
        defects.push(Defect::ParseDefect {
            field: QUERY_FIELDS[0],
            raw: fields[0].to_string(),
        });
        0
    });

    let mut number = |column: usize| -> f64 {
        parse_number(fields[column]).unwrap_or_else(|| {
            defects.push(Defect::ParseDefect {
                field: QUERY_FIELDS[column],
                raw: fields[column].to_string(),
            });
            0.0
        })
    };

    let temperature = number(3);
    let utilization = Utilization {
        gpu: number(4),
        memory: number(5),
    };
    let memory = MemoryUsage {
        total: number(6),
        free: number(7),
        used: number(8),
    };
    let power = PowerUsage {
        draw: number(9),
        limit: number(10),
    };
    let clocks = Clocks {
        graphics: number(11),
        memory: number(12),
    };
    let fan = FanSpeed {
        speed: number(13),
        unit: FanUnit::Percent,
    };

    DeviceRecord {
        index,
        name: fields[1].to_string(),
        driver_version: fields[2].to_string(),
        temperature,
        utilization,
        memory,
        power,
        clocks,
        fan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CommandError;
    use crate::test_utils::FakeRunner;

    const RTX_4090: &str =
        "0, RTX 4090, 535.1, 45, 12, 3, 24576, 20000, 4576, 120.5, 450.0, 2500, 10000, 55";

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_parse_reference_line() {
        let parsed = parse_query_output(RTX_4090);
        assert!(parsed.defects.is_empty());
        assert_eq!(parsed.records.len(), 1);

        let gpu = &parsed.records[0];
        assert_eq!(gpu.index, 0);
        assert_eq!(gpu.name, "RTX 4090");
        assert_eq!(gpu.driver_version, "535.1");
        assert!(approx(gpu.temperature, 45.0));
        assert!(approx(gpu.utilization.gpu, 12.0));
        assert!(approx(gpu.utilization.memory, 3.0));
        assert!(approx(gpu.memory.total, 24576.0));
        assert!(approx(gpu.memory.free, 20000.0));
        assert!(approx(gpu.memory.used, 4576.0));
        assert!(approx(gpu.power.draw, 120.5));
        assert!(approx(gpu.power.limit, 450.0));
        assert!(approx(gpu.clocks.graphics, 2500.0));
        assert!(approx(gpu.clocks.memory, 10000.0));
        assert!(approx(gpu.fan.speed, 55.0));
        assert_eq!(gpu.fan.unit, FanUnit::Percent);
    }

    #[test]
    fn test_n_lines_yield_n_records_in_order() {
        let text = (0..4)
            .map(|i| {
                format!(
                    "{i}, GPU {i}, 550.54, 40, 0, 0, 81920, 81000, 920, 60.1, 700.0, 210, 2619, 0"
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let parsed = parse_query_output(&text);
        assert_eq!(parsed.records.len(), 4);
        for (i, record) in parsed.records.iter().enumerate() {
            assert_eq!(record.index as usize, i);
            assert_eq!(record.name, format!("GPU {i}"));
        }
    }

    #[test]
    fn test_not_available_field_degrades_to_zero() {
        let line = "1, Tesla T4, 535.1, 38, 0, 0, 15360, 15000, 360, 9.8, 70.0, 300, 5000, [N/A]";
        let parsed = parse_query_output(line);

        assert_eq!(parsed.records.len(), 1);
        let gpu = &parsed.records[0];
        assert_eq!(gpu.index, 1);
        assert_eq!(gpu.name, "Tesla T4");
        assert!(approx(gpu.fan.speed, 0.0));
        assert!(approx(gpu.power.draw, 9.8));
        assert_eq!(
            parsed.defects,
            vec![Defect::ParseDefect {
                field: "fan.speed",
                raw: "[N/A]".to_string()
            }]
        );
    }

    #[test]
    fn test_short_line_is_skipped_not_fatal() {
        let text = format!("{RTX_4090}\n1, Broken GPU, 535.1\n\n");
        let parsed = parse_query_output(&text);

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].name, "RTX 4090");
        assert_eq!(
            parsed.defects,
            vec![Defect::MalformedRecord {
                line: 2,
                expected: 14,
                found: 3
            }]
        );
    }

    #[test]
    fn test_empty_output_is_empty() {
        let parsed = parse_query_output("");
        assert!(parsed.records.is_empty());
        assert!(parsed.defects.is_empty());
    }

    #[test]
    fn test_crlf_lines() {
        let second = RTX_4090.replacen("0,", "1,", 1);
        let text = format!("{RTX_4090}\r\n{second}\r\n");
        let parsed = parse_query_output(&text);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].index, 1);
        assert!(approx(parsed.records[1].fan.speed, 55.0));
    }

    #[test]
    fn test_fractional_index_is_a_parse_defect() {
        let line = RTX_4090.replacen("0,", "1.5,", 1);
        let parsed = parse_query_output(&line);

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].index, 0);
        assert_eq!(
            parsed.defects,
            vec![Defect::ParseDefect {
                field: "index",
                raw: "1.5".to_string()
            }]
        );
    }

    #[test]
    fn test_repeated_index_keeps_first_line() {
        let unknown = RTX_4090.replacen("0, RTX 4090", "N/A, Ghost GPU", 1);
        let text = format!("{RTX_4090}\n{unknown}\n");
        let parsed = parse_query_output(&text);

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].name, "RTX 4090");
        assert_eq!(
            parsed.defects,
            vec![
                Defect::ParseDefect {
                    field: "index",
                    raw: "N/A".to_string()
                },
                Defect::DuplicateIndex {
                    index: 0,
                    position: 2
                },
            ]
        );
    }

    #[test]
    fn test_invocation_arguments() {
        let adapter = NvidiaAdapter::new(Arc::new(FakeRunner::new()), &TelemetryConfig::default());
        let inv = adapter.invocation();
        assert_eq!(inv.program, "nvidia-smi");
        assert_eq!(inv.args.len(), 2);
        assert!(inv.args[0].starts_with("--query-gpu=index,name,driver_version,"));
        assert!(inv.args[0].ends_with(",clocks.gr,clocks.mem,fan.speed"));
        assert_eq!(inv.args[1], "--format=csv,noheader,nounits");
    }

    #[tokio::test]
    async fn test_query_end_to_end() {
        let config = TelemetryConfig::default();
        let probe = NvidiaAdapter::new(Arc::new(FakeRunner::new()), &config);
        let line = probe.invocation().command_line();

        let runner = Arc::new(FakeRunner::new().respond(&line, RTX_4090));
        let adapter = NvidiaAdapter::new(runner, &config);

        let devices = adapter.query().await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "RTX 4090");
        assert!(approx(devices[0].memory.used, 4576.0));
    }

    #[tokio::test]
    async fn test_query_invocation_failure_is_error() {
        let config = TelemetryConfig::default();
        let line = NvidiaAdapter::new(Arc::new(FakeRunner::new()), &config)
            .invocation()
            .command_line();
        let runner = Arc::new(FakeRunner::new().fail(
            &line,
            CommandError::Failed {
                program: "nvidia-smi".to_string(),
                code: Some(9),
                stderr: "NVIDIA-SMI has failed because it couldn't communicate with the NVIDIA driver".to_string(),
            },
        ));

        let err = NvidiaAdapter::new(runner, &config).query().await.unwrap_err();
        assert!(matches!(err, QueryError::Invocation { .. }));
        assert!(err.to_string().contains("nvidia-smi query failed"));
    }
}
