//! Fake port implementations for tests.
//!
//! Enabled for this crate's unit tests and, through the `test-utils`
//! feature, for downstream integration tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::CpuSummary;
use crate::ports::{CommandError, CommandOutput, CommandRunner, CpuProbePort, ToolInvocation};

/// A [`CommandRunner`] answering from a table keyed by command line.
///
/// Unknown command lines fail with [`CommandError::NotFound`], which is what
/// a missing tool looks like.
#[derive(Debug, Default)]
pub struct FakeRunner {
    responses: HashMap<String, Result<CommandOutput, CommandError>>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command_line` with `stdout` and a zero exit status.
    #[must_use]
    pub fn respond(mut self, command_line: &str, stdout: &str) -> Self {
        self.responses.insert(
            command_line.to_string(),
            Ok(CommandOutput::from_stdout(stdout)),
        );
        self
    }

    /// Answer `command_line` with an error.
    #[must_use]
    pub fn fail(mut self, command_line: &str, error: CommandError) -> Self {
        self.responses.insert(command_line.to_string(), Err(error));
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().iter().map(|(line, _)| line.clone()).collect()
    }

    /// Timeouts carried by each invocation, in order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.lock().iter().map(|(_, timeout)| *timeout).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Duration)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<CommandOutput, CommandError> {
        let line = invocation.command_line();
        self.lock().push((line.clone(), invocation.timeout));
        self.responses
            .get(&line)
            .cloned()
            .unwrap_or_else(|| {
                Err(CommandError::NotFound {
                    program: invocation.program.clone(),
                })
            })
    }
}

/// A [`CpuProbePort`] returning a fixed summary.
#[derive(Debug, Clone, Default)]
pub struct FixedCpuProbe(pub Option<CpuSummary>);

impl FixedCpuProbe {
    /// A plausible desktop CPU.
    pub fn desktop() -> Self {
        Self(Some(CpuSummary {
            name: "AMD Ryzen 9 7950X 16-Core Processor".to_string(),
            cores: 16,
            threads: 32,
            speed_mhz: 4500,
            temperature: Some(47.5),
            usage_percent: Some(3.2),
        }))
    }
}

impl CpuProbePort for FixedCpuProbe {
    fn probe(&self) -> Option<CpuSummary> {
        self.0.clone()
    }
}
