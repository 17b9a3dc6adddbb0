//! `CommandRunner` implementation on top of `tokio::process`.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use gpuprobe_core::ports::{CommandError, CommandOutput, CommandRunner, ToolInvocation};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::shutdown::terminate_child;

/// Runs tool invocations as child processes.
///
/// Children are spawned with `kill_on_drop`, so dropping the `run` future
/// (request cancelled) kills them. On timeout the child gets SIGTERM, then
/// SIGKILL once the grace period has passed.
#[derive(Debug, Clone)]
pub struct TokioCommandRunner {
    termination_grace: Duration,
}

impl TokioCommandRunner {
    /// Time between SIGTERM and SIGKILL for an overdue child.
    pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_millis(500);

    pub const fn new() -> Self {
        Self {
            termination_grace: Self::DEFAULT_TERMINATION_GRACE,
        }
    }

    #[must_use]
    pub const fn with_termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    pub const fn termination_grace(&self) -> Duration {
        self.termination_grace
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<CommandOutput, CommandError> {
        let program = invocation.program.clone();
        debug!(command = %invocation, timeout = ?invocation.timeout, "Running tool");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&program, &e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = timeout(invocation.timeout, async {
            let (stdout, stderr, status) =
                tokio::join!(read_stream(stdout), read_stream(stderr), child.wait());
            status.map(|status| (status, stdout, stderr))
        })
        .await;

        match outcome {
            Ok(Ok((status, stdout, stderr))) if status.success() => {
                Ok(CommandOutput { stdout, stderr })
            }
            Ok(Ok((status, _, stderr))) => Err(CommandError::Failed {
                program,
                code: status.code(),
                stderr: stderr.trim().to_string(),
            }),
            Ok(Err(e)) => Err(CommandError::Spawn {
                program,
                reason: e.to_string(),
            }),
            Err(_) => {
                warn!(command = %invocation, timeout = ?invocation.timeout, "Tool timed out, terminating");
                if let Err(e) = terminate_child(&mut child, self.termination_grace).await {
                    warn!(command = %invocation, error = %e, "Failed to terminate tool");
                }
                Err(CommandError::TimedOut {
                    program,
                    timeout: invocation.timeout,
                })
            }
        }
    }
}

fn spawn_error(program: &str, error: &io::Error) -> CommandError {
    match error.kind() {
        io::ErrorKind::NotFound => CommandError::NotFound {
            program: program.to_string(),
        },
        _ => CommandError::Spawn {
            program: program.to_string(),
            reason: error.to_string(),
        },
    }
}

/// Drain a child stream to a string. Invalid UTF-8 is replaced, not rejected.
async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!(error = %e, "Failed to read child output");
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
