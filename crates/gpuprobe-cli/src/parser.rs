//! Main CLI parser and top-level argument handling.

use clap::Parser;

use crate::commands::Commands;

/// Normalized GPU telemetry from vendor tools.
#[derive(Parser)]
#[command(name = "gpuprobe")]
#[command(about = "Normalized GPU telemetry from nvidia-smi and amd-smi")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// NVIDIA tool program or path
    #[arg(long = "nvidia-smi", global = true)]
    pub nvidia_smi: Option<String>,

    /// AMD tool program or path
    #[arg(long = "amd-smi", global = true)]
    pub amd_smi: Option<String>,

    /// Per-invocation timeout for vendor tools, in milliseconds
    #[arg(long = "timeout-ms", global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from([
            "gpuprobe",
            "--verbose",
            "--nvidia-smi",
            "/opt/bin/nvidia-smi",
            "query",
            "--timeout-ms",
            "2500",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.nvidia_smi.as_deref(), Some("/opt/bin/nvidia-smi"));
        assert!(cli.amd_smi.is_none());
        assert_eq!(cli.timeout_ms, Some(2500));
        assert!(matches!(cli.command, Some(Commands::Query { pretty: false })));
    }

    #[test]
    fn test_no_command() {
        let cli = Cli::parse_from(["gpuprobe"]);
        assert!(cli.command.is_none());
    }
}
