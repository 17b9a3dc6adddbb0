//! CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use gpuprobe_cli::{Cli, CliConfig, Commands, bootstrap, handlers};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env before parsing so clap `env` fallbacks see it
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command.as_ref() else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = CliConfig::resolve(&cli)?;
    tracing::debug!(telemetry = ?config.telemetry, "Resolved configuration");

    match command {
        Commands::Query { pretty } => {
            let ctx = bootstrap(&config)?;
            if !handlers::query::execute(&ctx, *pretty).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Serve {
            port,
            allowed_origins,
        } => {
            handlers::serve::execute(&config, *port, allowed_origins.clone()).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
