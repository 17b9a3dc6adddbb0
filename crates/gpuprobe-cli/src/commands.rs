//! Main commands enum.

use clap::Subcommand;
use gpuprobe_axum::bootstrap::DEFAULT_PORT;

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Poll GPU telemetry once and print the JSON envelope
    Query {
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Serve telemetry over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "GPUPROBE_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Restrict CORS to these origins (comma-separated); all origins when omitted
        #[arg(long = "allow-origin", value_delimiter = ',')]
        allowed_origins: Vec<String>,
    },
}
