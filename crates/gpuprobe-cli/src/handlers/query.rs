//! Query command handler.

use anyhow::Result;
use gpuprobe_axum::dto::TelemetryResponseDto;

use crate::bootstrap::CliContext;

/// Poll once and print the envelope to stdout.
///
/// Returns whether the poll succeeded (no `error` in the envelope).
pub async fn execute(ctx: &CliContext, pretty: bool) -> Result<bool> {
    let report = ctx.telemetry().collect().await;
    let ok = !report.is_error();
    println!("{}", render(&report.into(), pretty)?);
    Ok(ok)
}

fn render(dto: &TelemetryResponseDto, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(dto)?
    } else {
        serde_json::to_string(dto)?
    };
    Ok(json)
}
