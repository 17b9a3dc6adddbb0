//! Telemetry handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::dto::TelemetryResponseDto;
use crate::state::AppState;

/// Poll GPU telemetry.
///
/// Always returns the envelope. The status is 500 when the envelope carries
/// an error; no GPU tooling is a normal 200 with the CPU summary.
pub async fn gpu(State(state): State<AppState>) -> (StatusCode, Json<TelemetryResponseDto>) {
    let report = state.telemetry.collect().await;
    let status = if report.is_error() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(report.into()))
}
