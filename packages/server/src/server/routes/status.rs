use axum::{extract::Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct StatusResponse {
    status: String,
    version: String,
    active_providers: usize,
    extraction: ExtractionStatus,
}

#[derive(Serialize)]
pub struct ExtractionStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    last_sweep: Option<DateTime<Utc>>,
    runs_completed: u64,
    files_uploaded: u64,
}

/// Application status document: package version, provider count, and
/// extraction sweep counters.
pub async fn status_handler(Extension(state): Extension<AppState>) -> Json<StatusResponse> {
    let deps = &state.server_deps;
    let active_providers = deps
        .catalog
        .active_providers()
        .await
        .map(|providers| providers.len())
        .unwrap_or(0);

    Json(StatusResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_providers,
        extraction: ExtractionStatus {
            last_sweep: deps.scheduler_state.last_tick(),
            runs_completed: deps.scheduler_state.runs_completed(),
            files_uploaded: deps.scheduler_state.files_uploaded(),
        },
    })
}
