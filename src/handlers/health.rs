use axum::{Json, extract::State};
use std::sync::Arc;

use crate::models::{HealthResponse, SystemInfo};
use crate::state::AppState;

pub async fn healthcheck_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "available".to_string(),
        system_info: SystemInfo {
            environment: state.environment.clone(),
            version: state.version.to_string(),
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
