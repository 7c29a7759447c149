use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

use crate::error::ApiError;
use crate::metrics::LIMITER_CLIENTS;
use crate::state::AppState;

// Prometheus scrape endpoint
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    LIMITER_CLIENTS.set(state.limiter.tracked_clients() as i64);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("encoding metrics: {e}")))?;

    let body = String::from_utf8(buffer)
        .map_err(|e| ApiError::Internal(format!("metrics are not utf-8: {e}")))?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}
