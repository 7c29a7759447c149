use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};
use std::time::Instant;

lazy_static! {
    pub static ref REQUESTS_TOTAL: IntCounter =
        register_int_counter!("greenlight_requests_total", "Total number of requests received").unwrap();
    pub static ref RESPONSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "greenlight_responses_total",
        "Total responses sent, by status code",
        &["status"]
    )
    .unwrap();
    pub static ref REQUEST_DURATION: Histogram = register_histogram!(
        "greenlight_request_duration_seconds",
        "Request processing time in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: IntCounter =
        register_int_counter!("greenlight_rate_limited_total", "Requests denied by the rate limiter").unwrap();
    pub static ref LIMITER_CLIENTS: IntGauge =
        register_int_gauge!("greenlight_limiter_clients", "Clients currently tracked by the rate limiter").unwrap();
    pub static ref EVICTED_TOTAL: IntCounter =
        register_int_counter!("greenlight_limiter_evicted_total", "Idle clients evicted from the rate limiter").unwrap();
}

// Outermost middleware - counts every request, including rate limited ones
pub async fn track_metrics(req: Request, next: Next) -> Response {
    REQUESTS_TOTAL.inc();
    let start_time = Instant::now();

    let response = next.run(req).await;

    REQUEST_DURATION.observe(start_time.elapsed().as_secs_f64());
    RESPONSES_TOTAL
        .with_label_values(&[response.status().as_str()])
        .inc();

    response
}
