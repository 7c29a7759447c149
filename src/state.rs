use crate::rate_limit::RateLimiter;

// app's shared state
pub struct AppState {
    pub limiter: RateLimiter,
    pub environment: String,       // development|staging|production
    pub version: &'static str,
}
