use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client_ip::{UNKNOWN_CLIENT, resolve_client_identity};
use crate::config::RateLimiterConfig;
use crate::error::ApiError;
use crate::metrics::RATE_LIMITED_TOTAL;
use crate::registry::ClientRegistry;
use crate::state::AppState;

const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

// Admission decision handed back to the request pipeline.
// Allow carries the tokens left right after this admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow { remaining: u32 },
    Deny,
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow { .. })
    }
}

// Per-client token bucket limiter. The evictor sweeps the registry it shares.
pub struct RateLimiter {
    config: RateLimiterConfig,
    registry: Arc<ClientRegistry>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig, registry: Arc<ClientRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    // Consume one token from identity's bucket. Only blocks on the shard lock.
    pub fn admit(&self, identity: &str) -> Verdict {
        if !self.config.enabled {
            return Verdict::Allow {
                remaining: self.config.burst,
            };
        }

        let identity = match identity.trim() {
            "" => UNKNOWN_CLIENT,
            trimmed => trimmed,
        };

        // remaining is read under the same guard as the admission
        let mut entry = self.registry.get_or_create(identity);
        let bucket = entry.bucket();
        if bucket.try_admit() {
            Verdict::Allow {
                remaining: bucket.remaining(),
            }
        } else {
            Verdict::Deny
        }
    }

    // Tokens left for a client; unseen clients have a full bucket
    pub fn remaining(&self, identity: &str) -> u32 {
        self.registry
            .remaining(identity)
            .unwrap_or(self.config.burst)
    }

    // Time until a drained bucket earns its next token
    pub fn retry_after(&self) -> Duration {
        self.config.token_interval()
    }

    pub fn tracked_clients(&self) -> usize {
        self.registry.len()
    }
}

// Rate limit middleware - runs before routing, answers 429 on deny
pub async fn rate_limit(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let limiter = &state.limiter;
    if !limiter.is_enabled() {
        return next.run(req).await;
    }

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let identity = resolve_client_identity(req.headers(), peer);

    match limiter.admit(&identity) {
        Verdict::Allow { remaining } => {
            let mut response = next.run(req).await;
            response
                .headers_mut()
                .insert(REMAINING_HEADER, HeaderValue::from(remaining));
            response
        }
        Verdict::Deny => {
            RATE_LIMITED_TOTAL.inc();
            debug!(client = %identity, "rate limit exceeded");
            ApiError::RateLimitExceeded {
                retry_after: limiter.retry_after(),
            }
            .into_response()
        }
    }
}
