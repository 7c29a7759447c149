use axum::{Router, middleware, routing::get};
use std::sync::Arc;

use crate::handlers::{healthcheck_handler, metrics_handler, not_found_handler};
use crate::metrics::track_metrics;
use crate::rate_limit::rate_limit;
use crate::state::AppState;

// Every route, the fallback included, sits behind the rate limiter.
// Metrics wrap the limiter so denied requests are counted too.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/healthcheck", get(healthcheck_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimiterConfig;
    use crate::models::{ErrorResponse, HealthResponse};
    use crate::rate_limit::RateLimiter;
    use crate::registry::ClientRegistry;
    use axum::{
        body::{Body, to_bytes},
        extract::ConnectInfo,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use std::net::SocketAddr;
    use tower::ServiceExt;

    fn test_app(burst: u32, enabled: bool) -> Router {
        let config = RateLimiterConfig::new(0.001, burst, enabled).unwrap();
        let registry = Arc::new(ClientRegistry::new(&config));
        app(Arc::new(AppState {
            limiter: RateLimiter::new(config, registry),
            environment: "testing".to_string(),
            version: "0.0.0-test",
        }))
    }

    fn get_from(uri: &str, client: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-forwarded-for", client)
            .body(Body::empty())
            .unwrap()
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthcheck_reports_environment() {
        let response = test_app(4, true)
            .oneshot(get_from("/v1/healthcheck", "203.0.113.1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: HealthResponse = json(response).await;
        assert_eq!(body.status, "available");
        assert_eq!(body.system_info.environment, "testing");
        assert_eq!(body.system_info.version, "0.0.0-test");
    }

    #[tokio::test]
    async fn fifth_burst_request_gets_429() {
        let app = test_app(4, true);

        for remaining in (0..4).rev() {
            let response = app
                .clone()
                .oneshot(get_from("/v1/healthcheck", "203.0.113.9"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                response.headers()["x-ratelimit-remaining"],
                remaining.to_string().as_str()
            );
        }

        let response = app
            .clone()
            .oneshot(get_from("/v1/healthcheck", "203.0.113.9"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        let body: ErrorResponse = json(response).await;
        assert_eq!(body.error, "rate limit exceeded");

        // another client is unaffected
        let response = app
            .oneshot(get_from("/v1/healthcheck", "198.51.100.3"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn peer_address_used_without_proxy_headers() {
        let app = test_app(1, true);
        let from_peer = |addr: &str| {
            let mut req = Request::builder()
                .uri("/v1/healthcheck")
                .body(Body::empty())
                .unwrap();
            req.extensions_mut()
                .insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
            req
        };

        let first = app.clone().oneshot(from_peer("192.0.2.1:1000")).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        // same host, different source port
        let second = app.clone().oneshot(from_peer("192.0.2.1:2000")).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

        let other = app.oneshot(from_peer("192.0.2.2:1000")).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn disabled_limiter_never_rejects() {
        let app = test_app(1, false);
        for _ in 0..50 {
            let response = app
                .clone()
                .oneshot(get_from("/v1/healthcheck", "203.0.113.4"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn unknown_route_is_limited_and_404s() {
        let app = test_app(1, true);

        let response = app
            .clone()
            .oneshot(get_from("/v1/movies", "203.0.113.5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = json(response).await;
        assert_eq!(body.error, "the requested resource could not be found");

        let response = app
            .oneshot(get_from("/v1/movies", "203.0.113.5"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_counters() {
        let app = test_app(4, true);
        app.clone()
            .oneshot(get_from("/v1/healthcheck", "203.0.113.6"))
            .await
            .unwrap();

        let response = app
            .oneshot(get_from("/metrics", "203.0.113.6"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("greenlight_requests_total"));
        assert!(text.contains("greenlight_limiter_clients"));
    }
}
