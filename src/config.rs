use clap::Parser;
use std::time::Duration;
use thiserror::Error;

// CLI argument structure. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "greenlight-gateway", version)]
#[command(about = "Rate limiting front door for the Greenlight movie API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 4000)]
    pub port: u16,

    // Environment (development|staging|production)
    #[arg(short, long, env = "APP_ENV", default_value = "development")]
    pub env: String,

    // Rate limiter sustained requests per second (refill rate)
    #[arg(long, env = "LIMITER_RPS", default_value_t = 2.0)]
    pub limiter_rps: f64,

    // Rate limiter maximum burst (bucket capacity)
    #[arg(long, env = "LIMITER_BURST", default_value_t = 4)]
    pub limiter_burst: u32,

    // Enable rate limiter
    #[arg(long, env = "LIMITER_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub limiter_enabled: bool,

    // Seconds between eviction sweeps
    #[arg(long, env = "LIMITER_SWEEP_INTERVAL", default_value_t = 60)]
    pub limiter_sweep_interval: u64,

    // Seconds a client may stay idle before its bucket is dropped
    #[arg(long, env = "LIMITER_MAX_IDLE", default_value_t = 180)]
    pub limiter_max_idle: u64,
}

impl Args {
    pub fn rate_limiter_config(&self) -> Result<RateLimiterConfig, ConfigError> {
        RateLimiterConfig::new(self.limiter_rps, self.limiter_burst, self.limiter_enabled)
    }

    pub fn eviction_config(&self, limiter: &RateLimiterConfig) -> Result<EvictionConfig, ConfigError> {
        EvictionConfig::new(
            Duration::from_secs(self.limiter_sweep_interval),
            Duration::from_secs(self.limiter_max_idle),
            limiter,
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("limiter-rps must be a positive number, got {0}")]
    InvalidRate(f64),

    #[error("limiter-rps {0} is too small, refill time would overflow")]
    RateTooSmall(f64),

    #[error("limiter-burst must be at least 1")]
    ZeroBurst,

    #[error("limiter-sweep-interval must be at least 1 second")]
    ZeroSweepInterval,

    #[error("limiter-max-idle ({max_idle:?}) must be longer than a full refill ({refill:?})")]
    IdleTooShort { max_idle: Duration, refill: Duration },
}

// Token bucket settings shared read-only by every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterConfig {
    pub requests_per_second: f64,
    pub burst: u32,
    pub enabled: bool,
}

impl RateLimiterConfig {
    pub fn new(requests_per_second: f64, burst: u32, enabled: bool) -> Result<Self, ConfigError> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(ConfigError::InvalidRate(requests_per_second));
        }
        if burst == 0 {
            return Err(ConfigError::ZeroBurst);
        }
        // burst >= 1, so this also bounds the single-token interval
        if Duration::try_from_secs_f64(f64::from(burst) / requests_per_second).is_err() {
            return Err(ConfigError::RateTooSmall(requests_per_second));
        }

        Ok(Self {
            requests_per_second,
            burst,
            enabled,
        })
    }

    // Time for a drained bucket to become full again
    pub fn full_refill(&self) -> Duration {
        Duration::try_from_secs_f64(f64::from(self.burst) / self.requests_per_second)
            .unwrap_or(Duration::MAX)
    }

    // Time for an empty bucket to earn its next token
    pub fn token_interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.requests_per_second).unwrap_or(Duration::MAX)
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst: 4,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvictionConfig {
    pub sweep_interval: Duration,
    pub max_idle: Duration,
}

impl EvictionConfig {
    // Dropping a bucket before it could have refilled would hand the client
    // a fresh burst early, so max_idle must outlast a full refill.
    pub fn new(
        sweep_interval: Duration,
        max_idle: Duration,
        limiter: &RateLimiterConfig,
    ) -> Result<Self, ConfigError> {
        if sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        let refill = limiter.full_refill();
        if max_idle <= refill {
            return Err(ConfigError::IdleTooShort { max_idle, refill });
        }

        Ok(Self {
            sweep_interval,
            max_idle,
        })
    }
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
            max_idle: Duration::from_secs(180),
        }
    }
}
