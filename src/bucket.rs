use tokio::time::Instant;

// Token bucket for a single client.
// Refill is computed lazily on every check, so no per-bucket timer exists.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64, // tokens per second
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    // New buckets start full
    pub fn new(capacity: u32, refill_rate: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).clamp(0.0, self.capacity);
        self.last_refill = now;
    }

    // Take one token if available. A denied check only applies the refill.
    pub fn try_admit(&mut self) -> bool {
        self.try_admit_at(Instant::now())
    }

    pub fn try_admit_at(&mut self, now: Instant) -> bool {
        self.refill(now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return true;
        }

        false
    }

    // Whole tokens available right now, without consuming one
    pub fn remaining(&mut self) -> u32 {
        self.refill(Instant::now());
        self.tokens.floor() as u32
    }
}
