use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Admission control in front of every outbound send.
///
/// `acquire` suspends the dispatcher until a send is permitted. The
/// default is a token bucket; anything honoring the same contract can be
/// plugged in (a shared limiter, a no-op for test harnesses).
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until one send is admitted.
    async fn acquire(&self);
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    refilled_at: Instant,
}

/// Token-bucket limiter: `send_rate` tokens per second, capacity
/// `max_tokens`, waiting `delay_for_tokens` between attempts when empty.
#[derive(Debug)]
pub struct TokenBucket {
    send_rate: f64,
    max_tokens: f64,
    delay_for_tokens: Duration,
    state: tokio::sync::Mutex<BucketState>,
}

impl TokenBucket {
    /// A bucket admitting `send_rate` sends per second, with capacity
    /// equal to one second of sends and a 1s wait between refill checks.
    pub fn new(send_rate: f64) -> Self {
        Self::with_options(send_rate, send_rate, Duration::from_secs(1))
    }

    pub fn with_options(send_rate: f64, max_tokens: f64, delay_for_tokens: Duration) -> Self {
        Self {
            send_rate,
            max_tokens,
            delay_for_tokens,
            state: tokio::sync::Mutex::new(BucketState {
                tokens: max_tokens,
                refilled_at: Instant::now(),
            }),
        }
    }

    pub fn send_rate(&self) -> f64 {
        self.send_rate
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        let mut waited = Duration::ZERO;
        loop {
            {
                let mut state = self.state.lock().await;
                let elapsed = state.refilled_at.elapsed();
                state.tokens =
                    (state.tokens + elapsed.as_secs_f64() * self.send_rate).min(self.max_tokens);
                state.refilled_at = Instant::now();

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    if !waited.is_zero() {
                        tracing::debug!(
                            send_rate = self.send_rate,
                            delay_secs = waited.as_secs_f64(),
                            "send admitted after rate-limit delay"
                        );
                    }
                    return;
                }
            }

            tracing::info!(
                send_rate = self.send_rate,
                delay_secs = self.delay_for_tokens.as_secs_f64(),
                "rate limit reached, waiting for tokens"
            );
            tokio::time::sleep(self.delay_for_tokens).await;
            waited += self.delay_for_tokens;
        }
    }
}

/// Limiter that admits everything. Useful when the SMSC contract has no
/// rate cap or an external system already shapes traffic.
#[derive(Debug, Default)]
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn acquire(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_up_to_capacity_is_immediate() {
        let bucket = TokenBucket::new(10.0);
        let started = Instant::now();
        for _ in 0..10 {
            bucket.acquire().await;
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_bucket_waits_for_refill() {
        let bucket = TokenBucket::with_options(1.0, 1.0, Duration::from_millis(100));
        bucket.acquire().await;

        let started = Instant::now();
        bucket.acquire().await;
        let waited = started.elapsed();
        assert!(
            waited >= Duration::from_millis(100),
            "waited only {waited:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_rate_stays_near_limit() {
        let rate = 50.0;
        let bucket = TokenBucket::new(rate);

        let started = Instant::now();
        let sends = 500usize;
        for _ in 0..sends {
            bucket.acquire().await;
        }
        let elapsed = started.elapsed().as_secs_f64();
        let observed = sends as f64 / elapsed;

        // The initial burst is one bucket; over 10 seconds the moving
        // average must stay within 5% of the configured rate.
        assert!(elapsed >= 8.0, "finished suspiciously fast: {elapsed}s");
        assert!(
            observed <= rate * 1.05 * (1.0 + 1.0 / elapsed),
            "observed {observed} sends/s against a limit of {rate}"
        );
    }
}
