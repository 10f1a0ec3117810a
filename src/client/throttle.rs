use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Tracks the SMSC's throttle responses and decides when to pause
/// outbound traffic.
///
/// The reader reports every submit_sm_resp outcome (`throttled` for
/// ESME_RTHROTTLED and ESME_RMSGQFUL, `not_throttled` otherwise). The
/// dispatcher consults `allow_request` immediately before each send, after
/// the rate limiter, and parks for `throttle_delay` whenever it is denied.
#[async_trait]
pub trait ThrottleHandler: Send + Sync {
    /// Record a throttle response.
    async fn throttled(&self);

    /// Record a non-throttle response.
    async fn not_throttled(&self);

    /// How long the dispatcher should wait after a denial before
    /// re-checking.
    async fn throttle_delay(&self) -> Duration;

    /// Whether a send may proceed right now.
    async fn allow_request(&self) -> bool;
}

/// Default handler: a sliding window of response outcomes.
///
/// Requests are denied once the window holds at least `sample_size`
/// observations and the throttled share exceeds `deny_request_at`
/// percent. Observations age out of the window after `sampling_period`,
/// so traffic resumes one full period after the SMSC stops throttling.
#[derive(Debug)]
pub struct SlidingWindowThrottle {
    sampling_period: Duration,
    sample_size: usize,
    deny_request_at: f64,
    window: Mutex<VecDeque<(Instant, bool)>>,
}

impl SlidingWindowThrottle {
    pub fn new(sampling_period: Duration, sample_size: usize, deny_request_at: f64) -> Self {
        Self {
            sampling_period,
            sample_size,
            deny_request_at,
            window: Mutex::new(VecDeque::new()),
        }
    }

    fn observe(&self, throttled: bool) {
        let mut window = self.window.lock();
        let now = Instant::now();
        window.push_back((now, throttled));
        Self::prune(&mut window, now, self.sampling_period);
    }

    fn prune(window: &mut VecDeque<(Instant, bool)>, now: Instant, period: Duration) {
        while let Some(&(at, _)) = window.front() {
            if now.duration_since(at) > period {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Share of throttle responses in the current window, in percent,
    /// together with the number of observations.
    fn throttle_share(&self) -> (f64, usize) {
        let mut window = self.window.lock();
        Self::prune(&mut window, Instant::now(), self.sampling_period);
        let total = window.len();
        if total == 0 {
            return (0.0, 0);
        }
        let throttled = window.iter().filter(|&&(_, t)| t).count();
        (throttled as f64 * 100.0 / total as f64, total)
    }
}

impl Default for SlidingWindowThrottle {
    /// 180 second window, 50 samples minimum, deny above 1 percent.
    fn default() -> Self {
        Self::new(Duration::from_secs(180), 50, 1.0)
    }
}

#[async_trait]
impl ThrottleHandler for SlidingWindowThrottle {
    async fn throttled(&self) {
        self.observe(true);
        let (share, observed) = self.throttle_share();
        tracing::info!(
            throttle_share = share,
            observed,
            "SMSC throttle response recorded"
        );
    }

    async fn not_throttled(&self) {
        self.observe(false);
    }

    async fn throttle_delay(&self) -> Duration {
        let (share, _) = self.throttle_share();
        // Back off harder the larger the throttled share.
        let factor = (share / self.deny_request_at).ceil().clamp(1.0, 60.0);
        Duration::from_secs_f64(factor)
    }

    async fn allow_request(&self) -> bool {
        let (share, observed) = self.throttle_share();
        if observed >= self.sample_size && share > self.deny_request_at {
            tracing::warn!(
                throttle_share = share,
                observed,
                deny_request_at = self.deny_request_at,
                "outbound denied: throttle share over threshold"
            );
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn allows_until_sample_size_reached() {
        let throttle = SlidingWindowThrottle::new(Duration::from_secs(180), 50, 1.0);

        // heavy throttling, but below the minimum sample size
        for _ in 0..49 {
            throttle.throttled().await;
        }
        assert!(throttle.allow_request().await);

        throttle.throttled().await;
        assert!(!throttle.allow_request().await);
    }

    #[tokio::test(start_paused = true)]
    async fn fifty_percent_throttled_denies() {
        let throttle = SlidingWindowThrottle::new(Duration::from_secs(180), 50, 10.0);

        for i in 0..60 {
            if i % 2 == 0 {
                throttle.throttled().await;
            } else {
                throttle.not_throttled().await;
            }
        }

        assert!(!throttle.allow_request().await);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_window_ages_out() {
        let throttle = SlidingWindowThrottle::new(Duration::from_secs(180), 10, 1.0);

        for _ in 0..20 {
            throttle.throttled().await;
        }
        assert!(!throttle.allow_request().await);

        tokio::time::advance(Duration::from_secs(181)).await;
        assert!(throttle.allow_request().await);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_grows_with_share() {
        let throttle = SlidingWindowThrottle::new(Duration::from_secs(180), 10, 1.0);

        throttle.not_throttled().await;
        let quiet = throttle.throttle_delay().await;

        for _ in 0..10 {
            throttle.throttled().await;
        }
        let loud = throttle.throttle_delay().await;

        assert!(quiet < loud);
        assert!(loud <= Duration::from_secs(60));
    }
}
