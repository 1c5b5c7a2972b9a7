//! Token-rate limiting.
//!
//! The driver adds every step's prompt tokens to a [`TokenWindow`] and asks
//! the [`RateLimitPolicy`] how long to cool down before the next step. The
//! window rolls over once it is older than the policy's window length.

use opsclaw_config::RateLimitConfig;
use std::time::Duration;
use tokio::time::Instant;

const MINUTE_MS: f64 = 60_000.0;

/// Shortest cooldown, used while the window is too young to extrapolate.
pub const MIN_COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitPolicy {
    /// Prompt tokens allowed per minute
    pub tokens_per_minute: u64,

    /// Rolling window length
    pub window: Duration,

    /// Fraction of the budget at which cooldown kicks in
    pub threshold: f64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}

impl RateLimitPolicy {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            tokens_per_minute: config.tokens_per_minute,
            window: Duration::from_millis(config.window_ms),
            threshold: config.threshold,
        }
    }

    /// Tokens per minute if the window's rate so far continued.
    ///
    /// Infinite when tokens arrived in a zero-length window.
    pub fn projected_tpm(&self, tokens: u64, elapsed: Duration) -> f64 {
        if tokens == 0 {
            return 0.0;
        }
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        if elapsed_ms == 0.0 {
            return f64::INFINITY;
        }
        tokens as f64 * MINUTE_MS / elapsed_ms
    }

    /// Whether the projected rate is past the trigger threshold.
    pub fn is_triggered(&self, tokens: u64, elapsed: Duration) -> bool {
        self.projected_tpm(tokens, elapsed) > self.tokens_per_minute as f64 * self.threshold
    }

    /// How long to pause given `tokens` used over `elapsed` of the window.
    ///
    /// Zero below the trigger. Past it: [`MIN_COOLDOWN`] when less than a
    /// second has elapsed, otherwise the rest of the window if the budget
    /// would run out before the window closes, otherwise zero.
    pub fn cooldown(&self, tokens: u64, elapsed: Duration) -> Duration {
        if !self.is_triggered(tokens, elapsed) {
            return Duration::ZERO;
        }
        if elapsed < MIN_COOLDOWN {
            return MIN_COOLDOWN;
        }

        let tokens_per_ms = tokens as f64 / (elapsed.as_secs_f64() * 1000.0);
        let exhausted_at_ms = self.tokens_per_minute as f64 / tokens_per_ms;
        if exhausted_at_ms < self.window.as_secs_f64() * 1000.0 {
            self.window.saturating_sub(elapsed)
        } else {
            Duration::ZERO
        }
    }
}

/// Prompt tokens accumulated since the window started.
#[derive(Debug, Clone)]
pub struct TokenWindow {
    tokens: u64,
    started_at: Instant,
}

impl Default for TokenWindow {
    fn default() -> Self {
        Self::starting_at(Instant::now())
    }
}

impl TokenWindow {
    pub fn starting_at(started_at: Instant) -> Self {
        Self {
            tokens: 0,
            started_at,
        }
    }

    pub fn tokens(&self) -> u64 {
        self.tokens
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    /// Add `tokens`, first rolling the window over if it has expired.
    pub fn record(&mut self, tokens: u64, now: Instant, window: Duration) {
        self.reset_if_expired(now, window);
        self.tokens = self.tokens.saturating_add(tokens);
    }

    /// Zero the count and restamp the start.
    pub fn reset(&mut self, now: Instant) {
        self.tokens = 0;
        self.started_at = now;
    }

    /// Reset when more than `window` has elapsed. Returns whether it did.
    pub fn reset_if_expired(&mut self, now: Instant, window: Duration) -> bool {
        if self.elapsed(now) > window {
            self.reset(now);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn defaults() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.tokens_per_minute, 80_000);
        assert_eq!(policy.window, ms(60_000));
        assert_eq!(policy.threshold, 0.8);
    }

    #[test]
    fn projection_extrapolates_to_a_minute() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.projected_tpm(1_000, ms(30_000)), 2_000.0);
        assert_eq!(policy.projected_tpm(0, ms(0)), 0.0);
        assert!(policy.projected_tpm(5, ms(0)).is_infinite());
    }

    #[test]
    fn no_cooldown_below_budget() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.cooldown(1_000, ms(30_000)), Duration::ZERO);
        assert_eq!(policy.cooldown(0, ms(10)), Duration::ZERO);
        // 75k/min is over the 80% trigger but under budget: no exhaustion in-window
        assert_eq!(policy.cooldown(45_000, ms(36_000)), Duration::ZERO);
    }

    #[test]
    fn young_window_waits_one_second() {
        let policy = RateLimitPolicy::default();
        assert_eq!(policy.cooldown(50_000, ms(500)), ms(1_000));
        assert_eq!(policy.cooldown(50_000, ms(0)), ms(1_000));
        assert_eq!(policy.cooldown(2_000, ms(999)), ms(1_000));
    }

    #[test]
    fn exhaustion_inside_window_waits_out_remainder() {
        let policy = RateLimitPolicy::default();
        // 120k/min runs out at 40s, inside the 60s window
        assert_eq!(policy.cooldown(60_000, ms(30_000)), ms(30_000));
        assert_eq!(policy.cooldown(79_000, ms(1_000)), ms(59_000));
    }

    #[test]
    fn exhaustion_past_window_does_not_wait() {
        let policy = RateLimitPolicy::default();
        // 67.5k/min runs out at ~71s, after the window closes
        assert_eq!(policy.cooldown(45_000, ms(40_000)), Duration::ZERO);
    }

    #[test]
    fn custom_policy() {
        let policy = RateLimitPolicy::from_config(&RateLimitConfig {
            tokens_per_minute: 1_000,
            window_ms: 10_000,
            threshold: 0.5,
        });
        assert_eq!(policy.window, ms(10_000));
        // 12k/min: over the 500 trigger, budget gone at 5s
        assert_eq!(policy.cooldown(1_000, ms(5_000)), ms(5_000));
        assert_eq!(policy.cooldown(40, ms(5_000)), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn record_accumulates_within_window() {
        let start = Instant::now();
        let mut window = TokenWindow::starting_at(start);
        window.record(100, start, ms(60_000));
        tokio::time::advance(ms(30_000)).await;
        window.record(50, Instant::now(), ms(60_000));
        assert_eq!(window.tokens(), 150);
        assert_eq!(window.started_at(), start);
        assert_eq!(window.elapsed(Instant::now()), ms(30_000));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_window_keeps_only_new_tokens() {
        let start = Instant::now();
        let mut window = TokenWindow::starting_at(start);
        window.record(70_000, start, ms(60_000));
        tokio::time::advance(ms(60_001)).await;

        let now = Instant::now();
        window.record(10, now, ms(60_000));
        assert_eq!(window.tokens(), 10);
        assert_eq!(window.started_at(), now);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_only_after_window_length() {
        let start = Instant::now();
        let mut window = TokenWindow::starting_at(start);
        window.record(5, start, ms(60_000));

        tokio::time::advance(ms(60_000)).await;
        assert!(!window.reset_if_expired(Instant::now(), ms(60_000)));
        assert_eq!(window.tokens(), 5);

        tokio::time::advance(ms(1)).await;
        assert!(window.reset_if_expired(Instant::now(), ms(60_000)));
        assert_eq!(window.tokens(), 0);
    }
}
