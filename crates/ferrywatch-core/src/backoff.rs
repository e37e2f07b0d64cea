// ── Reconnect backoff ──
//
// delay(n) = min(initial * 2^n, max) * jitter
//
// `jitter` is drawn once per session from [0.75, 1.0]. Many clients that
// lose the controller at the same moment spread their retries apart,
// while each session's own delays never shrink between failures.

use std::time::Duration;

use rand::Rng;

const JITTER_MIN: f64 = 0.75;
const JITTER_MAX: f64 = 1.0;

/// Largest exponent applied to `initial_delay`; far past any sane cap.
const MAX_EXPONENT: u32 = 30;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── Backoff ──────────────────────────────────────────────────────────

/// Per-session backoff state.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    attempt: u32,
    jitter: f64,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        let jitter = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
        Self::with_jitter(config, jitter)
    }

    /// Fixed jitter factor, clamped into `[0.75, 1.0]`.
    pub fn with_jitter(config: ReconnectConfig, jitter: f64) -> Self {
        let jitter = if jitter.is_finite() {
            jitter.clamp(JITTER_MIN, JITTER_MAX)
        } else {
            JITTER_MAX
        };
        Self {
            config,
            attempt: 0,
            jitter,
        }
    }

    /// Consecutive failures since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Delay for the given failure index (0 = first failure).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.min(MAX_EXPONENT)).unwrap_or(i32::MAX);
        let base = self.config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
        let capped = base.min(self.config.max_delay.as_secs_f64());

        Duration::try_from_secs_f64(capped * self.jitter).unwrap_or(self.config.max_delay)
    }

    /// Delay before the next attempt, advancing the failure counter.
    /// `None` once `max_retries` consecutive failures have been spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.config.max_retries {
            if self.attempt >= max {
                return None;
            }
        }
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }

    /// Back to the initial delay (after a successful open).
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.max_retries.is_none());
    }

    #[test]
    fn backoff_doubles_without_jitter() {
        let mut backoff = Backoff::with_jitter(ReconnectConfig::default(), 1.0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(4)));
        assert_eq!(backoff.attempt(), 3);
    }

    #[test]
    fn backoff_is_monotonic_up_to_cap() {
        for _ in 0..32 {
            let backoff = Backoff::new(ReconnectConfig {
                initial_delay: Duration::from_millis(250),
                max_delay: Duration::from_secs(10),
                max_retries: None,
            });

            let delays: Vec<_> = (0..40).map(|n| backoff.delay_for(n)).collect();
            for pair in delays.windows(2) {
                assert!(pair[1] >= pair[0], "{:?} then {:?}", pair[0], pair[1]);
            }
            assert!(delays.iter().all(|d| *d <= Duration::from_secs(10)));
            assert_eq!(delays[39], delays[38], "capped delays stay flat");
        }
    }

    #[test]
    fn strictly_increases_below_cap() {
        let backoff = Backoff::new(ReconnectConfig::default());
        assert!(backoff.delay_for(1) > backoff.delay_for(0));
        assert!(backoff.delay_for(2) > backoff.delay_for(1));
    }

    #[test]
    fn jitter_stays_in_range() {
        for _ in 0..64 {
            let j = Backoff::new(ReconnectConfig::default()).jitter();
            assert!((JITTER_MIN..=JITTER_MAX).contains(&j), "{j}");
        }
        assert!((Backoff::with_jitter(ReconnectConfig::default(), 3.0).jitter() - 1.0).abs() < f64::EPSILON);
        assert!((Backoff::with_jitter(ReconnectConfig::default(), f64::NAN).jitter() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_returns_to_initial_delay() {
        let mut backoff = Backoff::with_jitter(ReconnectConfig::default(), 0.8);
        let first = backoff.next_delay().unwrap();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay().unwrap(), first);
    }

    #[test]
    fn max_retries_exhausts() {
        let mut backoff = Backoff::with_jitter(
            ReconnectConfig {
                max_retries: Some(2),
                ..ReconnectConfig::default()
            },
            1.0,
        );
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_some());
        assert!(backoff.next_delay().is_none());
        backoff.reset();
        assert!(backoff.next_delay().is_some());
    }

    #[test]
    fn huge_attempt_counts_saturate_at_cap() {
        let backoff = Backoff::with_jitter(ReconnectConfig::default(), 1.0);
        assert_eq!(backoff.delay_for(u32::MAX), Duration::from_secs(30));
    }
}
