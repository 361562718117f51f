//! Jittered delay policy for request pacing.
//!
//! Every wait in the crawl (between pages, between retry attempts) goes
//! through [`jittered`], which perturbs a base duration by a uniform offset
//! so that repeated runs and parallel workers do not hit the upstream on a
//! fixed cadence.

use std::time::Duration;

use rand::Rng;

/// Lower jitter bound added to a base delay, in seconds.
const JITTER_LOW_SECS: f64 = -0.3;

/// Upper jitter bound added to a base delay, in seconds.
const JITTER_HIGH_SECS: f64 = 0.5;

/// Base delay between page-fetch retry attempts.
pub const PAGE_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Base delay between file-download retry attempts.
pub const FILE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Returns `base` perturbed by a uniform offset in `[-0.3 s, +0.5 s]`,
/// clamped so the result is never negative.
///
/// For every base `b >= 0` the result lies in `[max(0, b - 0.3 s), b + 0.5 s]`.
#[must_use]
pub fn jittered(base: Duration) -> Duration {
    let offset = rand::thread_rng().gen_range(JITTER_LOW_SECS..=JITTER_HIGH_SECS);
    let secs = base.as_secs_f64() + offset;
    if secs <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jittered_stays_within_bounds() {
        let base = Duration::from_secs(1);
        for _ in 0..200 {
            let delay = jittered(base);
            assert!(
                delay >= Duration::from_millis(700),
                "delay {delay:?} below base - 0.3s"
            );
            assert!(
                delay <= Duration::from_millis(1500),
                "delay {delay:?} above base + 0.5s"
            );
        }
    }

    #[test]
    fn test_jittered_zero_base_clamps_at_zero() {
        for _ in 0..200 {
            let delay = jittered(Duration::ZERO);
            assert!(delay <= Duration::from_millis(500));
        }
    }

    #[test]
    fn test_jittered_small_base_never_negative() {
        // A 100ms base minus up to 300ms of jitter must clamp, not underflow.
        for _ in 0..200 {
            let delay = jittered(Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(600));
        }
    }

    #[test]
    fn test_jittered_varies() {
        let base = Duration::from_secs(1);
        let samples: Vec<Duration> = (0..50).map(|_| jittered(base)).collect();
        let first = samples[0];
        assert!(
            samples.iter().any(|d| *d != first),
            "50 samples were all identical"
        );
    }
}
