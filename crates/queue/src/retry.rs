//! Retry backoff schedule.

use std::time::Duration;

use uplink_types::RetryConfig;

/// Backoff delay before retrying after a failed `attempt` (1-based).
///
/// `base * 2^(attempt-1)` capped at `max_delay`, perturbed by uniform jitter
/// in `[-jitter, +jitter]` and floored at zero. With `jitter` set to zero the
/// result is an exact function of its inputs.
pub fn delay_for_attempt(config: &RetryConfig, attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(63) as i32;
    let secs = config.base_delay.as_secs_f64() * 2f64.powi(exp);
    let capped = secs.min(config.max_delay.as_secs_f64());
    let jittered = capped + config.jitter.as_secs_f64() * jitter_unit();
    Duration::from_secs_f64(jittered.max(0.0))
}

/// Roughly uniform sample in [-1.0, 1.0) from the system clock's sub-second
/// nanos. Avoids pulling in an RNG for one jitter term.
fn jitter_unit() -> f64 {
    (std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as f64
        / u32::MAX as f64)
        * 2.0
        - 1.0
}
