use std::time::{Duration, Instant};

/// Minimum gap between repeats of the same noisy warning.
pub const LOG_THROTTLE: Duration = Duration::from_secs(2);

/// Returns a timestamp that lets the first throttled log through immediately.
pub fn log_epoch() -> Instant {
    Instant::now()
        .checked_sub(LOG_THROTTLE)
        .unwrap_or_else(Instant::now)
}

pub fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}
