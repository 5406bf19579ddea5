//! Wall-clock access for pacing and cooldown checks.
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Source of "now" plus the only way the bot blocks.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Time left until `since + interval`, clamped at zero.
pub fn remaining(since: DateTime<Utc>, interval: Duration, now: DateTime<Utc>) -> Duration {
    let elapsed = now.signed_duration_since(since);
    let Ok(elapsed) = elapsed.to_std() else {
        // `since` lies in the future; the whole interval is still ahead.
        return interval
            + since
                .signed_duration_since(now)
                .to_std()
                .unwrap_or_default();
    };
    interval.saturating_sub(elapsed)
}

/// Elapsed time since `since`, clamped at zero.
pub fn elapsed_since(since: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    now.signed_duration_since(since).to_std().unwrap_or_default()
}
