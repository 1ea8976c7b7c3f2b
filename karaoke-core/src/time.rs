//! Time and duration conversion utilities.
//!
//! Lyrics carry integer millisecond timestamps while the clock and audio
//! driver work with [`Duration`]. These helpers convert between the two with
//! explicit saturation instead of silent truncation.

use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    ///
    /// In practice, this is always safe because durations exceeding `u64::MAX`
    /// milliseconds would represent ~584 million years.
    fn as_millis_u64(&self) -> u64;

    /// Add a signed millisecond delta, saturating at zero.
    #[must_use]
    fn saturating_add_signed_millis(&self, delta_ms: i64) -> Duration;
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }

    fn saturating_add_signed_millis(&self, delta_ms: i64) -> Duration {
        let delta = Duration::from_millis(delta_ms.unsigned_abs());
        if delta_ms >= 0 {
            self.saturating_add(delta)
        } else {
            self.saturating_sub(delta)
        }
    }
}

/// Format a millisecond timestamp as `mm:ss`.
///
/// Minutes are not wrapped into hours, so a 75 minute track shows `75:00`.
#[must_use]
pub fn format_time(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
