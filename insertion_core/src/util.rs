//! Common time/period helpers for insertion_core.

use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Compute the period in microseconds for a given rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Compute the period in milliseconds for a given rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 millisecond.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1)
}

#[inline]
pub fn period(hz: u32) -> Duration {
    Duration::from_micros(period_us(hz))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_clamp_zero_rate() {
        assert_eq!(period_us(0), MICROS_PER_SEC);
        assert_eq!(period_ms(0), MILLIS_PER_SEC);
    }

    #[test]
    fn periods_never_reach_zero() {
        assert_eq!(period_us(u32::MAX), 1);
        assert_eq!(period_ms(5_000), 1);
        assert_eq!(period(100), Duration::from_millis(10));
    }
}
