//! Shared timestamp helpers for observation and write stamping.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns wall-clock seconds since the unix epoch as a float.
///
/// Event Records carry this value from the moment of observation; the
/// features table stamps it at write time instead.
pub fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_epoch_secs_is_positive() {
        assert!(now_epoch_secs() > 0.0);
    }

    #[test]
    fn test_now_epoch_secs_is_monotonic_enough() {
        let a = now_epoch_secs();
        let b = now_epoch_secs();
        assert!(b >= a);
    }
}
