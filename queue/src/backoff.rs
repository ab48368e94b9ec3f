//! The backoff ladder applied between delivery attempts.

use std::time::Duration;

/// Delay before the next attempt after the `retries`-th consecutive failure.
///
/// | failures | delay  |
/// |----------|--------|
/// | 1        | 5 s    |
/// | 2        | 10 s   |
/// | 3        | 30 s   |
/// | 4        | 60 s   |
/// | 5–10     | 5 min  |
/// | 11+      | 30 min |
///
/// There is no retry ceiling; the ladder tops out at 30 minutes.
pub fn backoff_for(retries: u32) -> Duration {
    match retries {
        0 | 1 => Duration::from_secs(5),
        2 => Duration::from_secs(10),
        3 => Duration::from_secs(30),
        4 => Duration::from_secs(60),
        5..=10 => Duration::from_secs(5 * 60),
        _ => Duration::from_secs(30 * 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_ladder_steps() {
        let secs: Vec<u64> = (1..=12).map(|n| backoff_for(n).as_secs()).collect();
        assert_eq!(
            secs,
            vec![5, 10, 30, 60, 300, 300, 300, 300, 300, 300, 1800, 1800]
        );
    }

    #[test]
    fn test_ladder_is_monotonic() {
        for n in 1..100 {
            assert!(backoff_for(n) <= backoff_for(n + 1));
        }
        assert_eq!(backoff_for(u32::MAX), Duration::from_secs(1800));
    }
}
