use crate::model::Heartbeat;

/// Whether `candidate` is far enough from `last_sent` to be worth sending.
///
/// Forced writes always pass. Purely advisory: the caller owns the state.
pub fn should_send(
    candidate: &Heartbeat,
    last_sent: &Heartbeat,
    is_forced_write: bool,
    cooldown_secs: f64,
) -> bool {
    is_forced_write || candidate.time - last_sent.time >= cooldown_secs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(time: f64) -> Heartbeat {
        Heartbeat {
            time,
            ..Heartbeat::sentinel()
        }
    }

    #[test]
    fn inside_window_is_suppressed() {
        assert!(!should_send(&at(100.5), &at(100.0), false, 1.0));
    }

    #[test]
    fn window_boundary_is_sent() {
        assert!(should_send(&at(101.0), &at(100.0), false, 1.0));
    }

    #[test]
    fn forced_write_bypasses_window() {
        assert!(should_send(&at(100.0), &at(100.0), true, 1.0));
        assert!(should_send(&at(99.0), &at(100.0), true, 1.0));
    }

    #[test]
    fn sentinel_lets_first_heartbeat_through() {
        assert!(should_send(&at(1.7e9), &Heartbeat::sentinel(), false, 120.0));
    }

    #[test]
    fn zero_and_negative_windows() {
        assert!(should_send(&at(100.0), &at(100.0), false, 0.0));
        assert!(!should_send(&at(99.0), &at(100.0), false, 0.0));
        assert!(should_send(&at(99.5), &at(100.0), false, -1.0));
    }
}
