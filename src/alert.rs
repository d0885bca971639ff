//! Distraction alert trigger

use chrono::TimeDelta;

/// Default distraction streak before alerting, in milliseconds
pub const DEFAULT_ALERT_DELAY_MS: i64 = 5_000;

/// Whether a distraction streak has lasted long enough to alert.
///
/// Stateless; re-evaluated on every tick. Sound and banners are up to the
/// consumer of the flag.
pub fn should_alert(distraction_duration: TimeDelta, alert_delay: TimeDelta) -> bool {
    distraction_duration >= alert_delay
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_delay() -> TimeDelta {
        TimeDelta::milliseconds(DEFAULT_ALERT_DELAY_MS)
    }

    #[test]
    fn test_alert_boundary() {
        assert!(!should_alert(TimeDelta::milliseconds(4_990), default_delay()));
        assert!(should_alert(TimeDelta::milliseconds(5_000), default_delay()));
        assert!(should_alert(TimeDelta::seconds(12), default_delay()));
    }

    #[test]
    fn test_no_streak_never_alerts() {
        assert!(!should_alert(TimeDelta::zero(), default_delay()));
    }
}
