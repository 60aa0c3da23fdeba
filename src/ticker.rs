use crate::persistence::AppSettings;
use std::time::Duration;

/// Default tick interval in milliseconds
pub const DEFAULT_TICK_MS: u64 = 1000;

/// Shortest interval honoured from settings
const MIN_TICK_MS: u64 = 100;

/// Get tick duration
pub fn tick_duration(settings: &AppSettings) -> Duration {
    Duration::from_millis(settings.tick_ms.max(MIN_TICK_MS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration() {
        let duration = tick_duration(&AppSettings::default());
        assert_eq!(duration, Duration::from_millis(1000));
    }

    #[test]
    fn test_tick_duration_has_floor() {
        let settings = AppSettings {
            tick_ms: 0,
            ..AppSettings::default()
        };
        assert_eq!(tick_duration(&settings), Duration::from_millis(100));
    }
}
