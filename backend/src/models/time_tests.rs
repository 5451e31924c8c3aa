#[cfg(test)]
mod tests {
    use crate::models::time::{hours_between, horizon_instant, mill_offset, PatternKey};
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_pattern_key_utc() {
        // 2025-06-02 is a Monday
        let t = Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0).unwrap();
        let key = PatternKey::at(t, mill_offset(0).unwrap());
        assert_eq!(key, PatternKey::new(14, 0));
    }

    #[test]
    fn test_hour_past_midnight_rolls_weekday() {
        let now = Utc.with_ymd_and_hms(2025, 6, 8, 22, 0, 0).unwrap(); // Sunday
        let utc = mill_offset(0).unwrap();
        assert_eq!(PatternKey::at(now, utc), PatternKey::new(22, 6));
        let later = horizon_instant(now, 3);
        assert_eq!(PatternKey::at(later, utc), PatternKey::new(1, 0));
    }

    #[test]
    fn test_negative_offset_shifts_into_previous_day() {
        let t = Utc.with_ymd_and_hms(2025, 6, 3, 1, 0, 0).unwrap(); // Tuesday 01:00 UTC
        let brt = mill_offset(-180).unwrap();
        assert_eq!(PatternKey::at(t, brt), PatternKey::new(22, 0));
    }

    #[test]
    fn test_offset_out_of_range() {
        assert!(mill_offset(24 * 60).is_err());
        assert!(mill_offset(-180).is_ok());
    }

    #[test]
    fn test_hours_between() {
        let start = Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
        assert_eq!(hours_between(start, start + Duration::minutes(90)), 1.5);
        assert_eq!(hours_between(start, start), 0.0);
    }
}
