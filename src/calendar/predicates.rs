//! Calendar arithmetic used by the tier triggers

use chrono::{Datelike, NaiveDate};

/// Day 1-7: the first weekly occurrence of any weekday in the month
pub fn is_first_week_of_month(date: NaiveDate) -> bool {
    date.day() <= 7
}

/// Days 1-7 and 15-21: roughly twice a month for a weekly trigger
pub fn in_dormant_window(date: NaiveDate) -> bool {
    matches!(date.day(), 1..=7 | 15..=21)
}

/// Flip the alternating toggle and report whether this occurrence fires.
///
/// Starting from `false`, odd occurrences fire.
pub fn advance_biweekly(toggle: &mut bool) -> bool {
    *toggle = !*toggle;
    *toggle
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_first_week_boundaries() {
        assert!(is_first_week_of_month(date(1)));
        assert!(is_first_week_of_month(date(7)));
        assert!(!is_first_week_of_month(date(8)));
        assert!(!is_first_week_of_month(date(31)));
    }

    #[test]
    fn test_dormant_window_boundaries() {
        assert!(in_dormant_window(date(7)));
        assert!(!in_dormant_window(date(8)));
        assert!(!in_dormant_window(date(14)));
        assert!(in_dormant_window(date(15)));
        assert!(in_dormant_window(date(21)));
        assert!(!in_dormant_window(date(22)));
    }

    #[test]
    fn test_biweekly_fires_on_odd_occurrences() {
        let mut toggle = false;
        let fired: Vec<bool> = (0..4).map(|_| advance_biweekly(&mut toggle)).collect();
        assert_eq!(fired, vec![true, false, true, false]);
        assert!(!toggle);
    }

    proptest! {
        #[test]
        fn prop_weekly_trigger_hits_dormant_window_twice_a_month(start in 1u32..=7) {
            // A weekly trigger lands on start, start+7, start+14, start+21(, start+28)
            let hits = (0..5)
                .map(|w| start + 7 * w)
                .filter(|d| *d <= 31)
                .filter(|d| in_dormant_window(date(*d)))
                .count();
            prop_assert_eq!(hits, 2);
        }

        #[test]
        fn prop_weekly_trigger_hits_first_week_once(start in 1u32..=7) {
            let hits = (0..5)
                .map(|w| start + 7 * w)
                .filter(|d| *d <= 31)
                .filter(|d| is_first_week_of_month(date(*d)))
                .count();
            prop_assert_eq!(hits, 1);
        }
    }
}
