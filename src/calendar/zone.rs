//! Operative civil timezone

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// The zone whose wall clock decides dates, weekdays and firing times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperativeZone {
    /// Constant UTC offset, no daylight saving
    Fixed(FixedOffset),
    /// IANA zone; the offset follows its DST rules
    Named(Tz),
}

impl OperativeZone {
    /// Current wall clock in this zone
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.at(Utc::now())
    }

    /// Express an instant in this zone, with the offset in force at that instant
    pub fn at(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Fixed(offset) => instant.with_timezone(offset),
            Self::Named(tz) => instant.with_timezone(tz).fixed_offset(),
        }
    }

    /// Resolve a wall-clock time to an instant.
    ///
    /// A time repeated by a fall-back transition resolves to its first
    /// occurrence. A time skipped by a spring-forward gap is moved one hour
    /// later.
    pub fn localize(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        self.earliest(local)
            .or_else(|| self.earliest(local.checked_add_signed(TimeDelta::hours(1))?))
    }

    fn earliest(&self, local: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Fixed(offset) => offset.from_local_datetime(&local).earliest(),
            Self::Named(tz) => tz.from_local_datetime(&local).earliest().map(|dt| dt.fixed_offset()),
        }
    }
}

impl From<FixedOffset> for OperativeZone {
    fn from(offset: FixedOffset) -> Self {
        Self::Fixed(offset)
    }
}

impl From<Tz> for OperativeZone {
    fn from(tz: Tz) -> Self {
        Self::Named(tz)
    }
}

impl fmt::Display for OperativeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(offset) => write!(f, "{}", offset),
            Self::Named(tz) => write!(f, "{}", tz.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn wall(m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn jerusalem() -> OperativeZone {
        OperativeZone::from(chrono_tz::Asia::Jerusalem)
    }

    #[test]
    fn test_named_zone_follows_dst() {
        let zone = jerusalem();
        // Summer time until the last Sunday of October 2026
        assert_eq!(zone.localize(wall(10, 15, 6, 0)).unwrap().offset().local_minus_utc(), 3 * 3600);
        assert_eq!(zone.localize(wall(10, 26, 6, 0)).unwrap().offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_fall_back_fold_takes_first_occurrence() {
        let resolved = jerusalem().localize(wall(10, 25, 1, 30)).unwrap();
        assert_eq!(resolved.offset().local_minus_utc(), 3 * 3600);
        assert_eq!(resolved.hour(), 1);
    }

    #[test]
    fn test_spring_forward_gap_moves_an_hour_later() {
        // 2026-03-27 02:00 jumps to 03:00
        let resolved = jerusalem().localize(wall(3, 27, 2, 30)).unwrap();
        assert_eq!((resolved.hour(), resolved.minute()), (3, 30));
        assert_eq!(resolved.offset().local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn test_at_uses_offset_in_force() {
        let zone = jerusalem();
        let summer = Utc.with_ymd_and_hms(2026, 10, 15, 10, 0, 0).unwrap();
        let winter = Utc.with_ymd_and_hms(2026, 11, 15, 10, 0, 0).unwrap();
        assert_eq!(zone.at(summer).hour(), 13);
        assert_eq!(zone.at(winter).hour(), 12);
    }

    #[test]
    fn test_fixed_zone() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let zone = OperativeZone::from(offset);
        assert_eq!(zone.now().offset(), &offset);
        assert_eq!(zone.localize(wall(10, 26, 6, 0)).unwrap().offset(), &offset);
        assert_eq!(zone.to_string(), "+03:00");
        assert_eq!(jerusalem().to_string(), "Asia/Jerusalem");
    }
}
