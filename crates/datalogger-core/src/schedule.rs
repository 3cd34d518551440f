//! Working-hours gate and local wall clock.
//!
//! The datalogger only reports while the machine would be staffed:
//! Monday to Friday, between the configured start and end times. Both ends
//! of the window are inclusive. The gate is evaluated against local time in
//! a fixed UTC offset, so the answer does not depend on the host timezone.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};

/// Errors in the schedule definition.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The window starts after it ends.
    #[error("working window starts at {start} but ends at {end}")]
    InvertedWindow {
        /// Configured start.
        start: NaiveTime,
        /// Configured end.
        end: NaiveTime,
    },

    /// The UTC offset is not within one day of UTC.
    #[error("UTC offset of {minutes} minutes is out of range")]
    InvalidOffset {
        /// Configured offset in minutes.
        minutes: i32,
    },
}

/// Daily Monday-Friday window during which telemetry is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    start: NaiveTime,
    end: NaiveTime,
}

impl WorkingHours {
    /// Create a window from `start` to `end`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvertedWindow`] if `start > end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, ScheduleError> {
        if start > end {
            return Err(ScheduleError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window start.
    pub const fn start(&self) -> NaiveTime {
        self.start
    }

    /// Window end.
    pub const fn end(&self) -> NaiveTime {
        self.end
    }

    /// Whether telemetry should be produced at local time `now`.
    ///
    /// True iff the weekday is Monday through Friday and the time of day
    /// lies in `[start, end]`.
    pub fn gate(&self, now: &NaiveDateTime) -> bool {
        let weekday_open = !matches!(now.weekday(), Weekday::Sat | Weekday::Sun);
        let time = now.time();
        weekday_open && self.start <= time && time <= self.end
    }

    /// [`WorkingHours::gate`] for a zoned timestamp, using its local time.
    pub fn gate_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        self.gate(&now.naive_local())
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// Source of the current local time.
///
/// The publisher loop reads time through this trait so tests can script
/// the transition out of the working window.
pub trait WallClock {
    /// Current time in the datalogger's local offset.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// System clock viewed through a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct LocalClock {
    offset: FixedOffset,
}

impl LocalClock {
    /// Create a clock that reports time at `offset`.
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// The offset this clock reports in.
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl WallClock for LocalClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    /// 2024-01-17 is a Wednesday.
    fn wednesday(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 17)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn on(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn open_at_window_start() {
        let hours = WorkingHours::default();
        assert!(hours.gate(&wednesday(9, 0, 0)));
    }

    #[test]
    fn closed_one_second_before_start() {
        let hours = WorkingHours::default();
        assert!(!hours.gate(&wednesday(8, 59, 59)));
    }

    #[test]
    fn open_at_window_end() {
        let hours = WorkingHours::default();
        assert!(hours.gate(&wednesday(18, 0, 0)));
    }

    #[test]
    fn closed_after_window_end() {
        let hours = WorkingHours::default();
        assert!(!hours.gate(&wednesday(18, 0, 1)));
        let just_after = wednesday(18, 0, 0)
            .checked_add_signed(chrono::TimeDelta::milliseconds(1))
            .unwrap();
        assert!(!hours.gate(&just_after));
    }

    #[test]
    fn weekend_is_always_closed() {
        let hours = WorkingHours::default();
        // 2024-01-20 is a Saturday, 2024-01-21 a Sunday.
        assert!(!hours.gate(&on(20, 12, 0)));
        assert!(!hours.gate(&on(21, 12, 0)));
        assert!(!hours.gate(&on(20, 9, 0)));
    }

    #[test]
    fn every_weekday_is_open_at_noon() {
        let hours = WorkingHours::default();
        // 2024-01-15 (Mon) through 2024-01-19 (Fri).
        for day in 15..=19 {
            assert!(hours.gate(&on(day, 12, 0)), "day {day} should be open");
        }
    }

    #[test]
    fn inverted_window_is_rejected() {
        let start = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let end = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(WorkingHours::new(start, end).is_err());
    }

    #[test]
    fn zoned_gate_uses_local_time() {
        let hours = WorkingHours::default();
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        // 03:30 UTC on a Wednesday is 09:00 IST.
        let utc = Utc.with_ymd_and_hms(2024, 1, 17, 3, 30, 0).unwrap();
        assert!(hours.gate_at(&utc.with_timezone(&ist)));
        // The same instant in UTC is outside the window.
        assert!(!hours.gate_at(&utc));
    }

    #[test]
    fn local_clock_reports_in_its_offset() {
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        let clock = LocalClock::new(ist);
        assert_eq!(clock.now().offset().local_minus_utc(), 330 * 60);
    }
}
