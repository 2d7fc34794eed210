//! Wall-clock rendering of monotonic timestamps
//!
//! The core runs on a monotonic millisecond clock. When the runtime knows
//! the Unix time it syncs a reference point here, and monotonic instants
//! can then be rendered as local clock times.

use core::fmt;

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike};

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const MS_PER_MINUTE: u64 = 60_000;
const MINUTES_PER_HOUR: u64 = 60;
const MINUTES_PER_DAY: u64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reference {
    unix_ms: i64,
    monotonic_ms: u64,
}

/// Maps monotonic milliseconds onto local wall-clock time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    reference: Option<Reference>,
    utc_offset_minutes: i32,
}

impl WallClock {
    pub const fn new(utc_offset_minutes: i32) -> Self {
        Self {
            reference: None,
            utc_offset_minutes,
        }
    }

    /// Record that monotonic `now_ms` corresponds to Unix time `unix_ms`
    pub fn sync(&mut self, unix_ms: i64, now_ms: u64) {
        self.reference = Some(Reference {
            unix_ms,
            monotonic_ms: now_ms,
        });
    }

    pub fn is_synced(&self) -> bool {
        self.reference.is_some()
    }

    /// Local time at monotonic instant `at_ms`, if the clock is synced
    pub fn local_time(&self, at_ms: u64) -> Option<NaiveDateTime> {
        let reference = self.reference?;
        let at = i64::try_from(at_ms).ok()?;
        let base = i64::try_from(reference.monotonic_ms).ok()?;
        let offset_ms = i64::from(self.utc_offset_minutes) * 60_000;

        let unix_ms = reference
            .unix_ms
            .checked_add(at - base)?
            .checked_add(offset_ms)?;
        DateTime::from_timestamp_millis(unix_ms).map(|dt| dt.naive_utc())
    }

    /// Describe how long ago `then_ms` was, as seen at `now_ms`
    pub fn since(&self, then_ms: u64, now_ms: u64) -> Since {
        let minutes = now_ms.saturating_sub(then_ms) / MS_PER_MINUTE;

        if minutes < MINUTES_PER_HOUR {
            return Since::Minutes(minutes);
        }

        let with_date = minutes >= MINUTES_PER_DAY;
        match self.local_time(then_ms) {
            Some(time) => Since::At(ClockTime { time, with_date }),
            None if with_date => Since::Days(minutes / MINUTES_PER_DAY),
            None => Since::Hours(minutes / MINUTES_PER_HOUR),
        }
    }
}

/// Rough age of a past instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Since {
    /// Under an hour ago
    Minutes(u64),
    /// A clock time, with the date once it is more than a day old
    At(ClockTime),
    /// Fallbacks when the wall clock was never synced
    Hours(u64),
    Days(u64),
}

/// Clock time rendered as `3:04:05 PM` or `3:04:05 PM, Tue 5-Mar`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    time: NaiveDateTime,
    with_date: bool,
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (pm, hour) = self.time.hour12();
        write!(
            f,
            "{}:{:02}:{:02} {}",
            hour,
            self.time.minute(),
            self.time.second(),
            if pm { "PM" } else { "AM" }
        )?;

        if self.with_date {
            let weekday = WEEKDAYS[self.time.weekday().num_days_from_monday() as usize];
            let month = MONTHS[self.time.month0() as usize];
            write!(f, ", {} {}-{}", weekday, self.time.day(), month)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;
    use heapless::String;

    // 2024-03-05 15:04:05 UTC (a Tuesday)
    const UNIX_MS: i64 = 1_709_651_045_000;

    fn render(clock_time: ClockTime) -> String<32> {
        let mut text = String::new();
        write!(text, "{}", clock_time).unwrap();
        text
    }

    #[test]
    fn test_unsynced_has_no_time() {
        let clock = WallClock::new(0);
        assert!(!clock.is_synced());
        assert_eq!(clock.local_time(0), None);
    }

    #[test]
    fn test_local_time_follows_monotonic() {
        let mut clock = WallClock::new(0);
        clock.sync(UNIX_MS, 10_000);

        let time = clock.local_time(10_000 + 60_000).unwrap();
        assert_eq!(time.hour(), 15);
        assert_eq!(time.minute(), 5);
    }

    #[test]
    fn test_earlier_instant() {
        let mut clock = WallClock::new(0);
        clock.sync(UNIX_MS, 3_600_000);

        let time = clock.local_time(0).unwrap();
        assert_eq!(time.hour(), 14);
    }

    #[test]
    fn test_utc_offset() {
        let mut clock = WallClock::new(-300);
        clock.sync(UNIX_MS, 0);
        assert_eq!(clock.local_time(0).unwrap().hour(), 10);
    }

    #[test]
    fn test_since_minutes() {
        let clock = WallClock::new(0);
        assert_eq!(clock.since(0, 17 * 60_000 + 500), Since::Minutes(17));
    }

    #[test]
    fn test_since_degrades_without_sync() {
        let clock = WallClock::new(0);
        assert_eq!(clock.since(0, 3 * 3_600_000), Since::Hours(3));
        assert_eq!(clock.since(0, 50 * 3_600_000), Since::Days(2));
    }

    #[test]
    fn test_since_renders_clock_time() {
        let mut clock = WallClock::new(0);
        clock.sync(UNIX_MS, 0);

        match clock.since(0, 2 * 3_600_000) {
            Since::At(time) => assert_eq!(render(time).as_str(), "3:04:05 PM"),
            other => panic!("unexpected {:?}", other),
        }

        match clock.since(0, 30 * 3_600_000) {
            Since::At(time) => assert_eq!(render(time).as_str(), "3:04:05 PM, Tue 5-Mar"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_midnight_is_twelve() {
        let mut clock = WallClock::new(0);
        // 2024-03-05 00:00:09 UTC
        clock.sync(1_709_596_809_000, 0);
        match clock.since(0, 2 * 3_600_000) {
            Since::At(time) => assert_eq!(render(time).as_str(), "12:00:09 AM"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
