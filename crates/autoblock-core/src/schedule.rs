//! Recurring block windows.
//!
//! A [`Schedule`] is one weekly recurring time window, optionally pinned to a
//! single ISO weekday, with per-window overrides for the blocking options.
//! Windows may span midnight (end time numerically earlier than start time).

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Time of day represented as hour and minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeOfDay {
    /// Hour (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub minute: u8,
}

impl TimeOfDay {
    /// Creates a new TimeOfDay.
    ///
    /// # Panics
    /// Panics if hour >= 24 or minute >= 60.
    pub fn new(hour: u8, minute: u8) -> Self {
        assert!(hour < 24, "hour must be 0-23");
        assert!(minute < 60, "minute must be 0-59");
        Self { hour, minute }
    }

    /// Converts to minutes since midnight for comparison.
    pub fn to_minutes(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    /// Converts to a chrono time (seconds zero).
    pub fn to_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0)
            .expect("TimeOfDay holds a valid wall-clock time")
    }

    /// Creates from a chrono NaiveTime, dropping seconds.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }
}

impl PartialOrd for TimeOfDay {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeOfDay {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_minutes().cmp(&other.to_minutes())
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Returns the previous ISO weekday, wrapping Monday back to Sunday.
fn previous_iso_weekday(day: u8) -> u8 {
    if day == 1 {
        7
    } else {
        day - 1
    }
}

/// One recurring block window.
///
/// `weekday` is an ISO weekday (Monday = 1 .. Sunday = 7); `None` means the
/// window recurs every day. Boundaries are closed on both ends: a timestamp
/// exactly at `start_time` or `end_time` is inside the window. When
/// `start_time == end_time` the window is active for exactly that minute,
/// not for 24 hours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// ISO weekday the window is pinned to, or `None` for every day.
    pub weekday: Option<u8>,
    /// Start time of the window.
    pub start_time: TimeOfDay,
    /// End time of the window. Earlier than `start_time` for overnight windows.
    pub end_time: TimeOfDay,
    /// Per-window whitelist-mode override; `None` falls through to the default.
    pub block_as_whitelist: Option<bool>,
    /// Per-window host list override; `None` falls through to the global list.
    /// An empty list is an explicit "block nothing", not a fallthrough.
    pub host_blacklist: Option<Vec<String>>,
}

impl Schedule {
    /// Creates a window with no per-window option overrides.
    pub fn new(weekday: Option<u8>, start_time: TimeOfDay, end_time: TimeOfDay) -> Self {
        Self {
            weekday,
            start_time,
            end_time,
            block_as_whitelist: None,
            host_blacklist: None,
        }
    }

    /// Returns the ISO weekdays this window recurs on.
    pub fn weekdays(&self) -> Vec<u8> {
        match self.weekday {
            Some(day) => vec![day],
            None => (1..=7).collect(),
        }
    }

    /// Returns true if the window recurs on the given ISO weekday.
    fn applies_on(&self, day: u8) -> bool {
        match self.weekday {
            Some(pinned) => pinned == day,
            None => true,
        }
    }

    /// Returns true if this window spans midnight.
    pub fn is_overnight(&self) -> bool {
        self.end_time < self.start_time
    }

    /// Checks whether `now` falls inside this window's most recent occurrence.
    pub fn is_active(&self, now: NaiveDateTime) -> bool {
        let today = now.weekday().number_from_monday() as u8;
        let time = now.time();

        // Common case: window does not go overnight.
        if !self.is_overnight() {
            return self.applies_on(today)
                && time >= self.start_time.to_naive_time()
                && time <= self.end_time.to_naive_time();
        }
        // Overnight, first half: evening of a start day.
        if self.applies_on(today) && time >= self.start_time.to_naive_time() {
            return true;
        }
        // Overnight, second half: morning after a start day.
        self.applies_on(previous_iso_weekday(today)) && time <= self.end_time.to_naive_time()
    }

    /// Returns the minutes left from `now` until this window's end time,
    /// rounded to the nearest minute.
    ///
    /// The end instant is anchored to `now`'s calendar day, or to the next
    /// day when the end time has already passed (overnight windows queried
    /// before midnight), so the result is never negative. Callers should
    /// only invoke this while the window is active.
    pub fn duration_minutes(&self, now: NaiveDateTime) -> u32 {
        let mut end = now.date().and_time(self.end_time.to_naive_time());
        if end < now {
            end += chrono::Duration::days(1);
        }
        let seconds = (end - now).num_seconds();
        (seconds as f64 / 60.0).round() as u32
    }
}
