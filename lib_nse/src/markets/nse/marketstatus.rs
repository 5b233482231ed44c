//! # NSE Market Status
//!
//! Decides whether the exchange is trading right now. The answer drives the
//! market-data caches: open means every call goes upstream, closed means
//! answers are memoized.
//!
//! ## Logic:
//! 1.  Read "now" in the exchange's timezone from a [`Clock`].
//! 2.  Today on the holiday list (trading holiday or weekend) means closed.
//! 3.  Otherwise open strictly between the opening and closing times.
//! 4.  Each day splits into two sessions at the opening time; a
//!     [`SessionMark`] names the one "now" falls in.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

use crate::markets::nse::error::NseResult;
use crate::markets::nse::holidays::{HolidayCalendar, HolidayList};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

/// Source of the current exchange-local time.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in the exchange's timezone.
    fn now(&self) -> NaiveDateTime;

    /// Current date in the exchange's timezone.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Reads the system clock and converts it to the exchange's timezone.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeClock {
    tz: Tz,
}

impl ExchangeClock {
    /// Creates a clock for the given timezone.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for ExchangeClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    /// Creates a clock stopped at `now`.
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Moves the clock to `now`.
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().expect("clock lock poisoned") = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().expect("clock lock poisoned")
    }
}

/// Daily trading session, both bounds exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketWindow {
    /// Opening time.
    pub open: NaiveTime,
    /// Closing time.
    pub close: NaiveTime,
}

impl MarketWindow {
    /// `true` strictly between open and close.
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.open < time && time < self.close
    }

    /// The session `now` belongs to.
    pub fn session_mark(&self, now: NaiveDateTime) -> SessionMark {
        SessionMark {
            date: now.date(),
            after_open: now.time() >= self.open,
        }
    }
}

/// Identifies a stretch of time with a single market picture: the hours
/// before a day's open, or the hours from that open until the next day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMark {
    /// Calendar date in the exchange's timezone.
    pub date: NaiveDate,
    /// `true` once that day's opening time has passed.
    pub after_open: bool,
}

/// Pure market-state rule, evaluated at `now` against `holidays`.
pub fn is_open_at(now: NaiveDateTime, holidays: &HolidayList, window: &MarketWindow) -> bool {
    if holidays.contains(now.date()) {
        return false;
    }
    window.contains(now.time())
}

/// # Market Clock
///
/// Combines the holiday calendar, a clock and the session window.
pub struct MarketClock {
    calendar: Arc<HolidayCalendar>,
    clock: Arc<dyn Clock>,
    window: MarketWindow,
}

impl MarketClock {
    /// Creates the market clock.
    pub fn new(calendar: Arc<HolidayCalendar>, clock: Arc<dyn Clock>, window: MarketWindow) -> Self {
        Self { calendar, clock, window }
    }

    /// `true` when the exchange is trading now. Fails when the holiday
    /// calendar cannot be read.
    pub async fn is_open(&self) -> NseResult<bool> {
        let holidays = self.calendar.get_holiday_list().await?;
        Ok(is_open_at(self.clock.now(), &holidays, &self.window))
    }

    /// The session "now" belongs to.
    pub fn session_mark(&self) -> SessionMark {
        self.window.session_mark(self.clock.now())
    }

    /// The session window in use.
    pub fn window(&self) -> MarketWindow {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markets::nse::holidays::HolidayRow;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn window() -> MarketWindow {
        MarketWindow {
            open: NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
            close: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
        }
    }

    fn holidays(today: NaiveDate) -> HolidayList {
        let rows = vec![HolidayRow {
            serial: 1,
            date: "22-Oct-2026".to_string(),
            description: "Diwali".to_string(),
        }];
        HolidayList::build(&rows, today).unwrap()
    }

    #[test]
    fn open_strictly_inside_the_window() {
        // 2026-10-19 is a Monday.
        let list = holidays(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert!(is_open_at(at(2026, 10, 19, 10, 0), &list, &window()));
        assert!(!is_open_at(at(2026, 10, 19, 9, 15), &list, &window()));
        assert!(!is_open_at(at(2026, 10, 19, 15, 30), &list, &window()));
        assert!(!is_open_at(at(2026, 10, 19, 8, 0), &list, &window()));
        assert!(!is_open_at(at(2026, 10, 19, 18, 0), &list, &window()));
    }

    #[test]
    fn closed_on_holidays_and_weekends() {
        let list = holidays(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        assert!(!is_open_at(at(2026, 10, 22, 11, 0), &list, &window()));
        assert!(!is_open_at(at(2026, 10, 24, 11, 0), &list, &window()));
        assert!(!is_open_at(at(2026, 10, 25, 11, 0), &list, &window()));
        assert!(is_open_at(at(2026, 10, 23, 11, 0), &list, &window()));
    }

    #[test]
    fn session_mark_turns_over_at_open_and_midnight() {
        let w = window();
        let monday_evening = w.session_mark(at(2026, 10, 19, 18, 0));
        assert_eq!(monday_evening, w.session_mark(at(2026, 10, 19, 23, 59)));
        assert!(monday_evening.after_open);

        let tuesday_early = w.session_mark(at(2026, 10, 20, 8, 0));
        assert_ne!(monday_evening, tuesday_early);
        assert!(!tuesday_early.after_open);

        let tuesday_open = w.session_mark(at(2026, 10, 20, 9, 15));
        assert_ne!(tuesday_early, tuesday_open);
        assert_eq!(tuesday_open, w.session_mark(at(2026, 10, 20, 18, 0)));
    }

    #[test]
    fn fixed_clock_moves_on_demand() {
        let clock = FixedClock::new(at(2026, 10, 19, 10, 0));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        clock.set(at(2026, 10, 20, 16, 0));
        assert_eq!(clock.now(), at(2026, 10, 20, 16, 0));
    }

    #[test]
    fn exchange_clock_reads_kolkata_time() {
        let clock = ExchangeClock::new(chrono_tz::Asia::Kolkata);
        let utc = Utc::now().naive_utc();
        let offset = clock.now() - utc;
        // IST is UTC+05:30; allow for the time between the two reads.
        assert!((offset.num_minutes() - 330).abs() <= 1);
    }
}
