use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::prelude::*;

/// What a tick needs to know about «now».
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TickContext {
    pub date: NaiveDate,

    /// Local hour of the day, `0..=23`.
    pub hour: u8,

    /// `0` is Monday, `6` is Sunday.
    pub weekday: u8,
}

impl TickContext {
    pub fn from_datetime<T: TimeZone>(now: &DateTime<T>) -> Self {
        let hour = now.hour();
        let hour = u8::try_from(hour).ok().filter(|hour| *hour < 24).unwrap_or_else(|| {
            warn!(hour, "hour out of range, clamping");
            23
        });
        Self::at(now.date_naive(), hour)
    }

    /// The hour of the local date.
    pub fn at(date: NaiveDate, hour: u8) -> Self {
        #[expect(clippy::cast_possible_truncation)]
        let weekday = date.weekday().num_days_from_monday() as u8;
        Self { date, hour, weekday }
    }

    #[must_use]
    pub const fn is_weekend(self) -> bool {
        self.weekday >= 5
    }
}

pub trait Clock: Send + Sync {
    fn context(&self) -> TickContext;

    /// Time left until the top of the next local hour.
    fn until_next_hour(&self) -> Duration;
}

/// Wall clock in a civil time zone.
pub struct ZonedClock(pub Tz);

impl ZonedClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.0)
    }
}

impl Clock for ZonedClock {
    fn context(&self) -> TickContext {
        TickContext::from_datetime(&self.now())
    }

    fn until_next_hour(&self) -> Duration {
        until_next_hour(&self.now())
    }
}

pub fn until_next_hour<T: TimeZone>(now: &DateTime<T>) -> Duration {
    let elapsed = Duration::from_secs(u64::from(now.minute() * 60 + now.second()))
        + Duration::from_nanos(u64::from(now.nanosecond() % 1_000_000_000));
    Duration::from_secs(3600).saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use chrono_tz::Europe::Madrid;

    use super::*;

    #[test]
    fn context_ok() {
        let now = Madrid.with_ymd_and_hms(2024, 3, 5, 13, 45, 0).unwrap();
        let context = TickContext::from_datetime(&now);
        assert_eq!(context.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(context.hour, 13);
        assert_eq!(context.weekday, 1);
        assert!(!context.is_weekend());
    }

    #[test]
    fn context_uses_local_date() {
        // 23:30 UTC on Saturday is already Sunday in Madrid.
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap().with_timezone(&Madrid);
        let context = TickContext::from_datetime(&now);
        assert_eq!(context.date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(context.hour, 0);
        assert_eq!(context.weekday, 6);
        assert!(context.is_weekend());
    }

    #[test]
    fn at_saturday() {
        let context = TickContext::at(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), 7);
        assert_eq!((context.hour, context.weekday), (7, 5));
        assert!(context.is_weekend());
    }

    #[test]
    fn context_on_spring_forward() {
        // 01:30 UTC on the last Sunday of March 2024 is 03:30 CEST.
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 1, 30, 0).unwrap().with_timezone(&Madrid);
        assert_eq!(TickContext::from_datetime(&now).hour, 3);
    }

    #[test]
    fn until_next_hour_ok() {
        let now = Madrid.with_ymd_and_hms(2024, 3, 5, 13, 45, 30).unwrap();
        assert_eq!(until_next_hour(&now), Duration::from_secs(14 * 60 + 30));

        let now = Madrid.with_ymd_and_hms(2024, 3, 5, 13, 0, 0).unwrap();
        assert_eq!(until_next_hour(&now), Duration::from_secs(3600));
    }
}
