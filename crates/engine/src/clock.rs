//! Wall-clock source for time windows and "today".

use std::sync::Mutex;

use {
    chrono::{DateTime, NaiveDate, NaiveTime, Utc},
    chrono_tz::Tz,
};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Timezone the class schedule is expressed in.
    fn tz(&self) -> Tz;

    fn local_now(&self) -> DateTime<Tz> {
        self.now().with_timezone(&self.tz())
    }

    fn today(&self) -> NaiveDate {
        self.local_now().date_naive()
    }

    fn local_time(&self) -> NaiveTime {
        self.local_now().time()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn tz(&self) -> Tz {
        self.tz
    }
}

/// Settable clock for tests and simulation.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    tz: Tz,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            now: Mutex::new(now),
            tz,
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn tz(&self) -> Tz {
        self.tz
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::TimeZone};

    #[test]
    fn local_date_follows_timezone() {
        // 02:00 UTC is still the previous evening in La Paz (UTC-4).
        let clock = FixedClock::new(
            Utc.with_ymd_and_hms(2021, 9, 7, 2, 0, 0).unwrap(),
            chrono_tz::America::La_Paz,
        );
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2021, 9, 6).unwrap());
        assert_eq!(
            clock.local_time(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap()
        );
    }

    #[test]
    fn set_moves_the_clock() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2021, 9, 6, 7, 0, 0).unwrap(), chrono_tz::UTC);
        clock.set(Utc.with_ymd_and_hms(2021, 9, 6, 7, 30, 0).unwrap());
        assert_eq!(clock.local_time(), NaiveTime::from_hms_opt(7, 30, 0).unwrap());
    }
}
