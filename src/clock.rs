use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Wall-clock time in `zone`
    fn local_now(&self, zone: Tz) -> NaiveDateTime {
        self.now().with_timezone(&zone).naive_local()
    }

    /// Start of the current hour in `zone`
    fn local_hour_start(&self, zone: Tz) -> NaiveDateTime {
        let local = self.local_now(zone);
        local
            .date()
            .and_hms_opt(local.hour(), 0, 0)
            .unwrap_or(local)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_time_follows_zone() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 10, 2, 12, 34, 56).unwrap());
        let local = clock.local_now(chrono_tz::Europe::Amsterdam);
        assert_eq!(local.to_string(), "2025-10-02 14:34:56");
        assert_eq!(
            clock.local_hour_start(chrono_tz::Europe::Amsterdam).to_string(),
            "2025-10-02 14:00:00"
        );
        assert_eq!(clock.local_hour_start(chrono_tz::UTC).to_string(), "2025-10-02 12:00:00");
    }
}
