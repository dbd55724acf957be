//! First-tick alignment and deadline arithmetic.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, SecondsFormat};

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;

/// Wall-clock boundary the first tick waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    TopOfHour,
    TopOfMinute,
    /// Sub-minute intervals tick right away.
    Immediate,
}

impl Alignment {
    pub fn for_interval(interval: Duration) -> Self {
        let ms = interval.as_millis();
        if ms >= u128::from(HOUR_MS) {
            Self::TopOfHour
        } else if ms >= u128::from(MINUTE_MS) {
            Self::TopOfMinute
        } else {
            Self::Immediate
        }
    }

    fn unit_ms(self) -> Option<u64> {
        match self {
            Self::TopOfHour => Some(HOUR_MS),
            Self::TopOfMinute => Some(MINUTE_MS),
            Self::Immediate => None,
        }
    }
}

/// Epoch millis of the first tick for a scheduler started at `now_ms`.
///
/// Boundaries are UTC. A start exactly on a boundary waits for the next one.
pub fn first_tick_ms(now_ms: u64, interval: Duration) -> u64 {
    match Alignment::for_interval(interval).unit_ms() {
        Some(unit) => (now_ms / unit + 1) * unit,
        None => now_ms,
    }
}

/// Move a deadline (as an offset from the loop's origin) forward by one
/// interval, then past any slots that `now` has already overtaken.
///
/// Returns the new deadline and how many slots were skipped.
pub fn advance_deadline(deadline: Duration, interval: Duration, now: Duration) -> (Duration, u32) {
    let next = deadline + interval;
    if next >= now || interval.is_zero() {
        return (next, 0);
    }
    let behind = (now - next).as_nanos();
    let missed = u32::try_from(behind.div_ceil(interval.as_nanos())).unwrap_or(u32::MAX);
    (next + interval * missed, missed)
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// RFC 3339 rendering of epoch millis for log fields.
pub fn format_ms(ms: u64) -> String {
    DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ms.to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::{TimeZone, Utc},
        rstest::rstest,
    };

    fn at(h: u32, m: u32, s: u32) -> u64 {
        Utc.with_ymd_and_hms(2026, 3, 14, h, m, s)
            .unwrap()
            .timestamp_millis() as u64
    }

    #[rstest]
    #[case::hour(Duration::from_secs(3600), Alignment::TopOfHour)]
    #[case::six_hours(Duration::from_secs(6 * 3600), Alignment::TopOfHour)]
    #[case::just_under_hour(Duration::from_secs(3599), Alignment::TopOfMinute)]
    #[case::minute(Duration::from_secs(60), Alignment::TopOfMinute)]
    #[case::forty_five_minutes(Duration::from_secs(45 * 60), Alignment::TopOfMinute)]
    #[case::just_under_minute(Duration::from_millis(59_999), Alignment::Immediate)]
    #[case::five_seconds(Duration::from_secs(5), Alignment::Immediate)]
    fn alignment_by_interval(#[case] interval: Duration, #[case] expected: Alignment) {
        assert_eq!(Alignment::for_interval(interval), expected);
    }

    #[test]
    fn hourly_aligns_to_next_hour() {
        let first = first_tick_ms(at(14, 23, 10), Duration::from_secs(3600));
        assert_eq!(first, at(15, 0, 0));
    }

    #[test]
    fn sub_hour_aligns_to_next_minute() {
        let first = first_tick_ms(at(14, 23, 10), Duration::from_secs(45 * 60));
        assert_eq!(first, at(14, 24, 0));
    }

    #[test]
    fn sub_minute_ticks_immediately() {
        let now = at(14, 23, 10) + 437;
        assert_eq!(first_tick_ms(now, Duration::from_secs(5)), now);
    }

    #[test]
    fn start_on_boundary_waits_for_next() {
        assert_eq!(
            first_tick_ms(at(14, 0, 0), Duration::from_secs(3600)),
            at(15, 0, 0)
        );
        assert_eq!(
            first_tick_ms(at(14, 23, 0), Duration::from_secs(60)),
            at(14, 24, 0)
        );
    }

    #[test]
    fn hourly_crosses_midnight() {
        let now = at(23, 59, 59);
        let next_day = Utc
            .with_ymd_and_hms(2026, 3, 15, 0, 0, 0)
            .unwrap()
            .timestamp_millis() as u64;
        assert_eq!(first_tick_ms(now, Duration::from_secs(2 * 3600)), next_day);
    }

    #[test]
    fn advance_on_time() {
        let s = Duration::from_secs;
        assert_eq!(advance_deadline(s(0), s(5), s(1)), (s(5), 0));
        assert_eq!(advance_deadline(s(10), s(5), s(15)), (s(15), 0));
    }

    #[test]
    fn advance_skips_overtaken_slots() {
        let s = Duration::from_secs;
        // Pass started at 0 and ran for 12s: slots 5 and 10 are gone.
        assert_eq!(advance_deadline(s(0), s(5), s(12)), (s(15), 2));
        // Finishing exactly on a slot keeps that slot.
        assert_eq!(advance_deadline(s(0), s(5), s(10)), (s(10), 1));
    }

    #[test]
    fn format_is_rfc3339() {
        assert_eq!(format_ms(at(15, 0, 0)), "2026-03-14T15:00:00Z");
    }
}
