//! ISO-8601 duration parsing for the flip interval.
//!
//! Accepted shape: `P[nW][nD][T[nH][nM][n[.f]S]]`, designators in any case,
//! optional leading `+`. Years and months have no fixed length and are
//! refused.

use std::time::Duration;

use crate::{Error, Result};

/// Longest interval the scheduler accepts.
pub const MAX_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Parse an ISO-8601 duration and check it is usable as a flip interval.
pub fn parse_interval(input: &str) -> Result<Duration> {
    let duration = parse_duration(input)?;
    // A zero period would make the ticker spin.
    if duration.is_zero() {
        return Err(Error::invalid_interval(input, "interval must be greater than zero"));
    }
    if duration > MAX_INTERVAL {
        return Err(Error::invalid_interval(input, "interval must not exceed 12 hours"));
    }
    Ok(duration)
}

/// Parse an ISO-8601 duration without range checks.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let raw = input.trim();
    let body = match raw.as_bytes().first() {
        Some(b'+') => &raw[1..],
        Some(b'-') => return Err(Error::invalid_interval(input, "negative durations are not allowed")),
        _ => raw,
    };
    let body = body
        .strip_prefix(['P', 'p'])
        .ok_or_else(|| Error::invalid_interval(input, "expected a leading 'P'"))?;

    let (date, time) = match body.find(['T', 't']) {
        Some(idx) => (&body[..idx], Some(&body[idx + 1..])),
        None => (body, None),
    };

    let mut total: u128 = 0;
    let mut components = 0usize;

    for comp in Components::new(date) {
        let comp = comp.map_err(|reason| Error::invalid_interval(input, reason))?;
        let unit_secs = match comp.designator.to_ascii_uppercase() {
            'W' => 7 * 86_400,
            'D' => 86_400,
            'Y' | 'M' => {
                return Err(Error::invalid_interval(
                    input,
                    "years and months are not supported",
                ));
            },
            _ => return Err(Error::invalid_interval(input, "unknown date designator")),
        };
        comp.check_order(&['W', 'D'])
            .map_err(|reason| Error::invalid_interval(input, reason))?;
        total = comp
            .accumulate(total, unit_secs, false)
            .map_err(|reason| Error::invalid_interval(input, reason))?;
        components += 1;
    }

    if let Some(time) = time {
        if time.is_empty() {
            return Err(Error::invalid_interval(input, "'T' must be followed by a time component"));
        }
        for comp in Components::new(time) {
            let comp = comp.map_err(|reason| Error::invalid_interval(input, reason))?;
            let (unit_secs, fraction_ok) = match comp.designator.to_ascii_uppercase() {
                'H' => (3_600, false),
                'M' => (60, false),
                'S' => (1, true),
                _ => return Err(Error::invalid_interval(input, "unknown time designator")),
            };
            comp.check_order(&['H', 'M', 'S'])
                .map_err(|reason| Error::invalid_interval(input, reason))?;
            total = comp
                .accumulate(total, unit_secs, fraction_ok)
                .map_err(|reason| Error::invalid_interval(input, reason))?;
            components += 1;
        }
    }

    if components == 0 {
        return Err(Error::invalid_interval(input, "at least one component is required"));
    }

    let secs = u64::try_from(total / NANOS_PER_SEC)
        .map_err(|_| Error::invalid_interval(input, "duration is too large"))?;
    let nanos = (total % NANOS_PER_SEC) as u32;
    Ok(Duration::new(secs, nanos))
}

struct Component<'a> {
    whole: &'a str,
    fraction: Option<&'a str>,
    designator: char,
    previous: Option<char>,
}

impl Component<'_> {
    /// Designators must appear once each, in the given order.
    fn check_order(&self, order: &[char]) -> std::result::Result<(), &'static str> {
        let Some(prev) = self.previous else {
            return Ok(());
        };
        let rank = |c: char| order.iter().position(|o| *o == c.to_ascii_uppercase());
        match (rank(prev), rank(self.designator)) {
            (Some(p), Some(c)) if c > p => Ok(()),
            _ => Err("components are out of order or repeated"),
        }
    }

    /// Add this component, expressed in nanoseconds, to `total`.
    fn accumulate(
        &self,
        total: u128,
        unit_secs: u128,
        fraction_ok: bool,
    ) -> std::result::Result<u128, &'static str> {
        let whole: u128 = self.whole.parse().map_err(|_| "number is too large")?;
        let mut nanos = whole
            .checked_mul(unit_secs * NANOS_PER_SEC)
            .ok_or("duration is too large")?;
        if let Some(fraction) = self.fraction {
            if !fraction_ok {
                return Err("only seconds may carry a fraction");
            }
            // Sub-nanosecond digits are truncated.
            let digits: String = fraction.chars().take(9).collect();
            let scale = 10u128.pow(9 - digits.len() as u32);
            let frac: u128 = digits.parse().map_err(|_| "invalid fraction")?;
            nanos = nanos.checked_add(frac * scale).ok_or("duration is too large")?;
        }
        total.checked_add(nanos).ok_or("duration is too large")
    }
}

/// Splits `12H30M` style runs into number/designator pairs.
struct Components<'a> {
    rest: &'a str,
    previous: Option<char>,
}

impl<'a> Components<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            rest: s,
            previous: None,
        }
    }
}

impl<'a> Iterator for Components<'a> {
    type Item = std::result::Result<Component<'a>, &'static str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let s = self.rest;
        let digits = s.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            self.rest = "";
            return Some(Err("expected a number"));
        }
        let whole = &s[..digits];
        let mut pos = digits;

        let mut fraction = None;
        if matches!(s.as_bytes().get(pos), Some(b'.' | b',')) {
            let frac_len = s[pos + 1..].bytes().take_while(u8::is_ascii_digit).count();
            if frac_len == 0 {
                self.rest = "";
                return Some(Err("expected digits after the decimal mark"));
            }
            fraction = Some(&s[pos + 1..pos + 1 + frac_len]);
            pos += 1 + frac_len;
        }

        let Some(designator) = s[pos..].chars().next() else {
            self.rest = "";
            return Some(Err("number is missing a designator"));
        };
        self.rest = &s[pos + designator.len_utf8()..];
        if fraction.is_some() && !self.rest.is_empty() {
            self.rest = "";
            return Some(Err("a fraction is only allowed on the last component"));
        }

        let previous = self.previous.replace(designator);
        Some(Ok(Component {
            whole,
            fraction,
            designator,
            previous,
        }))
    }
}
