//! Purpose: Validate `--since`/`--duration` inputs and resolve them into a time window.
//! Exports: `TimeWindow`, `DurationToken`, `resolve`, `resolve_at`, `normalize_duration`.
//! Role: Syntactic gate in front of the repair-info remote call.
//! Invariants: Durations never carry explicit sign characters.
//! Invariants: Simple (`30m`) and ISO-8601 (`pt30m`) forms normalize to the same token.
//! Invariants: No numeric conversion happens here; the remote performs final parsing.
use std::fmt;

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::error::{Error, ErrorKind};

/// Canonical upper-cased ISO-8601 duration, e.g. `PT30M` or `P1D`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DurationToken(String);

impl DurationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DurationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anchoring of a repair-info query.
///
/// `start` is the parsed `since` value when one was given. `end` is only set
/// for duration-only windows, where it records "now" at dispatch time; the
/// remote re-evaluates its own clock, so treat it as advisory.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeWindow {
    pub since: Option<String>,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
    pub duration: Option<DurationToken>,
}

pub fn resolve(since: Option<&str>, duration: Option<&str>) -> Result<TimeWindow, Error> {
    resolve_at(since, duration, OffsetDateTime::now_utc())
}

pub fn resolve_at(
    since: Option<&str>,
    duration: Option<&str>,
    now: OffsetDateTime,
) -> Result<TimeWindow, Error> {
    let since = since.filter(|value| !value.is_empty());
    let duration = duration.filter(|value| !value.is_empty());
    if since.is_none() && duration.is_none() {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("Either --duration or --since or both must be provided"));
    }

    let duration = duration.map(normalize_duration).transpose()?;
    let start = since.map(parse_since).transpose()?;
    let end = if since.is_none() { Some(now) } else { None };

    Ok(TimeWindow {
        since: since.map(str::to_string),
        start,
        end,
        duration,
    })
}

pub fn normalize_duration(raw: &str) -> Result<DurationToken, Error> {
    if raw.starts_with('+') || raw.starts_with('-') {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("'+' and '-' is not allowed in duration, check help for more information"));
    }
    let upper = raw.trim().to_ascii_uppercase();
    if let Some(token) = simple_to_iso(&upper) {
        return Ok(DurationToken(token));
    }
    if is_iso_duration(&upper) {
        return Ok(DurationToken(upper));
    }
    Err(Error::new(ErrorKind::InvalidArgument)
        .with_message(format!("invalid duration '{raw}'"))
        .with_hint("Use a simple form like 30s, 30m, 1h, 1d or an ISO-8601 form like pt30m, p1d."))
}

fn simple_to_iso(upper: &str) -> Option<String> {
    let unit = upper.chars().last()?;
    let digits = &upper[..upper.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match unit {
        'S' | 'M' | 'H' => Some(format!("PT{digits}{unit}")),
        'D' => Some(format!("P{digits}D")),
        _ => None,
    }
}

fn is_iso_duration(upper: &str) -> bool {
    let Some(body) = upper.strip_prefix('P') else {
        return false;
    };
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => (date, Some(time)),
        None => (body, None),
    };
    let date_ok = match date_part {
        "" => true,
        part => components_in_order(part, &['D']).is_some_and(|count| count == 1),
    };
    let time_count = match time_part {
        None => Some(0),
        Some(part) => components_in_order(part, &['H', 'M', 'S']).filter(|count| *count > 0),
    };
    match time_count {
        Some(count) => date_ok && (count > 0 || !date_part.is_empty()),
        None => false,
    }
}

/// Counts `<number><unit>` components, requiring units to appear in the given
/// order at most once. Only the last component (`S`) may carry a fraction.
fn components_in_order(part: &str, units: &[char]) -> Option<usize> {
    let mut count = 0;
    let mut next_unit = 0;
    let mut number = String::new();
    for ch in part.chars() {
        if ch.is_ascii_digit() || ch == '.' {
            number.push(ch);
            continue;
        }
        let position = units[next_unit..].iter().position(|unit| *unit == ch)?;
        let unit = units[next_unit + position];
        if !valid_number(&number, unit == 'S') {
            return None;
        }
        number.clear();
        next_unit += position + 1;
        count += 1;
    }
    if !number.is_empty() {
        return None;
    }
    Some(count)
}

fn valid_number(number: &str, allow_fraction: bool) -> bool {
    match number.split_once('.') {
        None => !number.is_empty(),
        Some((whole, fraction)) => {
            allow_fraction
                && !whole.is_empty()
                && !fraction.is_empty()
                && !fraction.contains('.')
        }
    }
}

fn parse_since(raw: &str) -> Result<OffsetDateTime, Error> {
    let trimmed = raw.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let nanos = trimmed
            .parse::<i128>()
            .ok()
            .and_then(|millis| millis.checked_mul(1_000_000))
            .ok_or_else(|| invalid_since(raw))?;
        return OffsetDateTime::from_unix_timestamp_nanos(nanos).map_err(|_| invalid_since(raw));
    }
    OffsetDateTime::parse(trimmed, &Rfc3339).map_err(|err| invalid_since(raw).with_source(err))
}

fn invalid_since(raw: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument)
        .with_message(format!("invalid --since value '{raw}'"))
        .with_hint("Use ISO-8601 like 2022-08-22T12:00:00.0+02:00 or epoch milliseconds.")
}
