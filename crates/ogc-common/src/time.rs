//! Time dimension parsing for capabilities documents.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{OgcError, OgcResult};

/// Upper bound on values produced by expanding `start/end/period` intervals.
const MAX_EXPANDED_VALUES: usize = 100_000;

/// Time dimension declared by a layer.
///
/// `values` is the raw text content of the `Dimension` (WMS 1.3.0) or
/// `Extent` (WMS 1.1.1) element, e.g. `2020-01-01,2020-01-11` or
/// `2020-01-01/2020-12-31/P10D`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDimension {
    pub values: String,
    pub default: Option<String>,
}

impl TimeDimension {
    pub fn new(values: impl Into<String>, default: Option<String>) -> Self {
        Self {
            values: values.into(),
            default,
        }
    }

    /// Expand the declared values into discrete ISO-8601 strings, ascending
    /// and without duplicates.
    ///
    /// Plain list items are returned verbatim; expanded interval items keep
    /// the style of their start value (date-only stays date-only) unless the
    /// period has a time component.
    pub fn expand(&self) -> OgcResult<Vec<String>> {
        let mut entries: Vec<(DateTime<Utc>, String)> = Vec::new();

        for item in self.values.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if item.contains('/') {
                expand_interval(item, &mut entries)?;
            } else {
                let (dt, _) = parse_instant(item)?;
                entries.push((dt, item.to_string()));
            }
        }

        entries.sort_by_key(|(dt, _)| *dt);
        entries.dedup_by_key(|(dt, _)| *dt);
        Ok(entries.into_iter().map(|(_, s)| s).collect())
    }
}

/// How an instant was written, so expanded values can be written the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstantStyle {
    Date,
    Seconds,
    Millis,
}

impl InstantStyle {
    fn format(&self, dt: &DateTime<Utc>) -> String {
        match self {
            InstantStyle::Date => dt.format("%Y-%m-%d").to_string(),
            InstantStyle::Seconds => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            InstantStyle::Millis => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Parse an ISO 8601 instant, assuming UTC when no offset is given.
pub fn parse_iso8601(s: &str) -> OgcResult<DateTime<Utc>> {
    parse_instant(s).map(|(dt, _)| dt)
}

fn parse_instant(s: &str) -> OgcResult<(DateTime<Utc>, InstantStyle)> {
    let s = s.trim();
    let style = if !s.contains('T') {
        InstantStyle::Date
    } else if s.contains('.') {
        InstantStyle::Millis
    } else {
        InstantStyle::Seconds
    };

    // Full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok((dt.with_timezone(&Utc), style));
    }

    // Without timezone (assume UTC)
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok((Utc.from_utc_datetime(&ndt), style));
        }
    }

    // Date only
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok((Utc.from_utc_datetime(&ndt), InstantStyle::Date));
        }
    }

    Err(OgcError::InvalidTime(format!("unrecognized instant '{}'", s)))
}

fn expand_interval(item: &str, out: &mut Vec<(DateTime<Utc>, String)>) -> OgcResult<()> {
    let parts: Vec<&str> = item.split('/').map(str::trim).collect();
    let (start_str, end_str, period) = match parts.as_slice() {
        [start, end] => (*start, *end, None),
        [start, end, period] => (*start, *end, Some(IsoPeriod::parse(period)?)),
        _ => return Err(OgcError::InvalidTime(format!("invalid interval '{}'", item))),
    };

    let (start, style) = parse_instant(start_str)?;
    let (end, _) = parse_instant(end_str)?;
    if end < start {
        return Err(OgcError::InvalidTime(format!(
            "interval '{}' ends before it starts",
            item
        )));
    }

    let Some(period) = period else {
        out.push((start, start_str.to_string()));
        out.push((end, end_str.to_string()));
        return Ok(());
    };

    // Sub-day steps cannot be written as dates
    let style = match style {
        InstantStyle::Date if period.seconds != 0 => InstantStyle::Seconds,
        style => style,
    };

    let mut step: u32 = 0;
    loop {
        let value = period
            .nth_after(&start, step)
            .ok_or_else(|| OgcError::InvalidTime(format!("interval '{}' overflows", item)))?;
        if value > end {
            break;
        }
        out.push((value, style.format(&value)));

        step += 1;
        if step as usize > MAX_EXPANDED_VALUES {
            return Err(OgcError::InvalidTime(format!(
                "interval '{}' expands to more than {} values",
                item, MAX_EXPANDED_VALUES
            )));
        }
    }

    Ok(())
}

/// An ISO 8601 duration such as `P1D`, `P16D`, `P1M` or `PT6H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsoPeriod {
    pub months: u32,
    pub days: i64,
    pub seconds: i64,
}

impl IsoPeriod {
    /// Parse `PnYnMnWnDTnHnMnS`. Fractional components are not accepted.
    pub fn parse(s: &str) -> OgcResult<Self> {
        let invalid = || OgcError::InvalidTime(format!("invalid period '{}'", s));

        let body = s.trim().strip_prefix('P').ok_or_else(invalid)?;
        let (date_part, time_part) = match body.split_once('T') {
            Some((d, t)) => (d, Some(t)),
            None => (body, None),
        };

        let mut period = IsoPeriod {
            months: 0,
            days: 0,
            seconds: 0,
        };
        let mut seen_any = false;

        for (value, unit) in components(date_part).ok_or_else(invalid)? {
            seen_any = true;
            match unit {
                'Y' | 'M' => {
                    let months = if unit == 'Y' { value.checked_mul(12) } else { Some(value) };
                    let months = months.and_then(|m| u32::try_from(m).ok()).ok_or_else(invalid)?;
                    period.months = period.months.checked_add(months).ok_or_else(invalid)?;
                }
                'W' | 'D' => {
                    let days = if unit == 'W' { value.checked_mul(7) } else { Some(value) };
                    period.days = days
                        .and_then(|d| period.days.checked_add(d))
                        .ok_or_else(invalid)?;
                }
                _ => return Err(invalid()),
            }
        }
        if let Some(time_part) = time_part {
            for (value, unit) in components(time_part).ok_or_else(invalid)? {
                seen_any = true;
                let scale = match unit {
                    'H' => 3600,
                    'M' => 60,
                    'S' => 1,
                    _ => return Err(invalid()),
                };
                period.seconds = value
                    .checked_mul(scale)
                    .and_then(|secs| period.seconds.checked_add(secs))
                    .ok_or_else(invalid)?;
            }
        }

        if !seen_any || (period.months == 0 && period.days == 0 && period.seconds == 0) {
            return Err(invalid());
        }
        Ok(period)
    }

    /// `start + n * self`, computed from the start to avoid month-end drift.
    fn nth_after(&self, start: &DateTime<Utc>, n: u32) -> Option<DateTime<Utc>> {
        let with_months = start.checked_add_months(Months::new(self.months.checked_mul(n)?))?;
        let days = Duration::try_days(self.days.checked_mul(n as i64)?)?;
        let seconds = Duration::try_seconds(self.seconds.checked_mul(n as i64)?)?;
        with_months.checked_add_signed(days)?.checked_add_signed(seconds)
    }
}

/// Split `3Y2M10D` into `[(3, 'Y'), (2, 'M'), (10, 'D')]`.
fn components(s: &str) -> Option<Vec<(i64, char)>> {
    let mut out = Vec::new();
    let mut digits = String::new();
    for c in s.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if digits.is_empty() {
                return None;
            }
            out.push((digits.parse().ok()?, c));
            digits.clear();
        }
    }
    if !digits.is_empty() {
        return None;
    }
    Some(out)
}
