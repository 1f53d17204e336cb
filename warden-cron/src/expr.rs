//! Cron expression grammar: standard five-field expressions, `*`, `,`
//! lists, and `/step`, plus the `@every:<seconds>` shorthand.

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use std::collections::BTreeSet;
use thiserror::Error;

/// A parsed cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CronExpr {
    /// Standard five-field expression.
    Standard {
        /// Allowed minutes, 0-59.
        minute: BTreeSet<u32>,
        /// Allowed hours, 0-23.
        hour: BTreeSet<u32>,
        /// Allowed days of month, 1-31.
        dom: BTreeSet<u32>,
        /// Allowed months, 1-12.
        month: BTreeSet<u32>,
        /// Allowed days of week, 0 (Sunday) - 6 (Saturday).
        dow: BTreeSet<u32>,
    },
    /// `@every:<N>` — fires on every epoch-aligned multiple of N seconds.
    Every(u64),
}

/// A malformed cron expression.
#[non_exhaustive]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    /// A standard expression did not have exactly five whitespace-separated fields.
    #[error("expected 5 fields, found {0}")]
    WrongFieldCount(usize),
    /// One field's contents didn't parse as `*`, a comma list, or a `/step`.
    #[error("invalid field: {0}")]
    InvalidField(String),
    /// `@every:<N>` with a non-positive or unparsable N.
    #[error("invalid @every expression: {0}")]
    InvalidEvery(String),
}

fn parse_field(expr: &str, min: u32, max: u32) -> Result<BTreeSet<u32>, CronError> {
    let (base, step) = match expr.split_once('/') {
        Some((b, s)) => {
            let step: u32 = s
                .parse()
                .map_err(|_| CronError::InvalidField(expr.to_string()))?;
            if step == 0 {
                return Err(CronError::InvalidField(expr.to_string()));
            }
            (b, Some(step))
        }
        None => (expr, None),
    };

    let mut values = BTreeSet::new();
    if base == "*" {
        let step = step.unwrap_or(1);
        let mut v = min;
        while v <= max {
            values.insert(v);
            v += step;
        }
    } else {
        for part in base.split(',') {
            let start: u32 = part
                .trim()
                .parse()
                .map_err(|_| CronError::InvalidField(expr.to_string()))?;
            if start < min || start > max {
                return Err(CronError::InvalidField(expr.to_string()));
            }
            match step {
                Some(step) => {
                    let mut v = start;
                    while v <= max {
                        values.insert(v);
                        v += step;
                    }
                }
                None => {
                    values.insert(start);
                }
            }
        }
    }

    if values.is_empty() {
        return Err(CronError::InvalidField(expr.to_string()));
    }
    Ok(values)
}

impl CronExpr {
    /// Parse a cron expression: either `@every:<N>` or five whitespace
    /// separated fields (minute hour dom month dow).
    pub fn parse(expr: &str) -> Result<Self, CronError> {
        if let Some(rest) = expr.strip_prefix("@every:") {
            let seconds: u64 = rest
                .parse()
                .map_err(|_| CronError::InvalidEvery(expr.to_string()))?;
            if seconds == 0 {
                return Err(CronError::InvalidEvery(expr.to_string()));
            }
            return Ok(CronExpr::Every(seconds));
        }

        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronError::WrongFieldCount(fields.len()));
        }
        Ok(CronExpr::Standard {
            minute: parse_field(fields[0], 0, 59)?,
            hour: parse_field(fields[1], 0, 23)?,
            dom: parse_field(fields[2], 1, 31)?,
            month: parse_field(fields[3], 1, 12)?,
            dow: parse_field(fields[4], 0, 6)?,
        })
    }

    /// The earliest instant strictly after `after` that this expression
    /// matches, scanning minute-by-minute up to one year out. `None` if
    /// no match is found within that horizon (a self-contradictory
    /// expression, e.g. `dom` and `month` that never co-occur).
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            CronExpr::Every(seconds) => {
                let step = (*seconds) as i64;
                let next_epoch = (after.timestamp().div_euclid(step) + 1) * step;
                Utc.timestamp_opt(next_epoch, 0).single()
            }
            CronExpr::Standard {
                minute,
                hour,
                dom,
                month,
                dow,
            } => {
                let mut candidate = (after + Duration::minutes(1))
                    .with_second(0)
                    .and_then(|d| d.with_nanosecond(0))?;
                let limit = after + Duration::days(366);
                while candidate <= limit {
                    let dow_num = candidate.weekday().num_days_from_sunday();
                    if month.contains(&candidate.month())
                        && dom.contains(&candidate.day())
                        && dow.contains(&dow_num)
                        && hour.contains(&candidate.hour())
                        && minute.contains(&candidate.minute())
                    {
                        return Some(candidate);
                    }
                    candidate += Duration::minutes(1);
                }
                None
            }
        }
    }
}
