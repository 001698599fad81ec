// wap-core/src/domain/workflow/schedule.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::domain::error::DomainError;

pub const DEFAULT_SCHEDULE: &str = "*/1 * * * *";

/// A cron trigger. Accepts the classic five-field form (minute precision) as
/// well as the six/seven-field form of the `cron` crate (seconds first).
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    pub fn parse(expression: &str) -> Result<Self, DomainError> {
        let trimmed = expression.trim();
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let invalid = |reason: String| DomainError::InvalidSchedule {
            expression: expression.to_string(),
            reason,
        };

        let normalized = match fields.len() {
            // crontab: min hour dom month dow, Sunday = 0 (or 7)
            5 => {
                let dow = crontab_day_of_week(fields[4]).map_err(invalid)?;
                format!("0 {} {}", fields[..4].join(" "), dow)
            }
            6 | 7 => trimmed.to_string(),
            n => return Err(invalid(format!("expected 5 to 7 fields, got {}", n))),
        };

        let schedule =
            Schedule::from_str(&normalized).map_err(|e| DomainError::InvalidSchedule {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First tick strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Ticks in `(from, to]`, capped to `limit`.
    pub fn ticks_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: usize,
    ) -> Vec<DateTime<Utc>> {
        self.schedule
            .after(&from)
            .take_while(|t| *t <= to)
            .take(limit)
            .collect()
    }
}

/// Rewrites a crontab day-of-week field (0-7, Sunday = 0 or 7) into the
/// numbering of the `cron` crate (1-7, Sunday = 1). Numeric items are
/// expanded into an explicit list; named days pass through untouched.
fn crontab_day_of_week(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let parse_day = |raw: &str| -> Result<u32, String> {
        match raw.parse::<u32>() {
            Ok(day) if day <= 7 => Ok(day),
            _ => Err(format!("invalid day of week '{}'", raw)),
        }
    };

    let mut days: Vec<u32> = Vec::new();
    let mut named: Vec<&str> = Vec::new();

    for item in field.split(',') {
        if item.chars().any(|c| c.is_ascii_alphabetic()) {
            named.push(item);
            continue;
        }

        let (range, step) = match item.split_once('/') {
            Some((range, step)) => match step.parse::<usize>() {
                Ok(step) if step > 0 => (range, Some(step)),
                _ => return Err(format!("invalid step in '{}'", item)),
            },
            None => (item, None),
        };

        let (start, end) = if range == "*" {
            (0, 6)
        } else if let Some((a, b)) = range.split_once('-') {
            (parse_day(a)?, parse_day(b)?)
        } else {
            let day = parse_day(range)?;
            // "n/step" runs from n to the end of the week
            if step.is_some() { (day, 6) } else { (day, day) }
        };
        if start > end {
            return Err(format!("invalid range '{}'", range));
        }

        days.extend((start..=end).step_by(step.unwrap_or(1)).map(|d| d % 7 + 1));
    }

    days.sort_unstable();
    days.dedup();

    let mut items: Vec<String> = days.iter().map(|d| d.to_string()).collect();
    items.extend(named.iter().map(|n| n.to_string()));
    Ok(items.join(","))
}
