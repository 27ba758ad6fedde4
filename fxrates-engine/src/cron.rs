use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use fxrates_core::{FxError, FxResult};

/// One field of a Quartz-style cron expression: a wildcard, an exact value,
/// or a `*/N` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Any,
    Exact(u32),
    Step(u32),
}

impl Field {
    fn parse(raw: &str, max: u32) -> FxResult<Self> {
        if raw == "*" {
            return Ok(Self::Any);
        }
        if let Some(step) = raw.strip_prefix("*/") {
            let n: u32 = step
                .parse()
                .map_err(|_| FxError::InvalidRequest(format!("invalid cron step field: {raw}")))?;
            if n == 0 || n > max {
                return Err(FxError::InvalidRequest(format!(
                    "cron step field out of range: {raw}"
                )));
            }
            return Ok(Self::Step(n));
        }
        let n: u32 = raw
            .parse()
            .map_err(|_| FxError::InvalidRequest(format!("invalid cron field: {raw}")))?;
        if n > max {
            return Err(FxError::InvalidRequest(format!("cron field out of range: {raw}")));
        }
        Ok(Self::Exact(n))
    }

    fn matches(self, value: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(n) => n == value,
            Self::Step(n) => value % n == 0,
        }
    }
}

/// A minimal 6-field Quartz-style cron schedule: `sec min hour day month
/// dow`. Only wildcards, exact values, and `*/N` steps on the time fields
/// are supported — enough to express "daily at a fixed UTC time", which is
/// all this service's scheduler needs.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    second: Field,
    minute: Field,
    hour: Field,
    day: Field,
    month: Field,
    day_of_week: Field,
}

impl CronSchedule {
    /// Parse a 6-field cron expression, e.g. `"0 0 23 * * *"` for daily at
    /// 23:00:00 UTC.
    ///
    /// # Errors
    /// Returns [`FxError::InvalidRequest`] if the expression does not have
    /// exactly six whitespace-separated fields or a field is out of range.
    pub fn parse(expr: &str) -> FxResult<Self> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        let [sec, min, hour, day, month, dow] = fields.as_slice() else {
            return Err(FxError::InvalidRequest(format!(
                "cron expression must have exactly 6 fields, got {}: {expr}",
                fields.len()
            )));
        };
        Ok(Self {
            second: Field::parse(sec, 59)?,
            minute: Field::parse(min, 59)?,
            hour: Field::parse(hour, 23)?,
            day: Field::parse(day, 31)?,
            month: Field::parse(month, 12)?,
            day_of_week: Field::parse(dow, 6)?,
        })
    }

    fn matches(&self, at: DateTime<Utc>) -> bool {
        self.second.matches(at.second())
            && self.minute.matches(at.minute())
            && self.hour.matches(at.hour())
            && self.day.matches(at.day())
            && self.month.matches(at.month())
            && self.day_of_week.matches(weekday_as_cron_dow(at.date_naive()))
    }

    /// First instant strictly after `after` that this schedule matches,
    /// scanning second-by-second up to one year out. A full cron-grammar
    /// implementation would compute this analytically; for a schedule that
    /// only ever expresses a handful of fixed daily fire times, scanning is
    /// simple and fast enough in practice.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut candidate = after + Duration::seconds(1);
        let limit = after + Duration::days(366);
        while candidate <= limit {
            if self.matches(candidate) {
                return Some(candidate);
            }
            candidate += Duration::seconds(1);
        }
        None
    }
}

/// Quartz day-of-week numbering: `0` = Sunday .. `6` = Saturday.
fn weekday_as_cron_dow(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_sunday()
}
