//! Next-run computation for cron expressions in a fixed timezone.

use {
    chrono::{DateTime, NaiveTime, Timelike, Utc},
    chrono_tz::Tz,
    cron::Schedule,
};

use crate::{Error, Result};

/// Parse a cron expression.
///
/// The `cron` crate wants 6 or 7 fields (with seconds, optional year).
/// Standard 5-field expressions are padded with `0` seconds and `*` year.
pub fn parse_schedule(expr: &str) -> Result<Schedule> {
    expr.parse::<Schedule>().or_else(|_| {
        format!("0 {expr} *")
            .parse::<Schedule>()
            .map_err(|source| Error::InvalidExpression {
                expr: expr.to_string(),
                source,
            })
    })
}

/// 5-field expression firing every day at `time`.
pub fn daily_at(time: NaiveTime) -> String {
    format!("{} {} * * *", time.minute(), time.hour())
}

/// Next time `expr` fires strictly after `now`, evaluated in `tz`.
pub fn compute_next_run(expr: &str, tz: Tz, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
    let schedule = parse_schedule(expr)?;
    let now_local = now.with_timezone(&tz);
    Ok(schedule
        .after(&now_local)
        .next()
        .map(|dt| dt.with_timezone(&Utc)))
}
