//! Cycle expansion: template + start date + cycle count → dated shifts.
//!
//! Every downstream metric depends on calendar alignment, so bad input is a
//! `Configuration` error and never defaults to something plausible.

use crate::{CycleTemplate, DatedShift, Error, Result, ScheduleInstance};
use chrono::{DateTime, Datelike, Days, NaiveDate};

/// Parse a stored start date
///
/// Accepts `YYYY-MM-DD`, `MM/DD/YYYY`, and RFC 3339 timestamps (only the
/// calendar date is kept).
pub fn parse_start_date(raw: Option<&str>) -> Result<NaiveDate> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(Error::Configuration("schedule has no start date".into()));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| Error::Configuration(format!("unparseable start date '{}'", raw)))
}

/// Lay `cycles` repetitions of `template` onto consecutive days from `start`
pub fn expand_cycle(
    template: &CycleTemplate,
    start: NaiveDate,
    cycles: u32,
) -> Result<Vec<DatedShift>> {
    let cycle_length = template.len();
    if cycle_length == 0 {
        return Err(Error::Configuration("cycle template is empty".into()));
    }
    if cycles == 0 {
        return Err(Error::Configuration(
            "cycle count must be at least 1".into(),
        ));
    }

    let total = cycle_length
        .checked_mul(cycles as usize)
        .ok_or_else(|| Error::Configuration("schedule period is too long".into()))?;

    // Make sure the whole period fits in the calendar before iterating
    start
        .checked_add_days(Days::new(total as u64 - 1))
        .ok_or_else(|| {
            Error::Configuration(format!(
                "{} days from {} runs past the supported calendar",
                total, start
            ))
        })?;

    let shifts = start
        .iter_days()
        .take(total)
        .enumerate()
        .map(|(i, date)| {
            let slot = i % cycle_length;
            DatedShift {
                date,
                code: template.slots()[slot].clone(),
                weekday: date.weekday(),
                position: slot as u32 + 1,
            }
        })
        .collect();

    Ok(shifts)
}

/// Expand a stored schedule, parsing its start date
pub fn expand_schedule(schedule: &ScheduleInstance) -> Result<Vec<DatedShift>> {
    let start = parse_start_date(schedule.start_date.as_deref()).map_err(|e| match e {
        Error::Configuration(msg) => {
            Error::Configuration(format!("schedule '{}': {}", schedule.id, msg))
        }
        other => other,
    })?;
    let shifts = expand_cycle(&schedule.template, start, schedule.cycles)?;
    tracing::debug!(
        "Expanded schedule {} to {} days from {}",
        schedule.id,
        shifts.len(),
        start
    );
    Ok(shifts)
}
