//! Metrics pipeline: expand a schedule, resolve its codes, analyze, overlay
//! holidays.

use crate::analyzer::{analyze_cycle, analyze_full_span};
use crate::expander::expand_schedule;
use crate::overlay::HolidayOverlay;
use crate::{
    BlockCounting, DatedShift, Error, MetricsBundle, Result, ScheduleInstance, ShiftCodeTable,
};
use std::collections::BTreeMap;

/// Expand a schedule and drop codes missing from the reference table
///
/// An unknown code is a data-integrity problem with that day only: it is
/// logged and the day is treated as off.
pub fn resolved_shifts(
    schedule: &ScheduleInstance,
    table: &ShiftCodeTable,
) -> Result<Vec<DatedShift>> {
    let mut shifts = expand_schedule(schedule)?;

    let mut unknown: BTreeMap<String, usize> = BTreeMap::new();
    for shift in shifts.iter_mut() {
        if let Some(code) = &shift.code {
            if !table.contains(code) {
                *unknown.entry(code.clone()).or_default() += 1;
                shift.code = None;
            }
        }
    }

    for (code, days) in &unknown {
        let err = Error::DataIntegrity(format!(
            "schedule '{}' references unknown shift code '{}'",
            schedule.id, code
        ));
        tracing::warn!("{} ({} days treated as off)", err, days);
    }

    Ok(shifts)
}

/// Run the analyzer over an expanded schedule with the chosen block counting
pub fn analyze_shifts(
    shifts: &[DatedShift],
    cycle_length: usize,
    cycles: u32,
    counting: BlockCounting,
) -> MetricsBundle {
    match counting {
        BlockCounting::ScaleCycle => analyze_cycle(&shifts[..cycle_length.min(shifts.len())], cycles),
        BlockCounting::FullSpan => analyze_full_span(shifts, cycles),
    }
}

/// Compute the full metrics bundle for one schedule
pub fn compute_metrics(
    schedule: &ScheduleInstance,
    table: &ShiftCodeTable,
    overlay: &HolidayOverlay,
    jurisdiction: &str,
    counting: BlockCounting,
) -> Result<MetricsBundle> {
    let shifts = resolved_shifts(schedule, table)?;
    let mut metrics = analyze_shifts(&shifts, schedule.template.len(), schedule.cycles, counting);

    let overlap = overlay.overlay(&shifts, jurisdiction);
    metrics.holidays_worked = overlap.count;
    metrics.holiday_details = overlap.details;

    tracing::debug!(
        "Computed metrics for {}: {} days worked, {} full weekends, {} holidays",
        schedule.id,
        metrics.days_worked,
        metrics.full_weekends,
        metrics.holidays_worked
    );
    Ok(metrics)
}
