//! Validation of stored metrics before anything consumes them.
//!
//! Bundles supplied by external storage have been seen carrying a count
//! equal to the schedule's own line number, an upstream corruption
//! signature. This is the one place such values are detected and reset;
//! consumers use [`ScheduleInstance::validated_metrics`] and never repair
//! values themselves.
//!
//! A bundle the engine recorded for the schedule's current inputs is taken
//! as-is. Otherwise each count is compared with the value recomputed from
//! the schedule's shifts when those are available, so a correct count that
//! happens to equal the line number is kept.

use crate::{BlockCounting, MetricsBundle, ScheduleInstance};

/// Stored metrics after validation, with the fields that were reset
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedMetrics {
    pub metrics: MetricsBundle,
    pub corrected: Vec<String>,
    /// Recorded for inputs the schedule no longer has
    pub stale: bool,
}

impl ValidatedMetrics {
    pub fn was_corrected(&self) -> bool {
        !self.corrected.is_empty()
    }
}

/// Every count in a bundle, in a fixed order
///
/// The flag marks per-bucket tallies (histogram buckets, weekday counts,
/// block heuristics). These routinely equal the cycle count, so matching
/// the line number says nothing about them on its own.
fn count_fields(metrics: &mut MetricsBundle) -> Vec<(String, bool, &mut u32)> {
    let mut fields = vec![
        ("full_weekends".to_string(), false, &mut metrics.full_weekends),
        ("orphan_saturdays".to_string(), false, &mut metrics.orphan_saturdays),
        ("orphan_sundays".to_string(), false, &mut metrics.orphan_sundays),
        ("weekends_off".to_string(), true, &mut metrics.weekends_off),
        ("longest_stretch".to_string(), false, &mut metrics.longest_stretch),
        ("days_worked".to_string(), false, &mut metrics.days_worked),
        ("holidays_worked".to_string(), false, &mut metrics.holidays_worked),
        ("friday_weekend_blocks".to_string(), true, &mut metrics.friday_weekend_blocks),
        ("weekday_blocks".to_string(), true, &mut metrics.weekday_blocks),
    ];
    for (i, count) in metrics.blocks.counts.iter_mut().enumerate() {
        fields.push((format!("blocks[{}]", i + 1), true, count));
    }
    for (i, day) in metrics.weekdays.days.iter_mut().enumerate() {
        fields.push((format!("weekdays[{}].worked", i), true, &mut day.worked));
    }
    fields
}

/// Reset implausible counts in a stored bundle to zero
///
/// A count equal to the schedule's line number (for a non-zero line number)
/// is reset when it differs from `reference`, the bundle recomputed from the
/// schedule's shifts. Without a reference only the summary counts are held
/// to that check. Any count exceeding the days in the period is reset, as is
/// a weekday worked count exceeding that weekday's total.
pub fn sanitize_metrics(
    metrics: &MetricsBundle,
    line_number: u32,
    schedule_id: &str,
    reference: Option<&MetricsBundle>,
) -> ValidatedMetrics {
    let mut clean = metrics.clone();
    let mut corrected = Vec::new();
    let days = clean.days_in_period;

    let mut reference = reference.cloned();
    let expected: Option<Vec<u32>> = reference
        .as_mut()
        .map(|r| count_fields(r).into_iter().map(|(_, _, value)| *value).collect());

    for (i, (name, tally, value)) in count_fields(&mut clean).into_iter().enumerate() {
        let matches_line = line_number > 0 && *value == line_number;
        let reason = match &expected {
            Some(expected) if matches_line && expected.get(i).copied() != Some(*value) => {
                Some("equals the schedule line number")
            }
            None if matches_line && !tally => Some("equals the schedule line number"),
            _ if days > 0 && *value > days => Some("exceeds the days in the period"),
            _ => None,
        };
        if let Some(reason) = reason {
            tracing::warn!(
                "Schedule {}: stored {} = {} {}; using 0",
                schedule_id,
                name,
                value,
                reason
            );
            *value = 0;
            corrected.push(name);
        }
    }

    for (i, day) in clean.weekdays.days.iter_mut().enumerate() {
        if day.worked > day.total {
            tracing::warn!(
                "Schedule {}: stored weekday {} worked {} of {}; using 0",
                schedule_id,
                i,
                day.worked,
                day.total
            );
            day.worked = 0;
            corrected.push(format!("weekdays[{}].worked", i));
        }
    }

    if clean.holidays_worked == 0 {
        clean.holiday_details.clear();
    }

    ValidatedMetrics {
        metrics: clean,
        corrected,
        stale: false,
    }
}

impl ScheduleInstance {
    /// Whether the attached bundle was recorded from this schedule's current
    /// template, start date and cycle count under `counting`
    pub fn metrics_are_current(&self, counting: BlockCounting) -> bool {
        self.metrics_version.as_ref().is_some_and(|version| {
            version.template == self.template
                && version.start_date == self.start_date
                && version.cycles == self.cycles
                && version.block_counting == counting
        })
    }

    /// Stored metrics, validated once at the storage boundary
    ///
    /// `reference` is the bundle recomputed from the schedule's shifts, if
    /// they could be expanded.
    pub fn validated_metrics(
        &self,
        counting: BlockCounting,
        reference: Option<&MetricsBundle>,
    ) -> Option<ValidatedMetrics> {
        let metrics = self.metrics.as_ref()?;
        if self.metrics_are_current(counting) {
            return Some(ValidatedMetrics {
                metrics: metrics.clone(),
                corrected: Vec::new(),
                stale: false,
            });
        }

        let mut validated = sanitize_metrics(metrics, self.line_number, &self.id, reference);
        validated.stale = self.metrics_version.is_some();
        Some(validated)
    }
}
