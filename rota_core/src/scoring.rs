//! Preference scoring.
//!
//! [`score_schedule`] is the only way to score a schedule. It expands the
//! criteria's category and length selectors into concrete shift codes itself,
//! so every caller gets the same score for the same criteria.
//!
//! Block and weekend factors read the schedule's metrics. A bundle the
//! engine recorded for the schedule's current inputs is used as-is; any
//! other stored bundle is validated against the metrics recomputed from the
//! shifts with the same block counting, so every call path agrees.
//!
//! Each active factor yields a 0–100 sub-score. The total is the weighted
//! average of those sub-scores, so it stays within 0–100 whatever the
//! weights. Scoring never fails: a factor that cannot be evaluated counts as
//! a non-match and carries a note explaining why.

use crate::config::ScoringConfig;
use crate::metrics::{analyze_shifts, resolved_shifts};
use crate::{
    BlockCounting, Criteria, DatedShift, FactorScore, MetricsBundle, ScheduleInstance,
    ScoreFactor, ScoreResult, ShiftCodeTable, DEFAULT_WEIGHT,
};
use chrono::{NaiveDate, Weekday};
use std::collections::{BTreeSet, HashMap};

/// Result of evaluating a single factor
enum Outcome {
    /// The criteria do not ask about this factor
    Inactive,
    Score(f64),
    /// Could not be evaluated; scored as a non-match
    Failed(String),
}

/// Everything the factor functions read
struct Evidence<'a> {
    schedule: &'a ScheduleInstance,
    shifts: Result<Vec<DatedShift>, String>,
    metrics: Option<MetricsBundle>,
    codes: BTreeSet<String>,
}

/// Score one schedule against one set of criteria
///
/// `counting` must be the mode stored metrics are computed with.
pub fn score_schedule(
    schedule: &ScheduleInstance,
    table: &ShiftCodeTable,
    criteria: &Criteria,
    settings: &ScoringConfig,
    counting: BlockCounting,
) -> ScoreResult {
    let mut notes = Vec::new();

    let codes = expand_codes(criteria, table, &mut notes);

    let shifts = resolved_shifts(schedule, table).map_err(|e| e.to_string());
    if let Err(e) = &shifts {
        notes.push(e.clone());
    }

    let live = shifts
        .as_ref()
        .ok()
        .map(|shifts| analyze_shifts(shifts, schedule.template.len(), schedule.cycles, counting));

    let metrics = match schedule.validated_metrics(counting, live.as_ref()) {
        Some(validated) if validated.stale && live.is_some() => {
            notes.push("stored metrics out of date; recomputed".into());
            live
        }
        Some(validated) => {
            if validated.was_corrected() {
                notes.push(format!(
                    "stored metrics corrected: {}",
                    validated.corrected.join(", ")
                ));
            }
            Some(validated.metrics)
        }
        None => live,
    };

    let worked_days = match (&shifts, &metrics) {
        (Ok(shifts), _) => Some(shifts.iter().filter(|s| s.is_worked()).count()),
        (Err(_), Some(metrics)) => Some(metrics.days_worked as usize),
        (Err(_), None) => None,
    };
    if worked_days == Some(0) {
        let score = bounded(settings.empty_schedule_score);
        tracing::debug!("Schedule {} has no worked shifts, scoring {}", schedule.id, score);
        return ScoreResult {
            schedule_id: schedule.id.clone(),
            score,
            factors: Vec::new(),
            explanation: format!("Schedule has no worked shifts; fallback score {:.1}.", score),
        };
    }

    let evidence = Evidence {
        schedule,
        shifts,
        metrics,
        codes,
    };

    let mut factors = Vec::new();
    for factor in ScoreFactor::ALL {
        let outcome = match factor {
            ScoreFactor::Group => group_match(criteria, &evidence),
            ScoreFactor::DayOff => day_off_match(criteria, &evidence),
            ScoreFactor::ShiftCodes => shift_code_match(criteria, &evidence),
            ScoreFactor::BlockSize => block_size_match(criteria, &evidence),
            ScoreFactor::Weekends => weekend_match(criteria, &evidence),
        };
        let (score, note) = match outcome {
            Outcome::Inactive => continue,
            Outcome::Score(score) => (score, None),
            Outcome::Failed(note) => (0.0, Some(note)),
        };
        let score = bounded(score);
        factors.push(FactorScore {
            factor,
            score,
            weight: effective_weight(criteria.weight(factor), settings),
            note,
        });
    }

    let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
    let score = if factors.is_empty() || total_weight <= 0.0 {
        settings.neutral_score
    } else {
        factors.iter().map(|f| f.score * f.weight).sum::<f64>() / total_weight
    };
    let score = if score.is_finite() {
        bounded(score)
    } else {
        bounded(settings.neutral_score)
    };

    let explanation = explain(score, &factors, &notes);
    tracing::debug!("Scored schedule {}: {:.1}", schedule.id, score);

    ScoreResult {
        schedule_id: schedule.id.clone(),
        score,
        factors,
        explanation,
    }
}

/// Score every schedule and order them best first (ties by line number)
pub fn rank_schedules(
    schedules: &[ScheduleInstance],
    table: &ShiftCodeTable,
    criteria: &Criteria,
    settings: &ScoringConfig,
    counting: BlockCounting,
) -> Vec<ScoreResult> {
    let mut scored: Vec<(u32, ScoreResult)> = schedules
        .iter()
        .map(|s| (s.line_number, score_schedule(s, table, criteria, settings, counting)))
        .collect();

    scored.sort_by(|(line_a, a), (line_b, b)| {
        b.score.total_cmp(&a.score).then_with(|| line_a.cmp(line_b))
    });

    scored.into_iter().map(|(_, result)| result).collect()
}

/// Explicit codes plus every code sharing a selected category or length
fn expand_codes(criteria: &Criteria, table: &ShiftCodeTable, notes: &mut Vec<String>) -> BTreeSet<String> {
    let mut codes: BTreeSet<String> = criteria
        .codes
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    for category in &criteria.categories {
        let matched = table.codes_in_category(category);
        if matched.is_empty() {
            notes.push(format!("category '{}' matches no shift codes", category));
        }
        codes.extend(matched);
    }
    for length in &criteria.lengths {
        let matched = table.codes_with_length(length);
        if matched.is_empty() {
            notes.push(format!("length '{}' matches no shift codes", length));
        }
        codes.extend(matched);
    }

    codes
}

/// Clamp into the configured range; non-finite weights fall back to the default
fn effective_weight(raw: f64, settings: &ScoringConfig) -> f64 {
    let weight = if raw.is_finite() { raw } else { DEFAULT_WEIGHT };
    weight.max(settings.min_weight).min(settings.max_weight)
}

/// Into 0..=100; non-finite values become 0
fn bounded(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        0.0
    } else {
        100.0 * part / whole
    }
}

/// 100 when actual equals desired, falling off as the ratio between them grows
fn closeness(actual: u32, desired: u32) -> f64 {
    if actual == desired {
        100.0
    } else {
        percent(actual.min(desired) as f64, actual.max(desired) as f64)
    }
}

fn group_match(criteria: &Criteria, evidence: &Evidence) -> Outcome {
    if criteria.groups.is_empty() {
        return Outcome::Inactive;
    }
    let Some(group) = evidence.schedule.group.as_deref() else {
        return Outcome::Failed("schedule has no group".into());
    };
    let matched = criteria
        .groups
        .iter()
        .any(|g| g.trim().eq_ignore_ascii_case(group.trim()));
    Outcome::Score(if matched { 100.0 } else { 0.0 })
}

fn day_off_match(criteria: &Criteria, evidence: &Evidence) -> Outcome {
    if criteria.day_off_dates.is_empty() {
        return Outcome::Inactive;
    }
    let shifts = match &evidence.shifts {
        Ok(shifts) => shifts,
        Err(e) => return Outcome::Failed(format!("days off not evaluated: {}", e)),
    };

    let worked_by_date: HashMap<NaiveDate, bool> =
        shifts.iter().map(|s| (s.date, s.is_worked())).collect();
    let requested: BTreeSet<NaiveDate> = criteria.day_off_dates.iter().copied().collect();

    let mut considered = 0usize;
    let mut off = 0usize;
    for date in &requested {
        if let Some(worked) = worked_by_date.get(date) {
            considered += 1;
            if !worked {
                off += 1;
            }
        }
    }

    if considered == 0 {
        // None of the requested dates fall inside this schedule's period
        return Outcome::Inactive;
    }
    Outcome::Score(percent(off as f64, considered as f64))
}

fn shift_code_match(criteria: &Criteria, evidence: &Evidence) -> Outcome {
    if criteria.codes.is_empty() && criteria.categories.is_empty() && criteria.lengths.is_empty() {
        return Outcome::Inactive;
    }
    let shifts = match &evidence.shifts {
        Ok(shifts) => shifts,
        Err(e) => return Outcome::Failed(format!("shift codes not evaluated: {}", e)),
    };

    let mut worked = 0usize;
    let mut matched = 0usize;
    for code in shifts.iter().filter_map(|s| s.code.as_ref()) {
        worked += 1;
        if evidence.codes.contains(code) {
            matched += 1;
        }
    }
    Outcome::Score(percent(matched as f64, worked as f64))
}

fn block_size_match(criteria: &Criteria, evidence: &Evidence) -> Outcome {
    if !criteria.blocks.is_set() {
        return Outcome::Inactive;
    }
    let Some(metrics) = &evidence.metrics else {
        return Outcome::Failed("block sizes not evaluated: no metrics".into());
    };

    let parts: Vec<f64> = [
        (criteria.blocks.five_day, metrics.blocks.count(5)),
        (criteria.blocks.four_day, metrics.blocks.count(4)),
    ]
    .into_iter()
    .filter_map(|(desired, actual)| desired.map(|d| closeness(actual, d)))
    .collect();

    Outcome::Score(parts.iter().sum::<f64>() / parts.len() as f64)
}

fn weekend_match(criteria: &Criteria, evidence: &Evidence) -> Outcome {
    let prefs = &criteria.weekends;
    if !prefs.is_set() {
        return Outcome::Inactive;
    }
    let Some(metrics) = &evidence.metrics else {
        return Outcome::Failed("weekends not evaluated: no metrics".into());
    };

    let mut parts = Vec::new();
    if let Some(max) = prefs.max_full_weekends {
        let worked = metrics.full_weekends;
        parts.push(if worked <= max {
            100.0
        } else {
            percent(max as f64, worked as f64)
        });
    }
    for (avoid, weekday) in [
        (prefs.avoid_saturdays, Weekday::Sat),
        (prefs.avoid_sundays, Weekday::Sun),
    ] {
        if avoid {
            let tally = metrics.weekdays.get(weekday);
            parts.push(if tally.total == 0 {
                100.0
            } else {
                percent(tally.total.saturating_sub(tally.worked) as f64, tally.total as f64)
            });
        }
    }

    Outcome::Score(parts.iter().sum::<f64>() / parts.len() as f64)
}

/// Deterministic summary of which factors dominated
fn explain(score: f64, factors: &[FactorScore], notes: &[String]) -> String {
    let weighted: Vec<&FactorScore> = factors.iter().filter(|f| f.weight > 0.0).collect();

    let mut text = if weighted.is_empty() {
        format!("No weighted preference factors; neutral score {:.1}.", score)
    } else if weighted.len() == 1 {
        let only = weighted[0];
        format!(
            "Score {:.1} from 1 factor: {} {:.0}.",
            score,
            only.factor.label(),
            only.score
        )
    } else {
        // First in factor order wins ties
        let mut strongest = weighted[0];
        let mut weakest = weighted[0];
        for f in &weighted[1..] {
            if f.score * f.weight > strongest.score * strongest.weight {
                strongest = f;
            }
            if f.score < weakest.score {
                weakest = f;
            }
        }
        format!(
            "Score {:.1} from {} factors. Strongest: {} {:.0} (weight {:.1}). Weakest: {} {:.0} (weight {:.1}).",
            score,
            weighted.len(),
            strongest.factor.label(),
            strongest.score,
            strongest.weight,
            weakest.factor.label(),
            weakest.score,
            weakest.weight
        )
    };

    let factor_notes: Vec<String> = factors
        .iter()
        .filter_map(|f| f.note.as_ref().map(|n| format!("{}: {}", f.factor.label(), n)))
        .collect();
    let all_notes: Vec<&str> = notes
        .iter()
        .map(String::as_str)
        .chain(factor_notes.iter().map(String::as_str))
        .collect();
    if !all_notes.is_empty() {
        text.push_str(" Notes: ");
        text.push_str(&all_notes.join("; "));
        text.push('.');
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::schedule;
    use crate::shift_codes::tests::sample_table;
    use crate::{BlockPreference, ScheduleRecord, WeekendPreference};
    use chrono::Utc;
    use proptest::prelude::*;

    fn settings() -> ScoringConfig {
        ScoringConfig::default()
    }

    fn scored(schedule: &ScheduleInstance, table: &ShiftCodeTable, criteria: &Criteria) -> ScoreResult {
        score_schedule(schedule, table, criteria, &settings(), BlockCounting::ScaleCycle)
    }

    /// Mon-Fri nights, weekends off, four weeks from 2024-01-01
    fn night_schedule() -> ScheduleInstance {
        schedule("nights", 3, &["N", "N", "N", "N", "N12", "OFF", "OFF"], "2024-01-01", 4)
    }

    #[test]
    fn test_empty_criteria_yields_neutral_score() {
        let result = scored(&night_schedule(), &sample_table(), &Criteria::default());
        assert_eq!(result.score, 50.0);
        assert!(result.factors.is_empty());
        assert!(result.explanation.contains("neutral score 50.0"));
    }

    #[test]
    fn test_all_zero_weights_yield_neutral_score() {
        let mut criteria = Criteria {
            codes: vec!["N".into()],
            groups: vec!["Nights".into()],
            ..Criteria::default()
        };
        for factor in ScoreFactor::ALL {
            criteria.weights.insert(factor, 0.0);
        }

        let result = scored(&night_schedule(), &sample_table(), &criteria);
        assert_eq!(result.score, 50.0);
        assert_eq!(result.factors.len(), 2);
    }

    #[test]
    fn test_schedule_without_shifts_uses_fallback() {
        let sched = schedule("idle", 1, &["OFF"; 7], "2024-01-01", 2);
        let criteria = Criteria {
            codes: vec!["N".into()],
            ..Criteria::default()
        };

        let result = scored(&sched, &sample_table(), &criteria);
        assert_eq!(result.score, 0.0);
        assert!(result.explanation.contains("no worked shifts"));
    }

    #[test]
    fn test_category_expansion_matches_explicit_codes() {
        let table = sample_table();
        let by_category = Criteria {
            categories: vec!["night".into()],
            ..Criteria::default()
        };
        let by_codes = Criteria {
            codes: vec!["N12".into(), "N".into()],
            ..Criteria::default()
        };
        let both = Criteria {
            categories: vec!["Night".into()],
            codes: vec!["N".into(), "N12".into()],
            ..Criteria::default()
        };

        let a = scored(&night_schedule(), &table, &by_category);
        let b = scored(&night_schedule(), &table, &by_codes);
        let c = scored(&night_schedule(), &table, &both);

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.score, 100.0);
    }

    #[test]
    fn test_length_expansion_is_order_independent() {
        let table = sample_table();
        let forward = Criteria {
            lengths: vec!["8h".into(), "12h".into()],
            ..Criteria::default()
        };
        let reversed = Criteria {
            lengths: vec!["12h".into(), "8h".into()],
            ..Criteria::default()
        };

        let mut notes = Vec::new();
        assert_eq!(
            expand_codes(&forward, &table, &mut notes),
            expand_codes(&reversed, &table, &mut notes)
        );
        assert_eq!(
            scored(&night_schedule(), &table, &forward),
            scored(&night_schedule(), &table, &reversed)
        );
    }

    #[test]
    fn test_partial_code_match() {
        // 16 N days and 4 N12 days worked
        let criteria = Criteria {
            codes: vec!["N".into()],
            ..Criteria::default()
        };
        let result = scored(&night_schedule(), &sample_table(), &criteria);
        assert_eq!(result.score, 80.0);
        assert_eq!(result.factors[0].factor, ScoreFactor::ShiftCodes);
    }

    #[test]
    fn test_unknown_category_noted() {
        let criteria = Criteria {
            categories: vec!["Swing".into()],
            ..Criteria::default()
        };
        let result = scored(&night_schedule(), &sample_table(), &criteria);
        assert_eq!(result.score, 0.0);
        assert!(result.explanation.contains("category 'Swing' matches no shift codes"));
    }

    #[test]
    fn test_day_off_dates() {
        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let criteria = Criteria {
            // Sat 6th and Sun 7th are off, Mon 8th is worked; Feb 20th is outside the period
            day_off_dates: vec![date(6), date(7), date(8), NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()],
            ..Criteria::default()
        };
        let result = scored(&night_schedule(), &sample_table(), &criteria);
        let expected = 200.0 / 3.0;
        assert!((result.score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_day_off_dates_outside_period_are_inactive() {
        let criteria = Criteria {
            day_off_dates: vec![NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()],
            ..Criteria::default()
        };
        let result = scored(&night_schedule(), &sample_table(), &criteria);
        assert!(result.factors.is_empty());
        assert_eq!(result.score, 50.0);
    }

    #[test]
    fn test_block_and_weekend_preferences() {
        let criteria = Criteria {
            blocks: BlockPreference {
                five_day: Some(2),
                four_day: None,
            },
            weekends: WeekendPreference {
                max_full_weekends: Some(0),
                avoid_saturdays: true,
                avoid_sundays: false,
            },
            ..Criteria::default()
        };
        let result = scored(&night_schedule(), &sample_table(), &criteria);

        // Four 5-day blocks against two desired
        let blocks = result.factors.iter().find(|f| f.factor == ScoreFactor::BlockSize).unwrap();
        assert_eq!(blocks.score, 50.0);
        // No weekends worked at all
        let weekends = result.factors.iter().find(|f| f.factor == ScoreFactor::Weekends).unwrap();
        assert_eq!(weekends.score, 100.0);
        assert_eq!(result.score, 75.0);
    }

    #[test]
    fn test_weights_form_weighted_average() {
        let mut sched = night_schedule();
        sched.group = Some("Nights".into());
        let mut criteria = Criteria {
            groups: vec!["Days".into()],
            codes: vec!["N".into(), "N12".into()],
            ..Criteria::default()
        };
        criteria.weights.insert(ScoreFactor::ShiftCodes, 3.0);

        // group 0 (w1), codes 100 (w3)
        let result = scored(&sched, &sample_table(), &criteria);
        assert_eq!(result.score, 75.0);
        assert!(result.explanation.starts_with("Score 75.0 from 2 factors. Strongest: shift codes 100"));
        assert!(result.explanation.contains("Weakest: group 0"));

        // Out-of-range and non-finite weights are clamped / defaulted
        criteria.weights.insert(ScoreFactor::ShiftCodes, 40.0);
        criteria.weights.insert(ScoreFactor::Group, f64::NAN);
        let result = scored(&sched, &sample_table(), &criteria);
        let expected = 100.0 * 5.0 / 6.0;
        assert!((result.score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bad_schedule_degrades_instead_of_failing() {
        let mut sched = night_schedule();
        sched.start_date = Some("not a date".into());
        let criteria = Criteria {
            codes: vec!["N".into()],
            blocks: BlockPreference {
                five_day: Some(4),
                four_day: None,
            },
            ..Criteria::default()
        };

        let result = scored(&sched, &sample_table(), &criteria);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.factors.len(), 2);
        assert!(result.factors.iter().all(|f| f.note.is_some()));
        assert!(result.explanation.contains("unparseable start date"));
    }

    #[test]
    fn test_stored_metric_equal_to_line_number_is_sanitized() {
        let mut sched = night_schedule();
        sched.line_number = 3;
        let table = sample_table();
        let shifts = resolved_shifts(&sched, &table).unwrap();
        let mut stored = analyze_shifts(&shifts, 7, 4, BlockCounting::ScaleCycle);
        assert_eq!(stored.full_weekends, 0);
        // Corrupted upstream: weekends-on overwritten with the line number
        stored.full_weekends = 3;
        sched.metrics = Some(stored);

        let criteria = Criteria {
            weekends: WeekendPreference {
                max_full_weekends: Some(0),
                ..WeekendPreference::default()
            },
            ..Criteria::default()
        };
        let result = scored(&sched, &table, &criteria);

        assert_eq!(result.score, 100.0);
        assert!(result.explanation.contains("stored metrics corrected: full_weekends"));
    }

    fn record_for(schedule: &ScheduleInstance, metrics: MetricsBundle, counting: BlockCounting) -> ScheduleRecord {
        ScheduleRecord {
            schedule_id: schedule.id.clone(),
            line_number: schedule.line_number,
            version: schedule.version_for("US", counting),
            metrics,
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_equal_to_line_number_score_like_live() {
        // Four cycles on line 4: 5-day blocks, weekends off and weekday counts are all 4
        let table = sample_table();
        let live_schedule = schedule("line-4", 4, &["A", "A", "A", "A", "A", "OFF", "OFF"], "2024-01-01", 4);
        let shifts = resolved_shifts(&live_schedule, &table).unwrap();
        let bundle = analyze_shifts(&shifts, 7, 4, BlockCounting::ScaleCycle);
        assert_eq!(bundle.blocks.count(5), 4);
        assert_eq!(bundle.weekends_off, 4);

        let criteria = Criteria {
            blocks: BlockPreference {
                five_day: Some(4),
                four_day: None,
            },
            ..Criteria::default()
        };
        let live = scored(&live_schedule, &table, &criteria);
        assert_eq!(live.score, 100.0);

        let mut supplied = live_schedule.clone();
        supplied.metrics = Some(bundle.clone());
        assert_eq!(scored(&supplied, &table, &criteria), live);

        let mut recorded = live_schedule.clone();
        recorded.attach_record(&record_for(&recorded, bundle, BlockCounting::ScaleCycle));
        assert_eq!(scored(&recorded, &table, &criteria), live);
    }

    #[test]
    fn test_block_counting_follows_caller() {
        // The trailing pair and the next cycle's opening three form one 5-day block
        let table = sample_table();
        let mut sched = schedule("seam", 9, &["A", "A", "A", "OFF", "OFF", "A", "A"], "2024-01-01", 2);
        let criteria = Criteria {
            blocks: BlockPreference {
                five_day: Some(1),
                four_day: None,
            },
            ..Criteria::default()
        };

        let full_span = score_schedule(&sched, &table, &criteria, &settings(), BlockCounting::FullSpan);
        let per_cycle = score_schedule(&sched, &table, &criteria, &settings(), BlockCounting::ScaleCycle);
        assert_eq!(full_span.score, 100.0);
        assert_eq!(per_cycle.score, 0.0);

        // A full-span record is used under full-span counting only
        let shifts = resolved_shifts(&sched, &table).unwrap();
        let bundle = analyze_shifts(&shifts, 7, 2, BlockCounting::FullSpan);
        let record = record_for(&sched, bundle, BlockCounting::FullSpan);
        sched.attach_record(&record);

        let stored = score_schedule(&sched, &table, &criteria, &settings(), BlockCounting::FullSpan);
        assert_eq!(stored, full_span);

        let mismatched = score_schedule(&sched, &table, &criteria, &settings(), BlockCounting::ScaleCycle);
        assert_eq!(mismatched.score, 0.0);
        assert!(mismatched.explanation.contains("stored metrics out of date; recomputed"));
    }

    #[test]
    fn test_record_for_edited_schedule_is_recomputed() {
        let table = sample_table();
        let mut sched = night_schedule();
        let mut bundle = analyze_shifts(&resolved_shifts(&sched, &table).unwrap(), 7, 4, BlockCounting::ScaleCycle);
        bundle.full_weekends = 2;
        sched.attach_record(&record_for(&sched, bundle, BlockCounting::ScaleCycle));
        sched.start_date = Some("2023-12-30".into());

        // From a Saturday start every cycle opens with a full weekend
        let criteria = Criteria {
            weekends: WeekendPreference {
                max_full_weekends: Some(2),
                ..WeekendPreference::default()
            },
            ..Criteria::default()
        };
        let result = scored(&sched, &table, &criteria);

        assert_eq!(result.score, 50.0);
        assert!(result.explanation.contains("out of date"));
    }

    #[test]
    fn test_rank_schedules_orders_best_first() {
        let table = sample_table();
        let schedules = vec![
            schedule("days", 1, &["A", "A", "A", "A", "A", "OFF", "OFF"], "2024-01-01", 2),
            night_schedule(),
            schedule("mixed", 2, &["N", "N", "A", "A", "OFF", "OFF", "OFF"], "2024-01-01", 2),
        ];
        let criteria = Criteria {
            categories: vec!["Night".into()],
            ..Criteria::default()
        };

        let ranked = rank_schedules(&schedules, &table, &criteria, &settings(), BlockCounting::ScaleCycle);
        let ids: Vec<&str> = ranked.iter().map(|r| r.schedule_id.as_str()).collect();
        assert_eq!(ids, vec!["nights", "mixed", "days"]);
    }

    proptest! {
        #[test]
        fn prop_score_stays_in_range(
            weights in proptest::collection::vec(-10.0f64..10.0, 5),
            five_day in proptest::option::of(0u32..20),
            max_weekends in proptest::option::of(0u32..10),
            use_codes in any::<bool>(),
            avoid_sundays in any::<bool>(),
        ) {
            let mut criteria = Criteria {
                codes: if use_codes { vec!["N".into()] } else { vec![] },
                groups: vec!["Nights".into()],
                blocks: BlockPreference { five_day, four_day: None },
                weekends: WeekendPreference {
                    max_full_weekends: max_weekends,
                    avoid_saturdays: false,
                    avoid_sundays,
                },
                ..Criteria::default()
            };
            for (factor, weight) in ScoreFactor::ALL.iter().zip(weights) {
                criteria.weights.insert(*factor, weight);
            }

            let result = scored(&night_schedule(), &sample_table(), &criteria);
            prop_assert!(result.score.is_finite());
            prop_assert!((0.0..=100.0).contains(&result.score));
        }
    }
}
