//! Pattern analysis over a dated shift sequence.
//!
//! A single ordered pass tracks the running worked-day streak (closing it
//! into the block histogram on every off day and at the end), per-weekday
//! worked/total counters, and a weekend-pair map keyed by each Saturday's
//! date. Two entry points share the scan:
//!
//! - [`analyze_cycle`] scans one cycle and multiplies period totals by the
//!   cycle count. Blocks never span the seam between cycles, so a block that
//!   wraps from the end of one cycle into the start of the next is counted
//!   as two shorter blocks.
//! - [`analyze_full_span`] scans every day of the period. Nothing is scaled
//!   and seam-crossing blocks are counted once at their true length.
//!
//! The two agree on every period metric when the cycle length is a multiple
//! of seven, the cycle starts on a Monday, and no block crosses a seam.

use crate::{BlockHistogram, DatedShift, MetricsBundle, WeekdayTally};
use chrono::{NaiveDate, Weekday};
use std::collections::{BTreeMap, BTreeSet};

/// Which sides of one Saturday/Sunday pair were worked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct WeekendPair {
    saturday: bool,
    sunday: bool,
}

/// Weekend pairs sorted into their four exclusive classes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct WeekendClasses {
    full: u32,
    orphan_saturday: u32,
    orphan_sunday: u32,
    neither: u32,
}

#[derive(Debug, Default)]
struct Scan {
    blocks: BlockHistogram,
    longest: u32,
    weekdays: WeekdayTally,
    days_worked: u32,
    days: u32,
    /// Keyed by the Saturday's date; a Sunday maps to the day before it
    weekend_pairs: BTreeMap<NaiveDate, WeekendPair>,
    codes: BTreeSet<String>,
}

impl Scan {
    fn close_block(&mut self, streak: &mut u32) {
        if *streak > 0 {
            self.blocks.record(*streak);
            self.longest = self.longest.max(*streak);
            *streak = 0;
        }
    }
}

fn scan(shifts: &[DatedShift]) -> Scan {
    let mut scan = Scan::default();
    let mut streak = 0u32;

    for shift in shifts {
        scan.days += 1;
        scan.weekdays.get_mut(shift.weekday).total += 1;

        match &shift.code {
            Some(code) => {
                streak += 1;
                scan.days_worked += 1;
                scan.weekdays.get_mut(shift.weekday).worked += 1;
                scan.codes.insert(code.clone());
            }
            None => scan.close_block(&mut streak),
        }

        let worked = shift.is_worked();
        match shift.weekday {
            Weekday::Sat => {
                scan.weekend_pairs.entry(shift.date).or_default().saturday |= worked;
            }
            Weekday::Sun => {
                let saturday = shift.date.pred_opt().unwrap_or(shift.date);
                scan.weekend_pairs.entry(saturday).or_default().sunday |= worked;
            }
            _ => {}
        }
    }
    scan.close_block(&mut streak);

    scan
}

fn classify(pairs: &BTreeMap<NaiveDate, WeekendPair>) -> WeekendClasses {
    let mut classes = WeekendClasses::default();
    for pair in pairs.values() {
        match (pair.saturday, pair.sunday) {
            (true, true) => classes.full += 1,
            (true, false) => classes.orphan_saturday += 1,
            (false, true) => classes.orphan_sunday += 1,
            (false, false) => classes.neither += 1,
        }
    }
    classes
}

/// Label for the set of distinct codes worked
pub fn pattern_label(codes: &BTreeSet<String>) -> String {
    match codes.len() {
        0 => "No shifts".to_string(),
        1..=3 => codes.iter().map(String::as_str).collect::<Vec<_>>().join("/"),
        _ => "Mixed".to_string(),
    }
}

fn build_bundle(scan: Scan, cycles: u32, cycle_length: u32, scale: u32) -> MetricsBundle {
    let weekends = classify(&scan.weekend_pairs);
    let blocks = scan.blocks.scaled(scale);

    let any_weekend_work = weekends.full + weekends.orphan_saturday + weekends.orphan_sunday > 0;
    // Approximations: block lengths only, no check of which weekdays a block covers
    let friday_weekend_blocks = if any_weekend_work { blocks.count(3) } else { 0 };
    let weekday_blocks = blocks.count(5);

    MetricsBundle {
        cycles,
        cycle_length,
        full_weekends: weekends.full * scale,
        orphan_saturdays: weekends.orphan_saturday * scale,
        orphan_sundays: weekends.orphan_sunday * scale,
        weekends_off: weekends.neither * scale,
        blocks,
        longest_stretch: scan.longest,
        weekdays: scan.weekdays.scaled(scale),
        days_worked: scan.days_worked * scale,
        days_in_period: scan.days * scale,
        friday_weekend_blocks,
        weekday_blocks,
        holidays_worked: 0,
        holiday_details: Vec::new(),
        pattern: pattern_label(&scan.codes),
    }
}

/// Analyze one cycle and project it across `cycles` repetitions
///
/// `cycle` must hold exactly one cycle. A cycle count of zero is treated as
/// one. Holiday fields are left empty; see [`crate::metrics::compute_metrics`].
pub fn analyze_cycle(cycle: &[DatedShift], cycles: u32) -> MetricsBundle {
    let cycles = cycles.max(1);
    let bundle = build_bundle(scan(cycle), cycles, cycle.len() as u32, cycles);
    tracing::trace!(
        "Analyzed {}-day cycle x{}: {} blocks, longest {}",
        cycle.len(),
        cycles,
        bundle.blocks.total(),
        bundle.longest_stretch
    );
    bundle
}

/// Analyze every day of the period without scaling
pub fn analyze_full_span(shifts: &[DatedShift], cycles: u32) -> MetricsBundle {
    let cycles = cycles.max(1);
    let cycle_length = (shifts.len() / cycles as usize) as u32;
    build_bundle(scan(shifts), cycles, cycle_length, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::expand_cycle;
    use crate::CycleTemplate;
    use chrono::{Datelike, Days};
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// 2024-01-01 is a Monday
    fn monday() -> NaiveDate {
        date(2024, 1, 1)
    }

    fn expand(codes: &[&str], start: NaiveDate, cycles: u32) -> Vec<DatedShift> {
        expand_cycle(&CycleTemplate::from_codes(codes), start, cycles).unwrap()
    }

    #[test]
    fn test_weekday_blocks_with_weekends_off() {
        let cycle = ["A", "A", "A", "A", "A", "OFF", "OFF"];
        let shifts = expand(&cycle, monday(), 8);
        assert_eq!(shifts.len(), 56);

        let metrics = analyze_cycle(&shifts[..7], 8);

        assert_eq!(metrics.full_weekends, 0);
        assert_eq!(metrics.orphan_saturdays, 0);
        assert_eq!(metrics.orphan_sundays, 0);
        assert_eq!(metrics.weekends_off, 8);
        assert_eq!(metrics.longest_stretch, 5);
        assert_eq!(metrics.blocks.count(5), 8);
        assert_eq!(metrics.blocks.total(), 8);
        assert_eq!(metrics.days_worked, 40);
        assert_eq!(metrics.days_in_period, 56);
        assert_eq!(metrics.weekday_blocks, 8);
        assert_eq!(metrics.friday_weekend_blocks, 0);
        for weekday in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
            assert_eq!(metrics.weekdays.get(weekday).worked, 8);
            assert_eq!(metrics.weekdays.get(weekday).total, 8);
        }
        assert_eq!(metrics.weekdays.get(Weekday::Sat).worked, 0);
        assert_eq!(metrics.weekdays.get(Weekday::Sun).total, 8);
        assert_eq!(metrics.pattern, "A");

        // Every one of the eight weeks is weekend-free
        for week in shifts.chunks(7) {
            assert_eq!(analyze_cycle(week, 1).full_weekends, 0);
        }
        assert_eq!(analyze_full_span(&shifts, 8), metrics);
    }

    #[test]
    fn test_block_covering_saturday_and_sunday_is_full_weekend() {
        // Thursday start puts the first worked day on Saturday
        let start = date(2024, 1, 4);
        assert_eq!(start.weekday(), Weekday::Thu);
        let shifts = expand(&["OFF", "OFF", "A", "A", "A", "A", "A"], start, 1);
        assert_eq!(shifts[2].weekday, Weekday::Sat);

        let metrics = analyze_cycle(&shifts, 1);

        assert_eq!(metrics.full_weekends, 1);
        assert_eq!(metrics.orphan_saturdays, 0);
        assert_eq!(metrics.orphan_sundays, 0);
        assert_eq!(metrics.longest_stretch, 5);
    }

    #[test]
    fn test_orphan_saturday_and_sunday() {
        let shifts = expand(&["A", "A", "A", "A", "A", "A", "OFF"], monday(), 1);
        let metrics = analyze_cycle(&shifts, 1);
        assert_eq!(metrics.orphan_saturdays, 1);
        assert_eq!(metrics.full_weekends, 0);
        assert_eq!(metrics.blocks.count(6), 1);

        // Sunday start: the Sunday pairs with the Saturday before the cycle
        let sunday = date(2024, 1, 7);
        let shifts = expand(&["N", "OFF", "OFF", "OFF", "OFF", "OFF", "OFF"], sunday, 1);
        let metrics = analyze_cycle(&shifts, 1);
        assert_eq!(metrics.orphan_sundays, 1);
        assert_eq!(metrics.weekends_off, 1);
        assert_eq!(metrics.blocks.count(1), 1);
    }

    #[test]
    fn test_long_blocks_share_the_seven_plus_bucket() {
        let mut codes = vec!["A"; 9];
        codes.extend(["OFF"; 5]);
        let metrics = analyze_cycle(&expand(&codes, monday(), 1), 3);

        assert_eq!(metrics.blocks.count(7), 3);
        assert_eq!(metrics.blocks.count(9), 3);
        assert_eq!(metrics.longest_stretch, 9);
    }

    #[test]
    fn test_no_work_at_all() {
        let metrics = analyze_cycle(&expand(&["OFF"; 7], monday(), 1), 2);
        assert_eq!(metrics.longest_stretch, 0);
        assert_eq!(metrics.blocks.total(), 0);
        assert_eq!(metrics.weekends_off, 2);
        assert_eq!(metrics.pattern, "No shifts");
    }

    #[test]
    fn test_friday_weekend_heuristic() {
        // Fri-Sat-Sun block
        let codes = ["OFF", "OFF", "OFF", "OFF", "E", "E", "E"];
        let metrics = analyze_cycle(&expand(&codes, monday(), 1), 2);
        assert_eq!(metrics.full_weekends, 2);
        assert_eq!(metrics.friday_weekend_blocks, 2);
        assert_eq!(metrics.weekday_blocks, 0);
    }

    #[test]
    fn test_pattern_labels() {
        let set = |codes: &[&str]| codes.iter().map(|c| c.to_string()).collect::<BTreeSet<_>>();
        assert_eq!(pattern_label(&set(&[])), "No shifts");
        assert_eq!(pattern_label(&set(&["N"])), "N");
        assert_eq!(pattern_label(&set(&["N", "A", "E"])), "A/E/N");
        assert_eq!(pattern_label(&set(&["N", "A", "E", "D10"])), "Mixed");
    }

    #[test]
    fn test_seam_crossing_block_differs_between_paths() {
        let codes = ["A", "A", "OFF", "OFF", "OFF", "A", "A"];
        let shifts = expand(&codes, monday(), 2);

        let fast = analyze_cycle(&shifts[..7], 2);
        let exact = analyze_full_span(&shifts, 2);

        assert_eq!(fast.blocks.count(2), 4);
        assert_eq!(fast.longest_stretch, 2);

        assert_eq!(exact.blocks.count(2), 2);
        assert_eq!(exact.blocks.count(4), 1);
        assert_eq!(exact.longest_stretch, 4);

        // Day counts are unaffected by the seam
        assert_eq!(fast.days_worked, exact.days_worked);
        assert_eq!(fast.weekdays, exact.weekdays);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let shifts = expand(&["A", "N", "OFF", "E", "E", "OFF", "A", "A"], date(2024, 2, 26), 3);
        let first = analyze_cycle(&shifts[..8], 3);
        let second = analyze_cycle(&shifts[..8], 3);
        assert_eq!(first, second);
    }

    fn template_strategy(max_len: usize) -> impl Strategy<Value = Vec<Option<String>>> {
        proptest::collection::vec(
            proptest::option::weighted(0.6, prop_oneof![Just("A".to_string()), Just("N".to_string())]),
            1..max_len,
        )
    }

    proptest! {
        #[test]
        fn prop_weekend_classes_cover_every_pair(
            slots in template_strategy(40),
            offset in 0u64..400,
        ) {
            let start = monday() + Days::new(offset);
            let template = CycleTemplate::new(slots);
            let shifts = expand_cycle(&template, start, 1).unwrap();
            let metrics = analyze_cycle(&shifts, 1);

            let pairs: BTreeSet<NaiveDate> = shifts
                .iter()
                .filter_map(|s| match s.weekday {
                    Weekday::Sat => Some(s.date),
                    Weekday::Sun => s.date.pred_opt(),
                    _ => None,
                })
                .collect();

            let classified = metrics.full_weekends
                + metrics.orphan_saturdays
                + metrics.orphan_sundays
                + metrics.weekends_off;
            prop_assert_eq!(classified as usize, pairs.len());
        }

        #[test]
        fn prop_period_totals_scale_with_cycle_count(
            slots in template_strategy(30),
            offset in 0u64..400,
            cycles in 1u32..10,
        ) {
            let start = monday() + Days::new(offset);
            let template = CycleTemplate::new(slots);
            let cycle = expand_cycle(&template, start, 1).unwrap();

            let one = analyze_cycle(&cycle, 1);
            let many = analyze_cycle(&cycle, cycles);

            prop_assert_eq!(many.full_weekends, one.full_weekends * cycles);
            prop_assert_eq!(many.orphan_saturdays, one.orphan_saturdays * cycles);
            prop_assert_eq!(many.orphan_sundays, one.orphan_sundays * cycles);
            prop_assert_eq!(many.weekends_off, one.weekends_off * cycles);
            prop_assert_eq!(&many.blocks, &one.blocks.scaled(cycles));
            prop_assert_eq!(&many.weekdays, &one.weekdays.scaled(cycles));
            prop_assert_eq!(many.days_worked, one.days_worked * cycles);
            prop_assert_eq!(many.days_in_period, one.days_in_period * cycles);
            prop_assert_eq!(many.longest_stretch, one.longest_stretch);
        }

        #[test]
        fn prop_fast_and_exact_agree_without_seam_blocks(
            weeks in 1usize..4,
            seed_slots in template_strategy(28),
            cycles in 1u32..6,
        ) {
            // Monday start, whole weeks, last day off: no block can cross a seam
            let mut slots: Vec<Option<String>> =
                seed_slots.into_iter().cycle().take(weeks * 7).collect();
            let last = slots.len() - 1;
            slots[last] = None;

            let template = CycleTemplate::new(slots);
            let shifts = expand_cycle(&template, monday(), cycles).unwrap();

            let fast = analyze_cycle(&shifts[..template.len()], cycles);
            let exact = analyze_full_span(&shifts, cycles);
            prop_assert_eq!(fast, exact);
        }
    }
}
