//! Core domain types for the Rota schedule engine.
//!
//! This module defines the fundamental types used throughout the system:
//! - Shift codes and cycle templates
//! - Schedule instances and their dated expansion
//! - Holidays and the metrics bundle derived from a schedule
//! - Preference criteria and score results
//! - Batch bookkeeping records

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

// ============================================================================
// Shift Codes
// ============================================================================

/// A shift code from the reference table (e.g. "D8" = day shift, 8 hours)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShiftCode {
    pub code: String,
    pub category: String,
    pub length: String,
    #[serde(default)]
    pub begins: Option<String>,
    #[serde(default)]
    pub ends: Option<String>,
}

/// The complete shift-code reference table, keyed by code
#[derive(Clone, Debug, Default)]
pub struct ShiftCodeTable {
    pub codes: HashMap<String, ShiftCode>,
}

// ============================================================================
// Cycle Templates and Schedules
// ============================================================================

/// One cycle of day-by-day assignments; `None` marks a day off.
///
/// Deserialization accepts `null`, `""`, `"-"` and `"OFF"` (any case) as the
/// off marker, since raw schedule rows use all of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Option<String>>", into = "Vec<Option<String>>")]
pub struct CycleTemplate {
    slots: Vec<Option<String>>,
}

impl CycleTemplate {
    pub fn new(slots: Vec<Option<String>>) -> Self {
        Self::from(slots)
    }

    /// Build a template from plain code strings, treating off markers as off
    pub fn from_codes<S: AsRef<str>>(codes: &[S]) -> Self {
        Self::new(codes.iter().map(|c| Some(c.as_ref().to_string())).collect())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[Option<String>] {
        &self.slots
    }
}

impl From<Vec<Option<String>>> for CycleTemplate {
    fn from(slots: Vec<Option<String>>) -> Self {
        let slots = slots
            .into_iter()
            .map(|slot| match slot {
                Some(code) if is_off_marker(&code) => None,
                Some(code) => Some(code.trim().to_string()),
                None => None,
            })
            .collect();
        Self { slots }
    }
}

impl From<CycleTemplate> for Vec<Option<String>> {
    fn from(template: CycleTemplate) -> Self {
        template.slots
    }
}

fn is_off_marker(code: &str) -> bool {
    let code = code.trim();
    code.is_empty() || code == "-" || code.eq_ignore_ascii_case("off")
}

/// A schedule line as supplied by external schedule storage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleInstance {
    pub id: String,
    #[serde(default)]
    pub line_number: u32,
    #[serde(default)]
    pub group: Option<String>,
    pub template: CycleTemplate,
    /// Raw start date as stored; parsed (and rejected) by the expander
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub cycles: u32,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    /// Previously computed metrics, if storage carried them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsBundle>,
    /// The inputs `metrics` was computed from, when the engine recorded it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_version: Option<ScheduleVersion>,
}

impl ScheduleInstance {
    /// The inputs a metrics bundle depends on, with the jurisdiction that
    /// was actually used for the holiday overlay.
    pub fn version_for(&self, jurisdiction: &str, counting: BlockCounting) -> ScheduleVersion {
        ScheduleVersion {
            template: self.template.clone(),
            start_date: self.start_date.clone(),
            cycles: self.cycles,
            jurisdiction: jurisdiction.to_string(),
            block_counting: counting,
        }
    }

    /// Attach a stored record's bundle along with the version it was computed for
    pub fn attach_record(&mut self, record: &ScheduleRecord) {
        self.metrics = Some(record.metrics.clone());
        self.metrics_version = Some(record.version.clone());
    }
}

/// Everything that invalidates a cached metrics bundle when it changes
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleVersion {
    pub template: CycleTemplate,
    pub start_date: Option<String>,
    pub cycles: u32,
    pub jurisdiction: String,
    #[serde(default)]
    pub block_counting: BlockCounting,
}

/// One calendar day of an expanded schedule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatedShift {
    pub date: NaiveDate,
    pub code: Option<String>,
    pub weekday: Weekday,
    /// 1-based position within the cycle
    pub position: u32,
}

impl DatedShift {
    pub fn is_worked(&self) -> bool {
        self.code.is_some()
    }
}

// ============================================================================
// Holidays
// ============================================================================

/// A statutory holiday for one jurisdiction
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Holiday {
    pub jurisdiction: String,
    pub year: i32,
    pub date: NaiveDate,
    pub name: String,
}

/// A worked day that fell on a holiday
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HolidayWorked {
    pub date: NaiveDate,
    pub name: String,
    pub code: String,
}

// ============================================================================
// Metrics
// ============================================================================

/// Number of block-length buckets: 1..=6 plus "7 or more"
pub const BLOCK_BUCKETS: usize = 7;

/// Histogram of worked-block lengths
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHistogram {
    pub counts: [u32; BLOCK_BUCKETS],
}

impl BlockHistogram {
    /// Record one closed block of `len` days (ignored when zero)
    pub fn record(&mut self, len: u32) {
        if len == 0 {
            return;
        }
        let bucket = (len as usize).min(BLOCK_BUCKETS) - 1;
        self.counts[bucket] += 1;
    }

    /// Blocks of exactly `len` days; `len >= 7` reads the 7+ bucket
    pub fn count(&self, len: u32) -> u32 {
        if len == 0 {
            return 0;
        }
        self.counts[(len as usize).min(BLOCK_BUCKETS) - 1]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn scaled(&self, factor: u32) -> Self {
        let mut counts = self.counts;
        for count in counts.iter_mut() {
            *count *= factor;
        }
        Self { counts }
    }
}

/// Worked days against occurrences for one weekday
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayTally {
    pub worked: u32,
    pub total: u32,
}

/// Per-weekday tallies, Monday first
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekdayTally {
    pub days: [DayTally; 7],
}

impl WeekdayTally {
    pub fn get(&self, weekday: Weekday) -> DayTally {
        self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn get_mut(&mut self, weekday: Weekday) -> &mut DayTally {
        &mut self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn scaled(&self, factor: u32) -> Self {
        let mut days = self.days;
        for day in days.iter_mut() {
            day.worked *= factor;
            day.total *= factor;
        }
        Self { days }
    }
}

/// Aggregate workload metrics for one schedule across its full period
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsBundle {
    pub cycles: u32,
    pub cycle_length: u32,
    pub full_weekends: u32,
    pub orphan_saturdays: u32,
    pub orphan_sundays: u32,
    /// Weekend pairs with neither side worked
    pub weekends_off: u32,
    pub blocks: BlockHistogram,
    /// Longest single run of worked days; never scaled by cycle count
    pub longest_stretch: u32,
    pub weekdays: WeekdayTally,
    pub days_worked: u32,
    pub days_in_period: u32,
    /// Heuristic: 3-day blocks when any weekend is worked
    pub friday_weekend_blocks: u32,
    /// Heuristic: 5-day blocks
    pub weekday_blocks: u32,
    pub holidays_worked: u32,
    #[serde(default)]
    pub holiday_details: Vec<HolidayWorked>,
    pub pattern: String,
}

/// How block lengths are counted across cycle seams
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockCounting {
    /// Analyze one cycle and multiply by the cycle count
    #[default]
    ScaleCycle,
    /// Scan every day of the period; blocks may straddle seams
    FullSpan,
}

// ============================================================================
// Criteria and Scores
// ============================================================================

/// Independent preference factors contributing to a score
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Group,
    DayOff,
    ShiftCodes,
    BlockSize,
    Weekends,
}

impl ScoreFactor {
    pub const ALL: [ScoreFactor; 5] = [
        ScoreFactor::Group,
        ScoreFactor::DayOff,
        ScoreFactor::ShiftCodes,
        ScoreFactor::BlockSize,
        ScoreFactor::Weekends,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ScoreFactor::Group => "group",
            ScoreFactor::DayOff => "days off",
            ScoreFactor::ShiftCodes => "shift codes",
            ScoreFactor::BlockSize => "block size",
            ScoreFactor::Weekends => "weekends",
        }
    }
}

/// Desired counts of 5-day and 4-day blocks over the period
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockPreference {
    #[serde(default)]
    pub five_day: Option<u32>,
    #[serde(default)]
    pub four_day: Option<u32>,
}

impl BlockPreference {
    pub fn is_set(&self) -> bool {
        self.five_day.is_some() || self.four_day.is_some()
    }
}

/// Weekend exposure preferences
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekendPreference {
    #[serde(default)]
    pub max_full_weekends: Option<u32>,
    #[serde(default)]
    pub avoid_saturdays: bool,
    #[serde(default)]
    pub avoid_sundays: bool,
}

impl WeekendPreference {
    pub fn is_set(&self) -> bool {
        self.max_full_weekends.is_some() || self.avoid_saturdays || self.avoid_sundays
    }
}

/// A user's weighted schedule preferences
///
/// Every field is optional in serialized form: lists default to empty,
/// preferences to unset, and each factor weight to 1.0.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Criteria {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub lengths: Vec<String>,
    #[serde(default)]
    pub codes: Vec<String>,
    #[serde(default)]
    pub day_off_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub blocks: BlockPreference,
    #[serde(default)]
    pub weekends: WeekendPreference,
    #[serde(default)]
    pub weights: BTreeMap<ScoreFactor, f64>,
}

/// Weight used for any factor missing from `Criteria::weights`
pub const DEFAULT_WEIGHT: f64 = 1.0;

impl Criteria {
    /// Raw weight for a factor, before clamping
    pub fn weight(&self, factor: ScoreFactor) -> f64 {
        self.weights.get(&factor).copied().unwrap_or(DEFAULT_WEIGHT)
    }
}

/// One factor's contribution to a score
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FactorScore {
    pub factor: ScoreFactor,
    /// Sub-score in 0..=100
    pub score: f64,
    /// Effective (clamped) weight
    pub weight: f64,
    pub note: Option<String>,
}

/// Outcome of scoring one schedule against one set of criteria
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoreResult {
    pub schedule_id: String,
    /// Final score in 0..=100
    pub score: f64,
    pub factors: Vec<FactorScore>,
    pub explanation: String,
}

// ============================================================================
// Batch Records
// ============================================================================

/// A computed metrics bundle with the schedule version it belongs to
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScheduleRecord {
    pub schedule_id: String,
    pub line_number: u32,
    pub version: ScheduleVersion,
    pub metrics: MetricsBundle,
    pub computed_at: DateTime<Utc>,
}

/// A schedule that could not be recomputed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchFailure {
    pub schedule_id: String,
    pub line_number: u32,
    pub reason: String,
}

/// Operational summary of a batch recompute
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BatchFailure>,
}
