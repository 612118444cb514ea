//! Holiday table providers.
//!
//! A provider answers "which holidays does this jurisdiction observe in this
//! year". Providers are treated as pure functions of their two arguments;
//! caching lives in [`crate::overlay::HolidayCache`], not here.

use crate::{Error, Holiday, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Weekday};
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Source of per-year holiday tables
pub trait HolidayTableProvider: Send + Sync {
    fn holidays(&self, jurisdiction: &str, year: i32) -> Result<Vec<Holiday>>;
}

/// Canonical form used for jurisdiction lookups
pub fn normalize_jurisdiction(jurisdiction: &str) -> String {
    jurisdiction.trim().to_ascii_uppercase()
}

/// Parse a provider date, discarding any time or offset component
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

// ============================================================================
// Static Provider
// ============================================================================

/// In-memory holiday table
#[derive(Clone, Debug, Default)]
pub struct StaticHolidayProvider {
    tables: HashMap<(String, i32), Vec<Holiday>>,
}

impl StaticHolidayProvider {
    /// Group holidays by (jurisdiction, year)
    pub fn new(holidays: Vec<Holiday>) -> Self {
        let mut tables: HashMap<(String, i32), Vec<Holiday>> = HashMap::new();
        for holiday in holidays {
            let key = (normalize_jurisdiction(&holiday.jurisdiction), holiday.year);
            tables.entry(key).or_default().push(holiday);
        }
        for table in tables.values_mut() {
            table.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.name.cmp(&b.name)));
        }
        Self { tables }
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl HolidayTableProvider for StaticHolidayProvider {
    fn holidays(&self, jurisdiction: &str, year: i32) -> Result<Vec<Holiday>> {
        let key = (normalize_jurisdiction(jurisdiction), year);
        Ok(self.tables.get(&key).cloned().unwrap_or_default())
    }
}

// ============================================================================
// CSV Provider
// ============================================================================

/// CSV row format for holiday tables
#[derive(Debug, Deserialize)]
struct CsvRow {
    jurisdiction: String,
    date: String,
    name: String,
    #[serde(default)]
    year: Option<i32>,
}

impl TryFrom<CsvRow> for Holiday {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let date = parse_calendar_date(&row.date)
            .ok_or_else(|| Error::Provider(format!("Invalid holiday date '{}'", row.date)))?;
        if row.jurisdiction.trim().is_empty() {
            return Err(Error::Provider(format!(
                "Holiday '{}' has no jurisdiction",
                row.name
            )));
        }

        Ok(Holiday {
            jurisdiction: normalize_jurisdiction(&row.jurisdiction),
            year: row.year.unwrap_or_else(|| date.year()),
            date,
            name: row.name.trim().to_string(),
        })
    }
}

/// Holiday table loaded from a CSV file with `jurisdiction,date,name[,year]`
#[derive(Clone, Debug)]
pub struct CsvHolidayProvider {
    inner: StaticHolidayProvider,
}

impl CsvHolidayProvider {
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut holidays = Vec::new();
        for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
            match result {
                Ok(row) => match Holiday::try_from(row) {
                    Ok(holiday) => holidays.push(holiday),
                    Err(e) => {
                        tracing::warn!("Skipping holiday row {}: {}", line + 2, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to deserialize holiday row {}: {}", line + 2, e);
                }
            }
        }

        tracing::info!("Loaded {} holidays from {:?}", holidays.len(), path);
        Ok(Self {
            inner: StaticHolidayProvider::new(holidays),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl HolidayTableProvider for CsvHolidayProvider {
    fn holidays(&self, jurisdiction: &str, year: i32) -> Result<Vec<Holiday>> {
        self.inner.holidays(jurisdiction, year)
    }
}

// ============================================================================
// Built-in Rule Provider
// ============================================================================

#[derive(Clone, Copy, Debug)]
enum DateRule {
    /// Fixed month/day; when `observed`, a weekend date also yields the
    /// nearest weekday (Saturday → Friday, Sunday → Monday)
    Fixed { month: u32, day: u32, observed: bool },
    /// The nth given weekday of the month
    Nth { month: u32, weekday: Weekday, n: u8 },
    /// The last given weekday of the month
    Last { month: u32, weekday: Weekday },
}

#[derive(Clone, Copy, Debug)]
struct HolidayRule {
    name: &'static str,
    rule: DateRule,
    since: Option<i32>,
}

const fn rule(name: &'static str, rule: DateRule, since: Option<i32>) -> HolidayRule {
    HolidayRule { name, rule, since }
}

const US_FEDERAL: &[HolidayRule] = &[
    rule("New Year's Day", DateRule::Fixed { month: 1, day: 1, observed: true }, None),
    rule(
        "Martin Luther King Jr. Day",
        DateRule::Nth { month: 1, weekday: Weekday::Mon, n: 3 },
        Some(1986),
    ),
    rule(
        "Washington's Birthday",
        DateRule::Nth { month: 2, weekday: Weekday::Mon, n: 3 },
        None,
    ),
    rule("Memorial Day", DateRule::Last { month: 5, weekday: Weekday::Mon }, None),
    rule(
        "Juneteenth National Independence Day",
        DateRule::Fixed { month: 6, day: 19, observed: true },
        Some(2021),
    ),
    rule("Independence Day", DateRule::Fixed { month: 7, day: 4, observed: true }, None),
    rule("Labor Day", DateRule::Nth { month: 9, weekday: Weekday::Mon, n: 1 }, None),
    rule("Columbus Day", DateRule::Nth { month: 10, weekday: Weekday::Mon, n: 2 }, None),
    rule("Veterans Day", DateRule::Fixed { month: 11, day: 11, observed: true }, None),
    rule("Thanksgiving", DateRule::Nth { month: 11, weekday: Weekday::Thu, n: 4 }, None),
    rule("Christmas Day", DateRule::Fixed { month: 12, day: 25, observed: true }, None),
];

/// Built-in calendars by normalized jurisdiction
static BUILTIN_CALENDARS: Lazy<HashMap<&'static str, &'static [HolidayRule]>> =
    Lazy::new(|| {
        let mut calendars: HashMap<&'static str, &'static [HolidayRule]> = HashMap::new();
        calendars.insert("US", US_FEDERAL);
        calendars.insert("US-FED", US_FEDERAL);
        calendars
    });

/// Rule-based provider for the built-in statutory calendars
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinHolidayProvider;

impl BuiltinHolidayProvider {
    pub fn jurisdictions() -> Vec<&'static str> {
        let mut names: Vec<_> = BUILTIN_CALENDARS.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl HolidayTableProvider for BuiltinHolidayProvider {
    fn holidays(&self, jurisdiction: &str, year: i32) -> Result<Vec<Holiday>> {
        let key = normalize_jurisdiction(jurisdiction);
        let rules = BUILTIN_CALENDARS.get(key.as_str()).ok_or_else(|| {
            Error::Provider(format!(
                "No built-in holiday calendar for '{}' (available: {})",
                jurisdiction,
                Self::jurisdictions().join(", ")
            ))
        })?;

        let mut holidays = Vec::new();
        let mut push = |date: NaiveDate, name: String| {
            holidays.push(Holiday {
                jurisdiction: key.clone(),
                year,
                date,
                name,
            })
        };

        for entry in rules.iter() {
            if entry.since.is_some_and(|since| year < since) {
                continue;
            }
            match entry.rule {
                DateRule::Fixed { month, day, observed } => {
                    let Some(date) = NaiveDate::from_ymd_opt(year, month, day) else {
                        continue;
                    };
                    push(date, entry.name.to_string());
                    if observed {
                        // An observed date that moves into the neighbouring
                        // year belongs to that year's table
                        if let Some(shifted) = observed_date(date).filter(|d| d.year() == year) {
                            push(shifted, format!("{} (observed)", entry.name));
                        }
                    }
                }
                DateRule::Nth { month, weekday, n } => {
                    if let Some(date) = NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
                    {
                        push(date, entry.name.to_string());
                    }
                }
                DateRule::Last { month, weekday } => {
                    if let Some(date) = last_weekday_of_month(year, month, weekday) {
                        push(date, entry.name.to_string());
                    }
                }
            }

            // Next year's New Year's Day observed on Dec 31 of this year
            if let DateRule::Fixed { month: 1, day: 1, observed: true } = entry.rule {
                if let Some(next) = NaiveDate::from_ymd_opt(year + 1, 1, 1) {
                    if let Some(shifted) = observed_date(next).filter(|d| d.year() == year) {
                        push(shifted, format!("{} (observed)", entry.name));
                    }
                }
            }
        }

        holidays.sort_by_key(|h| h.date);
        Ok(holidays)
    }
}

fn observed_date(date: NaiveDate) -> Option<NaiveDate> {
    match date.weekday() {
        Weekday::Sat => date.pred_opt(),
        Weekday::Sun => date.succ_opt(),
        _ => None,
    }
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut date = first_of_next.pred_opt()?;
    while date.weekday() != weekday {
        date = date.pred_opt()?;
    }
    Some(date)
}
