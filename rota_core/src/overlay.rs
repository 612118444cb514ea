//! Holiday overlay: which worked days fall on a statutory holiday.
//!
//! The overlay owns no global state. The (jurisdiction, year) cache is an
//! explicit [`HolidayCache`] the host creates, shares, and invalidates.

use crate::holidays::{normalize_jurisdiction, HolidayTableProvider};
use crate::{DatedShift, Holiday, HolidayWorked, Result};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::OnceCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

type CacheKey = (String, i32);
type HolidayTable = Arc<[Holiday]>;

/// Memoized holiday tables keyed by (jurisdiction, year)
///
/// Reads take a shared lock. Each key owns a `OnceCell`, so concurrent
/// callers for the same key wait on a single fetch instead of repeating it.
/// A failed fetch leaves the cell empty and the next caller retries.
#[derive(Debug, Default)]
pub struct HolidayCache {
    entries: RwLock<HashMap<CacheKey, Arc<OnceCell<HolidayTable>>>>,
}

impl HolidayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table, running `fetch` if the key is not populated
    pub fn get_or_fetch<F>(&self, jurisdiction: &str, year: i32, fetch: F) -> Result<HolidayTable>
    where
        F: FnOnce() -> Result<Vec<Holiday>>,
    {
        let key = (normalize_jurisdiction(jurisdiction), year);

        let existing = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        let cell = match existing {
            Some(cell) => cell,
            None => self
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(key)
                .or_default()
                .clone(),
        };

        cell.get_or_try_init(|| fetch().map(HolidayTable::from))
            .cloned()
    }

    /// Drop every cached year for one jurisdiction
    pub fn invalidate(&self, jurisdiction: &str) -> usize {
        let jurisdiction = normalize_jurisdiction(jurisdiction);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(j, _), _| *j != jurisdiction);
        let removed = before - entries.len();
        tracing::debug!("Invalidated {} cached holiday tables for {}", removed, jurisdiction);
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of populated tables
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holidays worked by one schedule
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HolidayOverlap {
    pub count: u32,
    pub details: Vec<HolidayWorked>,
}

/// Matches dated shifts against a jurisdiction's holiday tables
#[derive(Clone)]
pub struct HolidayOverlay {
    provider: Arc<dyn HolidayTableProvider>,
    cache: Arc<HolidayCache>,
}

impl HolidayOverlay {
    pub fn new(provider: Arc<dyn HolidayTableProvider>, cache: Arc<HolidayCache>) -> Self {
        Self { provider, cache }
    }

    pub fn cache(&self) -> &Arc<HolidayCache> {
        &self.cache
    }

    /// One year's table, through the cache
    pub fn holidays_for_year(&self, jurisdiction: &str, year: i32) -> Result<HolidayTable> {
        self.cache.get_or_fetch(jurisdiction, year, || {
            tracing::debug!("Fetching holiday table for {} {}", jurisdiction, year);
            self.provider.holidays(jurisdiction, year)
        })
    }

    /// Count and list worked days that fall on a holiday
    ///
    /// Every year the sequence touches is fetched and merged. A year whose
    /// lookup fails contributes no holidays; the failure is logged.
    pub fn overlay(&self, shifts: &[DatedShift], jurisdiction: &str) -> HolidayOverlap {
        let years: BTreeSet<i32> = shifts.iter().map(|s| s.date.year()).collect();

        let mut by_date: HashMap<NaiveDate, Holiday> = HashMap::new();
        for year in years {
            match self.holidays_for_year(jurisdiction, year) {
                Ok(table) => {
                    for holiday in table.iter() {
                        // Keep the first name listed for a date
                        by_date.entry(holiday.date).or_insert_with(|| holiday.clone());
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Holiday lookup failed for {} {}: {}. Counting no holidays for that year.",
                        jurisdiction,
                        year,
                        e
                    );
                }
            }
        }

        let details: Vec<HolidayWorked> = shifts
            .iter()
            .filter_map(|shift| {
                let code = shift.code.as_ref()?;
                let holiday = by_date.get(&shift.date)?;
                Some(HolidayWorked {
                    date: shift.date,
                    name: holiday.name.clone(),
                    code: code.clone(),
                })
            })
            .collect();

        HolidayOverlap {
            count: details.len() as u32,
            details,
        }
    }
}
