//! Loaders for schedule and criteria files.

use crate::{Criteria, Error, Result, ScheduleInstance};
use std::collections::HashSet;
use std::path::Path;

/// Load schedule lines from a JSON array
///
/// Schedule ids must be unique; the store and results log are keyed by them.
pub fn load_schedules(path: &Path) -> Result<Vec<ScheduleInstance>> {
    let contents = std::fs::read_to_string(path)?;
    let schedules: Vec<ScheduleInstance> = serde_json::from_str(&contents)?;

    let mut seen = HashSet::with_capacity(schedules.len());
    for schedule in &schedules {
        if !seen.insert(schedule.id.as_str()) {
            return Err(Error::DataIntegrity(format!(
                "Duplicate schedule id '{}' in {:?}",
                schedule.id, path
            )));
        }
    }

    tracing::info!("Loaded {} schedules from {:?}", schedules.len(), path);
    Ok(schedules)
}

/// Load preference criteria from a JSON object
pub fn load_criteria(path: &Path) -> Result<Criteria> {
    let contents = std::fs::read_to_string(path)?;
    let criteria: Criteria = serde_json::from_str(&contents)?;
    tracing::debug!("Loaded criteria from {:?}", path);
    Ok(criteria)
}
