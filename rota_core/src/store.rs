//! Versioned metrics store with file locking.
//!
//! The store keeps the latest record per schedule. A record is fresh only
//! while its stored version matches the schedule's current template, start
//! date, cycle count, jurisdiction and block counting.

use crate::batch::resolve_jurisdiction;
use crate::sink::MetricsSink;
use crate::{BlockCounting, Error, Result, ScheduleInstance, ScheduleRecord};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MetricsStore {
    #[serde(default)]
    pub records: BTreeMap<String, ScheduleRecord>,
}

impl MetricsStore {
    /// Load the store from a file with shared locking
    ///
    /// A missing file yields an empty store. A corrupt or unreadable file is
    /// logged and also yields an empty store, so the next recompute rebuilds
    /// it.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No metrics store at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open metrics store {:?}: {}. Starting empty.", path, e);
                return Ok(Self::default());
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock metrics store {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read metrics store {:?}: {}. Starting empty.", path, e);
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<MetricsStore>(&contents) {
            Ok(store) => {
                tracing::debug!("Loaded {} stored records from {:?}", store.records.len(), path);
                Ok(store)
            }
            Err(e) => {
                tracing::warn!("Failed to parse metrics store {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Write the store atomically: locked temp file, sync, rename
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Other(format!("store path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} records to {:?}", self.records.len(), path);
        Ok(())
    }

    /// Load, modify, and save back
    pub fn update<F>(path: &Path, f: F) -> Result<Self>
    where
        F: FnOnce(&mut MetricsStore) -> Result<()>,
    {
        let mut store = Self::load(path)?;
        f(&mut store)?;
        store.save(path)?;
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, schedule_id: &str) -> Option<&ScheduleRecord> {
        self.records.get(schedule_id)
    }

    pub fn insert(&mut self, record: ScheduleRecord) {
        self.records.insert(record.schedule_id.clone(), record);
    }

    /// The stored record, if it was computed from the schedule's current inputs
    pub fn get_fresh(
        &self,
        schedule: &ScheduleInstance,
        jurisdiction: &str,
        counting: BlockCounting,
    ) -> Option<&ScheduleRecord> {
        self.get(&schedule.id)
            .filter(|record| record.version == schedule.version_for(jurisdiction, counting))
    }

    /// Schedules with no record, or whose record was computed from other inputs
    pub fn stale<'a>(
        &self,
        schedules: &'a [ScheduleInstance],
        jurisdiction: Option<&str>,
        default_jurisdiction: &str,
        counting: BlockCounting,
    ) -> Vec<&'a ScheduleInstance> {
        schedules
            .iter()
            .filter(|schedule| {
                let resolved = resolve_jurisdiction(jurisdiction, schedule, default_jurisdiction);
                self.get_fresh(schedule, &resolved, counting).is_none()
            })
            .collect()
    }

    /// Records ordered by schedule line number, then id
    pub fn ordered_records(&self) -> Vec<&ScheduleRecord> {
        let mut records: Vec<&ScheduleRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            a.line_number
                .cmp(&b.line_number)
                .then_with(|| a.schedule_id.cmp(&b.schedule_id))
        });
        records
    }
}

impl MetricsSink for MetricsStore {
    fn append(&mut self, record: &ScheduleRecord) -> Result<()> {
        self.insert(record.clone());
        Ok(())
    }
}
