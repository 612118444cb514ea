//! Append-only results log for recomputed metrics.
//!
//! Records are appended to a JSONL file under an exclusive lock, so a batch
//! and a concurrent reader never interleave partial lines.

use crate::{Result, ScheduleRecord};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Destination for recomputed metrics
pub trait MetricsSink {
    fn append(&mut self, record: &ScheduleRecord) -> Result<()>;
}

/// JSONL-backed sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl MetricsSink for JsonlSink {
    fn append(&mut self, record: &ScheduleRecord) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(record)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended metrics for {} to {:?}", record.schedule_id, self.path);
        Ok(())
    }
}

/// Read every record from a results log
///
/// Missing files read as empty. Lines that fail to parse are logged and
/// skipped so one torn write does not hide the rest of the log.
pub fn read_records(path: &Path) -> Result<Vec<ScheduleRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut records = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<ScheduleRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!("Skipping unreadable record at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{BlockCounting, CycleTemplate, MetricsBundle, ScheduleVersion};
    use chrono::Utc;

    pub(crate) fn record(id: &str, line: u32, days_worked: u32) -> ScheduleRecord {
        ScheduleRecord {
            schedule_id: id.into(),
            line_number: line,
            version: ScheduleVersion {
                template: CycleTemplate::from_codes(&["A", "OFF"]),
                start_date: Some("2024-01-01".into()),
                cycles: 2,
                jurisdiction: "US".into(),
                block_counting: BlockCounting::ScaleCycle,
            },
            metrics: MetricsBundle {
                days_worked,
                days_in_period: 4,
                pattern: "A".into(),
                ..MetricsBundle::default()
            },
            computed_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_read_back() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("results.jsonl");

        let mut sink = JsonlSink::new(&path);
        sink.append(&record("a", 1, 2)).unwrap();
        sink.append(&record("b", 2, 1)).unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].schedule_id, "a");
        assert_eq!(records[1].metrics.days_worked, 1);
    }

    #[test]
    fn test_torn_line_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("results.jsonl");

        let mut sink = JsonlSink::new(&path);
        sink.append(&record("a", 1, 2)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"{\"schedule_id\": \"half\n").unwrap();
        }
        sink.append(&record("c", 3, 2)).unwrap();

        let records = read_records(&path).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.schedule_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let records = read_records(&temp_dir.path().join("none.jsonl")).unwrap();
        assert!(records.is_empty());
    }
}
