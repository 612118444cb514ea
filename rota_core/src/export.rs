//! Flat CSV report of computed metrics.

use crate::{Result, ScheduleRecord};
use std::fs::File;
use std::path::Path;

/// One report row; the block histogram is spread over fixed columns
#[derive(Debug, serde::Serialize)]
struct ReportRow<'a> {
    schedule_id: &'a str,
    line_number: u32,
    jurisdiction: &'a str,
    start_date: Option<&'a str>,
    cycles: u32,
    cycle_length: u32,
    days_in_period: u32,
    days_worked: u32,
    full_weekends: u32,
    orphan_saturdays: u32,
    orphan_sundays: u32,
    weekends_off: u32,
    longest_stretch: u32,
    blocks_1: u32,
    blocks_2: u32,
    blocks_3: u32,
    blocks_4: u32,
    blocks_5: u32,
    blocks_6: u32,
    blocks_7_plus: u32,
    friday_weekend_blocks: u32,
    weekday_blocks: u32,
    holidays_worked: u32,
    pattern: &'a str,
    computed_at: String,
}

impl<'a> From<&'a ScheduleRecord> for ReportRow<'a> {
    fn from(record: &'a ScheduleRecord) -> Self {
        let m = &record.metrics;
        let b = &m.blocks.counts;
        ReportRow {
            schedule_id: &record.schedule_id,
            line_number: record.line_number,
            jurisdiction: &record.version.jurisdiction,
            start_date: record.version.start_date.as_deref(),
            cycles: m.cycles,
            cycle_length: m.cycle_length,
            days_in_period: m.days_in_period,
            days_worked: m.days_worked,
            full_weekends: m.full_weekends,
            orphan_saturdays: m.orphan_saturdays,
            orphan_sundays: m.orphan_sundays,
            weekends_off: m.weekends_off,
            longest_stretch: m.longest_stretch,
            blocks_1: b[0],
            blocks_2: b[1],
            blocks_3: b[2],
            blocks_4: b[3],
            blocks_5: b[4],
            blocks_6: b[5],
            blocks_7_plus: b[6],
            friday_weekend_blocks: m.friday_weekend_blocks,
            weekday_blocks: m.weekday_blocks,
            holidays_worked: m.holidays_worked,
            pattern: &m.pattern,
            computed_at: record.computed_at.to_rfc3339(),
        }
    }
}

/// Write records to a CSV report, replacing any previous report
///
/// The file is synced before returning. Returns the number of rows written.
pub fn export_metrics_csv<'a, I>(records: I, path: &Path) -> Result<usize>
where
    I: IntoIterator<Item = &'a ScheduleRecord>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(file);

    let mut rows = 0;
    for record in records {
        writer.serialize(ReportRow::from(record))?;
        rows += 1;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Exported {} metrics rows to {:?}", rows, path);
    Ok(rows)
}
