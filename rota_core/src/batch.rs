//! Batch recompute of stored metrics.
//!
//! Schedules are computed in parallel on a bounded rayon pool, each in
//! isolation. Results are handed to the sink afterwards, one at a time and
//! in input order, so sinks need no synchronization of their own.

use crate::holidays::normalize_jurisdiction;
use crate::metrics::compute_metrics;
use crate::overlay::HolidayOverlay;
use crate::sink::MetricsSink;
use crate::{
    BatchFailure, BatchSummary, BlockCounting, Config, Error, Result, ScheduleInstance,
    ScheduleRecord, ShiftCodeTable,
};
use chrono::Utc;
use rayon::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

/// Pick the jurisdiction for a schedule: explicit argument, then the
/// schedule's own, then the configured default
pub fn resolve_jurisdiction(
    explicit: Option<&str>,
    schedule: &ScheduleInstance,
    default_jurisdiction: &str,
) -> String {
    let chosen = [explicit, schedule.jurisdiction.as_deref()]
        .into_iter()
        .flatten()
        .find(|j| !j.trim().is_empty())
        .unwrap_or(default_jurisdiction);
    normalize_jurisdiction(chosen)
}

pub struct BatchRunner {
    table: Arc<ShiftCodeTable>,
    overlay: HolidayOverlay,
    default_jurisdiction: String,
    counting: BlockCounting,
    pool: rayon::ThreadPool,
}

impl BatchRunner {
    pub fn new(table: Arc<ShiftCodeTable>, overlay: HolidayOverlay, config: &Config) -> Result<Self> {
        let workers = config.batch.workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("rota-batch-{}", i))
            .build()
            .map_err(|e| Error::Other(format!("failed to start batch pool: {}", e)))?;

        Ok(Self {
            table,
            overlay,
            default_jurisdiction: config.holidays.default_jurisdiction.clone(),
            counting: config.batch.block_counting,
            pool,
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Compute one schedule's record
    pub fn recompute_one(&self, schedule: &ScheduleInstance, jurisdiction: Option<&str>) -> Result<ScheduleRecord> {
        let jurisdiction = resolve_jurisdiction(jurisdiction, schedule, &self.default_jurisdiction);
        let metrics = compute_metrics(schedule, &self.table, &self.overlay, &jurisdiction, self.counting)?;
        Ok(ScheduleRecord {
            schedule_id: schedule.id.clone(),
            line_number: schedule.line_number,
            version: schedule.version_for(&jurisdiction, self.counting),
            metrics,
            computed_at: Utc::now(),
        })
    }

    /// Recompute every schedule and hand the results to `sink`
    ///
    /// A schedule that fails to compute, or that the sink rejects, is
    /// recorded in the summary and the batch carries on.
    pub fn recompute_all(
        &self,
        schedules: &[ScheduleInstance],
        jurisdiction: Option<&str>,
        sink: &mut dyn MetricsSink,
    ) -> Result<BatchSummary> {
        let run_id = Uuid::new_v4();
        tracing::info!(
            "Batch {} recomputing {} schedules on {} workers",
            run_id,
            schedules.len(),
            self.workers()
        );

        let results: Vec<Result<ScheduleRecord>> = self.pool.install(|| {
            schedules
                .par_iter()
                .map(|schedule| self.recompute_one(schedule, jurisdiction))
                .collect()
        });

        let mut summary = BatchSummary {
            run_id,
            processed: schedules.len(),
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
        };

        for (schedule, result) in schedules.iter().zip(results) {
            let outcome = result.and_then(|record| sink.append(&record));
            match outcome {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    tracing::warn!("Batch {}: schedule {} failed: {}", run_id, schedule.id, e);
                    summary.failed += 1;
                    summary.failures.push(BatchFailure {
                        schedule_id: schedule.id.clone(),
                        line_number: schedule.line_number,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Batch {} finished: {} processed, {} succeeded, {} failed",
            run_id,
            summary.processed,
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }
}
