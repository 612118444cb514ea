#![forbid(unsafe_code)]

//! Core domain model and analysis engine for the Rota shift-schedule system.
//!
//! This crate provides:
//! - Domain types (shift codes, cycle templates, schedules, metrics, criteria)
//! - Schedule expansion into dated shifts
//! - Pattern analysis (weekends, blocks, weekday tallies)
//! - Holiday tables and the holiday overlay with its cache
//! - Preference scoring and ranking
//! - Batch recompute with results log, metrics store, and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod shift_codes;
pub mod expander;
pub mod holidays;
pub mod overlay;
pub mod analyzer;
pub mod metrics;
pub mod validation;
pub mod scoring;
pub mod sink;
pub mod store;
pub mod export;
pub mod input;
pub mod batch;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use expander::{expand_cycle, expand_schedule, parse_start_date};
pub use holidays::{
    BuiltinHolidayProvider, CsvHolidayProvider, HolidayTableProvider, StaticHolidayProvider,
};
pub use overlay::{HolidayCache, HolidayOverlap, HolidayOverlay};
pub use analyzer::{analyze_cycle, analyze_full_span, pattern_label};
pub use metrics::compute_metrics;
pub use validation::{sanitize_metrics, ValidatedMetrics};
pub use scoring::{rank_schedules, score_schedule};
pub use sink::{read_records, JsonlSink, MetricsSink};
pub use store::MetricsStore;
pub use export::export_metrics_csv;
pub use input::{load_criteria, load_schedules};
pub use batch::{resolve_jurisdiction, BatchRunner};
