use clap::{Parser, Subcommand};
use rota_core::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rota")]
#[command(about = "Shift schedule pattern analysis and preference scoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use this config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute and print metrics for each schedule
    Metrics {
        /// Only this schedule id
        #[arg(long)]
        schedule: Option<String>,

        /// Holiday jurisdiction (overrides each schedule's own)
        #[arg(long)]
        jurisdiction: Option<String>,

        /// Count blocks across the whole period instead of scaling one cycle
        #[arg(long)]
        full_span: bool,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Score and rank schedules against preference criteria
    Score {
        /// Criteria JSON file
        #[arg(long)]
        criteria: PathBuf,

        /// Only this schedule id
        #[arg(long)]
        schedule: Option<String>,

        /// Show only the best N schedules
        #[arg(long)]
        top: Option<usize>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Recompute stored metrics for all schedules
    Recompute {
        /// Holiday jurisdiction (overrides each schedule's own)
        #[arg(long)]
        jurisdiction: Option<String>,

        /// Only schedules whose stored metrics are missing or out of date
        #[arg(long)]
        stale_only: bool,
    },

    /// Export stored metrics to a CSV report
    Export {
        /// Output path (default: <data-dir>/metrics.csv)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List holidays for a jurisdiction and year
    Holidays {
        #[arg(long)]
        year: i32,

        #[arg(long)]
        jurisdiction: Option<String>,
    },
}

/// Files under the data directory
struct DataPaths {
    schedules: PathBuf,
    shift_codes: PathBuf,
    store: PathBuf,
    results: PathBuf,
    report: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        Self {
            schedules: data_dir.join("schedules.json"),
            shift_codes: data_dir.join("shift_codes.json"),
            store: data_dir.join("metrics.json"),
            results: data_dir.join("results.jsonl"),
            report: data_dir.join("metrics.csv"),
        }
    }
}

fn main() -> Result<()> {
    rota_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let paths = DataPaths::new(&data_dir);

    match cli.command {
        Commands::Metrics {
            schedule,
            jurisdiction,
            full_span,
            json,
        } => cmd_metrics(&paths, &config, schedule, jurisdiction, full_span, json),
        Commands::Score {
            criteria,
            schedule,
            top,
            json,
        } => cmd_score(&paths, &config, &criteria, schedule, top, json),
        Commands::Recompute {
            jurisdiction,
            stale_only,
        } => cmd_recompute(&paths, &config, jurisdiction, stale_only),
        Commands::Export { output } => cmd_export(&paths, output),
        Commands::Holidays { year, jurisdiction } => cmd_holidays(&config, year, jurisdiction),
    }
}

fn build_overlay(config: &Config) -> Result<HolidayOverlay> {
    let provider: Arc<dyn HolidayTableProvider> = match &config.holidays.table_path {
        Some(path) => Arc::new(CsvHolidayProvider::load(path)?),
        None => Arc::new(BuiltinHolidayProvider),
    };
    Ok(HolidayOverlay::new(provider, Arc::new(HolidayCache::new())))
}

fn load_inputs(paths: &DataPaths, only: Option<&str>) -> Result<(Vec<ScheduleInstance>, ShiftCodeTable)> {
    let table = ShiftCodeTable::load_from(&paths.shift_codes)?;
    for problem in table.validate() {
        eprintln!("Shift code warning: {}", problem);
    }

    let mut schedules = load_schedules(&paths.schedules)?;
    if let Some(id) = only {
        schedules.retain(|s| s.id == id);
        if schedules.is_empty() {
            return Err(Error::Other(format!("No schedule with id '{}'", id)));
        }
    }
    Ok((schedules, table))
}

fn cmd_metrics(
    paths: &DataPaths,
    config: &Config,
    only: Option<String>,
    jurisdiction: Option<String>,
    full_span: bool,
    json: bool,
) -> Result<()> {
    let (schedules, table) = load_inputs(paths, only.as_deref())?;
    let overlay = build_overlay(config)?;
    let counting = if full_span {
        BlockCounting::FullSpan
    } else {
        config.batch.block_counting
    };

    tracing::info!("Computing metrics for {} schedule(s) ({:?})", schedules.len(), counting);
    let mut computed = Vec::new();
    let mut failures = 0;
    for schedule in &schedules {
        let resolved = resolve_jurisdiction(
            jurisdiction.as_deref(),
            schedule,
            &config.holidays.default_jurisdiction,
        );
        match compute_metrics(schedule, &table, &overlay, &resolved, counting) {
            Ok(metrics) => computed.push((schedule, metrics)),
            Err(e) => {
                failures += 1;
                eprintln!("✗ {}: {}", schedule.id, e);
            }
        }
    }

    if json {
        let rows: Vec<serde_json::Value> = computed
            .iter()
            .map(|(schedule, metrics)| {
                serde_json::json!({ "schedule_id": schedule.id, "metrics": metrics })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for (schedule, metrics) in &computed {
            display_metrics(schedule, metrics);
        }
    }

    if failures > 0 {
        eprintln!("{} schedule(s) could not be analyzed", failures);
    }
    Ok(())
}

fn display_metrics(schedule: &ScheduleInstance, m: &MetricsBundle) {
    println!("{} (line {})  {}", schedule.id, schedule.line_number, m.pattern);
    println!(
        "  Worked {} of {} days over {} cycle(s) of {}",
        m.days_worked, m.days_in_period, m.cycles, m.cycle_length
    );
    println!(
        "  Weekends: {} full, {} Saturday only, {} Sunday only, {} off",
        m.full_weekends, m.orphan_saturdays, m.orphan_sundays, m.weekends_off
    );
    let blocks: Vec<String> = m
        .blocks
        .counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(i, count)| {
            if i + 1 == BLOCK_BUCKETS {
                format!("{}+d×{}", i + 1, count)
            } else {
                format!("{}d×{}", i + 1, count)
            }
        })
        .collect();
    println!(
        "  Blocks: {}  (longest {})",
        if blocks.is_empty() { "none".to_string() } else { blocks.join(" ") },
        m.longest_stretch
    );
    println!("  Holidays worked: {}", m.holidays_worked);
    for worked in &m.holiday_details {
        println!("    → {} {} ({})", worked.date, worked.name, worked.code);
    }
}

fn cmd_score(
    paths: &DataPaths,
    config: &Config,
    criteria_path: &Path,
    only: Option<String>,
    top: Option<usize>,
    json: bool,
) -> Result<()> {
    let (mut schedules, table) = load_inputs(paths, only.as_deref())?;
    let criteria = load_criteria(criteria_path)?;
    let counting = config.batch.block_counting;

    // Reuse stored metrics that still match the schedule
    let store = MetricsStore::load(&paths.store)?;
    let mut reused = 0;
    for schedule in schedules.iter_mut().filter(|s| s.metrics.is_none()) {
        let resolved = resolve_jurisdiction(None, schedule, &config.holidays.default_jurisdiction);
        if let Some(record) = store.get_fresh(schedule, &resolved, counting) {
            schedule.attach_record(record);
            reused += 1;
        }
    }
    tracing::info!(
        "Scoring {} schedule(s) against {:?} ({} with stored metrics)",
        schedules.len(),
        criteria_path,
        reused
    );

    let mut ranked = rank_schedules(&schedules, &table, &criteria, &config.scoring, counting);
    if let Some(n) = top {
        ranked.truncate(n);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }

    for (rank, result) in ranked.iter().enumerate() {
        println!("{}. {}  {:.1}", rank + 1, result.schedule_id, result.score);
        println!("   {}", result.explanation);
    }
    Ok(())
}

/// Feeds each record to the results log and the metrics store
struct RecordSinks<'a> {
    log: &'a mut JsonlSink,
    store: &'a mut MetricsStore,
}

impl MetricsSink for RecordSinks<'_> {
    fn append(&mut self, record: &ScheduleRecord) -> Result<()> {
        self.log.append(record)?;
        self.store.append(record)
    }
}

fn cmd_recompute(
    paths: &DataPaths,
    config: &Config,
    jurisdiction: Option<String>,
    stale_only: bool,
) -> Result<()> {
    let (schedules, table) = load_inputs(paths, None)?;
    let overlay = build_overlay(config)?;
    let runner = BatchRunner::new(Arc::new(table), overlay, config)?;
    let mut log = JsonlSink::new(&paths.results);

    let mut summary = None;
    MetricsStore::update(&paths.store, |store| {
        let targets: Vec<ScheduleInstance> = if stale_only {
            store
                .stale(
                    &schedules,
                    jurisdiction.as_deref(),
                    &config.holidays.default_jurisdiction,
                    config.batch.block_counting,
                )
                .into_iter()
                .cloned()
                .collect()
        } else {
            schedules.clone()
        };
        if targets.is_empty() {
            return Ok(());
        }

        tracing::info!("Recomputing {} of {} schedule(s)", targets.len(), schedules.len());
        let mut sinks = RecordSinks { log: &mut log, store };
        summary = Some(runner.recompute_all(&targets, jurisdiction.as_deref(), &mut sinks)?);
        Ok(())
    })?;

    let Some(summary) = summary else {
        println!("All stored metrics are up to date.");
        return Ok(());
    };

    println!(
        "✓ Recomputed {} schedule(s): {} succeeded, {} failed",
        summary.processed, summary.succeeded, summary.failed
    );
    for failure in &summary.failures {
        println!("  ✗ {} (line {}): {}", failure.schedule_id, failure.line_number, failure.reason);
    }
    println!("  Run: {}", summary.run_id);
    println!("  Log: {}", log.path().display());
    Ok(())
}

fn cmd_export(paths: &DataPaths, output: Option<PathBuf>) -> Result<()> {
    let store = MetricsStore::load(&paths.store)?;
    if store.is_empty() {
        println!("No stored metrics - run `rota recompute` first.");
        return Ok(());
    }

    let output = output.unwrap_or_else(|| paths.report.clone());
    tracing::info!("Exporting {} stored record(s) to {:?}", store.len(), output);
    let rows = export_metrics_csv(store.ordered_records(), &output)?;
    println!("✓ Exported {} schedule(s)", rows);
    println!("  CSV: {}", output.display());
    Ok(())
}

fn cmd_holidays(config: &Config, year: i32, jurisdiction: Option<String>) -> Result<()> {
    let jurisdiction = jurisdiction.unwrap_or_else(|| config.holidays.default_jurisdiction.clone());
    let overlay = build_overlay(config)?;
    let table = overlay.holidays_for_year(&jurisdiction, year)?;

    if table.is_empty() {
        println!("No holidays listed for {} {}", jurisdiction, year);
        return Ok(());
    }
    for holiday in table.iter() {
        let weekday = holiday.date.format("%A").to_string();
        println!("{}  {:<9}  {}", holiday.date, weekday, holiday.name);
    }
    Ok(())
}
