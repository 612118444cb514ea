//! Configuration file support for Rota.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/rota/config.toml`.

use crate::{BlockCounting, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub holidays: HolidayConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Holiday calendar configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HolidayConfig {
    #[serde(default = "default_jurisdiction")]
    pub default_jurisdiction: String,

    /// CSV holiday table; the built-in calendar is used when unset
    #[serde(default)]
    pub table_path: Option<PathBuf>,
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            default_jurisdiction: default_jurisdiction(),
            table_path: None,
        }
    }
}

/// Scoring parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_min_weight")]
    pub min_weight: f64,

    #[serde(default = "default_max_weight")]
    pub max_weight: f64,

    /// Score when no factor is active or all weights are zero
    #[serde(default = "default_neutral_score")]
    pub neutral_score: f64,

    /// Score for a schedule that contains no worked shifts
    #[serde(default = "default_empty_schedule_score")]
    pub empty_schedule_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_weight: default_min_weight(),
            max_weight: default_max_weight(),
            neutral_score: default_neutral_score(),
            empty_schedule_score: default_empty_schedule_score(),
        }
    }
}

/// Batch recompute parameters
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default)]
    pub block_counting: BlockCounting,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            block_counting: BlockCounting::default(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("rota")
}

fn default_jurisdiction() -> String {
    "US".into()
}

fn default_min_weight() -> f64 {
    0.0
}

fn default_max_weight() -> f64 {
    5.0
}

fn default_neutral_score() -> f64 {
    50.0
}

fn default_empty_schedule_score() -> f64 {
    0.0
}

fn default_workers() -> usize {
    4
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("rota").join("config.toml")
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        if !scoring.min_weight.is_finite()
            || !scoring.max_weight.is_finite()
            || scoring.min_weight < 0.0
            || scoring.min_weight > scoring.max_weight
        {
            return Err(Error::Settings(format!(
                "weight range [{}, {}] is invalid",
                scoring.min_weight, scoring.max_weight
            )));
        }
        for (name, value) in [
            ("neutral_score", scoring.neutral_score),
            ("empty_schedule_score", scoring.empty_schedule_score),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::Settings(format!(
                    "{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }
        if self.batch.workers == 0 {
            return Err(Error::Settings("batch.workers must be at least 1".into()));
        }
        if self.holidays.default_jurisdiction.trim().is_empty() {
            return Err(Error::Settings(
                "holidays.default_jurisdiction must not be empty".into(),
            ));
        }
        Ok(())
    }
}
