//! Layered run configuration.
//!
//! Defaults come from the `Default` impls below, overridden by an optional
//! TOML/JSON/YAML file and then by `SOLAR_*` environment variables
//! (`SOLAR_CLEANING__MISSING=median`). CLI flags are applied last by the
//! command layer.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;
use validator::{Validate, ValidationError};

use crate::error::{ProcessingError, Result};
use crate::models::{TestKind, TimeBucket};
use crate::utils::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_OUTLIER_Z_THRESHOLD, DEFAULT_SIGNIFICANCE_LEVEL, ENV_PREFIX,
};

/// What to do with a negative GHI/DNI/DHI/ModA/ModB reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NegativeIrradiancePolicy {
    /// Replace the value with 0 (night-time sensor offset)
    #[default]
    Clip,
    /// Drop the whole row
    Drop,
}

/// How to fill missing numeric cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MissingValuePolicy {
    #[default]
    Mean,
    Median,
    /// Drop rows with any missing value in a column present in the file
    Drop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CleaningConfig {
    pub negative_irradiance: NegativeIrradiancePolicy,
    pub missing: MissingValuePolicy,

    #[validate(range(exclusive_min = 0.0))]
    pub outlier_z_threshold: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            negative_irradiance: NegativeIrradiancePolicy::default(),
            missing: MissingValuePolicy::default(),
            outlier_z_threshold: DEFAULT_OUTLIER_Z_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ComparisonConfig {
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub significance_level: f64,
    pub test: TestKind,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            test: TestKind::default(),
        }
    }
}

/// Inclusive hour-of-day window, e.g. `6-18` for daytime analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_hour_order"))]
pub struct HourRange {
    #[validate(range(max = 23))]
    pub start: u32,
    #[validate(range(max = 23))]
    pub end: u32,
}

fn validate_hour_order(range: &HourRange) -> std::result::Result<(), ValidationError> {
    if range.start > range.end {
        return Err(ValidationError::new("hour_range_order"));
    }
    Ok(())
}

impl FromStr for HourRange {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s.split_once('-').ok_or_else(|| {
            ProcessingError::InvalidFormat(format!("Expected START-END hour range, got '{}'", s))
        })?;

        let parse = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| {
                ProcessingError::InvalidFormat(format!("Invalid hour '{}' in range '{}'", part, s))
            })
        };

        let range = HourRange {
            start: parse(start)?,
            end: parse(end)?,
        };
        range.validate()?;
        Ok(range)
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:00-{:02}:59", self.start, self.end)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AnalysisConfig {
    pub bucket: TimeBucket,

    #[validate(nested)]
    pub hours: Option<HourRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub cleaning: CleaningConfig,

    #[validate(nested)]
    pub comparison: ComparisonConfig,

    #[validate(nested)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load configuration from `path` (required when given) or from
    /// `solar-analytics.toml` in the working directory (optional), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(p) => File::from(p).required(true),
            None => File::from(Path::new(DEFAULT_CONFIG_FILE)).required(false),
        };

        let config: AppConfig = Config::builder()
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }
}
