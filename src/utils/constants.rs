/// Timestamp header candidates, in lookup order
pub const TIMESTAMP_HEADERS: [&str; 6] = ["Timestamp", "timestamp", "Date", "date", "Time", "time"];

/// Cleaning-event flag header
pub const CLEANING_HEADER: &str = "Cleaning";

/// Cell contents treated as a missing value
pub const MISSING_MARKERS: [&str; 7] = ["", "na", "n/a", "nan", "null", "none", "-"];

/// Output timestamp format for cleaned CSV exports
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Cleaning defaults
pub const DEFAULT_OUTLIER_Z_THRESHOLD: f64 = 3.0;

/// Comparison defaults
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;
pub const MIN_OBSERVATIONS_PER_GROUP: usize = 2;

/// Solar score weights (sum to 100)
pub const SCORE_ENERGY_WEIGHT: f64 = 40.0;
pub const SCORE_CONSISTENCY_WEIGHT: f64 = 30.0;
pub const SCORE_RELIABILITY_WEIGHT: f64 = 20.0;
pub const SCORE_WEATHER_WEIGHT: f64 = 10.0;

/// GHI mean (W/m²) at which the energy component saturates
pub const SCORE_ENERGY_REFERENCE: f64 = 500.0;
/// GHI quantile used as the "optimal hours" threshold
pub const SCORE_RELIABILITY_QUANTILE: f64 = 0.7;
/// RH (%) above which a sample counts against weather resilience
pub const SCORE_HUMIDITY_LIMIT: f64 = 85.0;

/// Presentation
pub const CHART_WIDTH: usize = 40;
pub const HISTOGRAM_BINS: usize = 10;

/// I/O
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB
pub const DEFAULT_CONFIG_FILE: &str = "solar-analytics.toml";
pub const ENV_PREFIX: &str = "SOLAR";
