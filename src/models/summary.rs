use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Column;

/// Descriptive statistics for one column of one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub country: String,
    pub column: Column,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Aggregation outcome: statistics, or an explicit marker when nothing was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Aggregate {
    Stats(SummaryStats),
    NoData { country: String, column: Column },
}

impl Aggregate {
    pub fn stats(&self) -> Option<&SummaryStats> {
        match self {
            Aggregate::Stats(stats) => Some(stats),
            Aggregate::NoData { .. } => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Aggregate::NoData { .. })
    }

    pub fn column(&self) -> Column {
        match self {
            Aggregate::Stats(stats) => stats.column,
            Aggregate::NoData { column, .. } => *column,
        }
    }
}

/// Grouping granularity for aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeBucket {
    #[default]
    Overall,
    Hour,
    Month,
    Weekday,
}

/// Key of a single aggregation group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "bucket", content = "value", rename_all = "snake_case")]
pub enum BucketKey {
    Overall,
    Hour(u32),
    Month(u32),
    /// Days from Monday (0) to Sunday (6)
    Weekday(u32),
    Cleaning(bool),
}

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketKey::Overall => f.write_str("all"),
            BucketKey::Hour(h) => write!(f, "{:02}:00", h),
            BucketKey::Month(m) => f.write_str(
                (*m as usize)
                    .checked_sub(1)
                    .and_then(|i| MONTHS.get(i))
                    .unwrap_or(&"?"),
            ),
            BucketKey::Weekday(d) => f.write_str(WEEKDAYS.get(*d as usize).unwrap_or(&"?")),
            BucketKey::Cleaning(true) => f.write_str("cleaned"),
            BucketKey::Cleaning(false) => f.write_str("not cleaned"),
        }
    }
}

/// Aggregates of every requested column within one bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSummary {
    pub key: BucketKey,
    pub aggregates: Vec<Aggregate>,
}

impl BucketSummary {
    pub fn get(&self, column: Column) -> Option<&Aggregate> {
        self.aggregates.iter().find(|a| a.column() == column)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountrySummary {
    pub country: String,
    pub total_rows: usize,
    pub buckets: Vec<BucketSummary>,
}

impl CountrySummary {
    /// Overall aggregate for a column, if the summary was computed without bucketing
    pub fn overall(&self, column: Column) -> Option<&Aggregate> {
        self.buckets
            .iter()
            .find(|b| b.key == BucketKey::Overall)
            .and_then(|b| b.get(column))
    }

    /// Bucket with the highest mean of `column`; the earliest bucket wins a tie
    pub fn peak(&self, column: Column) -> Option<(BucketKey, f64)> {
        self.buckets
            .iter()
            .filter_map(|b| Some((b.key, b.get(column)?.stats()?.mean)))
            .fold(None, |best, (key, mean)| match best {
                Some((_, top)) if top >= mean => best,
                _ => Some((key, mean)),
            })
    }
}
