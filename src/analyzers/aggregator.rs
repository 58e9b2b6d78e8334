use crate::analyzers::stats::{mean, median, sample_std_dev};
use crate::models::{
    Aggregate, BucketKey, BucketSummary, Column, CountryDataset, CountrySummary, MeasurementRow,
    SummaryStats, TimeBucket,
};
use chrono::{Datelike, Timelike};
use std::collections::BTreeMap;
use tracing::debug;

/// Computes per-country descriptive statistics, optionally grouped by time bucket.
pub struct Aggregator {
    bucket: TimeBucket,
}

impl Aggregator {
    pub fn new(bucket: TimeBucket) -> Self {
        Self { bucket }
    }

    pub fn bucket(&self) -> TimeBucket {
        self.bucket
    }

    /// Statistics of one column's observed values, or `NoData` when there are none
    pub fn describe(country: &str, column: Column, values: &[f64]) -> Aggregate {
        let (Some(mean), Some(median)) = (mean(values), median(values)) else {
            return Aggregate::NoData {
                country: country.to_string(),
                column,
            };
        };

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Aggregate::Stats(SummaryStats {
            country: country.to_string(),
            column,
            count: values.len(),
            mean,
            median,
            std_dev: sample_std_dev(values).unwrap_or(0.0),
            min,
            max,
        })
    }

    /// Summaries of `columns` for every bucket of the configured granularity.
    ///
    /// Hour, month and weekday buckets cover the whole axis so profiles line up
    /// across countries; empty buckets carry `NoData`.
    pub fn summarize(&self, dataset: &CountryDataset, columns: &[Column]) -> CountrySummary {
        let keys: Vec<BucketKey> = match self.bucket {
            TimeBucket::Overall => vec![BucketKey::Overall],
            TimeBucket::Hour => (0..24).map(BucketKey::Hour).collect(),
            TimeBucket::Month => (1..=12).map(BucketKey::Month).collect(),
            TimeBucket::Weekday => (0..7).map(BucketKey::Weekday).collect(),
        };

        let bucket = self.bucket;
        self.summarize_grouped(dataset, columns, keys, |row| bucket_key(bucket, row))
    }

    /// Summaries split by the panel-cleaning event flag
    pub fn summarize_by_cleaning(&self, dataset: &CountryDataset, columns: &[Column]) -> CountrySummary {
        let keys = vec![BucketKey::Cleaning(false), BucketKey::Cleaning(true)];
        self.summarize_grouped(dataset, columns, keys, |row| BucketKey::Cleaning(row.cleaning))
    }

    fn summarize_grouped<F>(
        &self,
        dataset: &CountryDataset,
        columns: &[Column],
        keys: Vec<BucketKey>,
        key_of: F,
    ) -> CountrySummary
    where
        F: Fn(&MeasurementRow) -> BucketKey,
    {
        let mut groups: BTreeMap<BucketKey, Vec<&MeasurementRow>> =
            keys.into_iter().map(|k| (k, Vec::new())).collect();

        for row in dataset.rows() {
            groups.entry(key_of(row)).or_default().push(row);
        }

        let buckets: Vec<BucketSummary> = groups
            .into_iter()
            .map(|(key, rows)| {
                let aggregates = columns
                    .iter()
                    .map(|column| {
                        let values: Vec<f64> = rows.iter().filter_map(|r| r.get(*column)).collect();
                        Self::describe(dataset.country(), *column, &values)
                    })
                    .collect();
                BucketSummary { key, aggregates }
            })
            .collect();

        debug!(
            "Summarized {} rows of {} into {} buckets",
            dataset.len(),
            dataset.country(),
            buckets.len()
        );

        CountrySummary {
            country: dataset.country().to_string(),
            total_rows: dataset.len(),
            buckets,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(TimeBucket::default())
    }
}

fn bucket_key(bucket: TimeBucket, row: &MeasurementRow) -> BucketKey {
    match bucket {
        TimeBucket::Overall => BucketKey::Overall,
        TimeBucket::Hour => BucketKey::Hour(row.timestamp.hour()),
        TimeBucket::Month => BucketKey::Month(row.timestamp.month()),
        TimeBucket::Weekday => BucketKey::Weekday(row.timestamp.weekday().num_days_from_monday()),
    }
}
