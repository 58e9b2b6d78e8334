use crate::analyzers::{Aggregator, CorrelationMatrix};
use crate::models::{BucketKey, Column, CountryDataset, TimeBucket};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Headline facts about one cleaned dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetOverview {
    pub country: String,
    pub rows: usize,
    pub columns: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    /// Cells still missing after cleaning, e.g. in unimputable columns
    pub missing_values: usize,
    /// Hour of day with the highest mean GHI, and that mean
    pub peak_hour: Option<(u32, f64)>,
    /// Pearson r of GHI against each weather variable present, strongest first
    pub weather_impact: Vec<(Column, f64)>,
}

impl DatasetOverview {
    pub fn from_dataset(dataset: &CountryDataset) -> Self {
        let (first_timestamp, last_timestamp) = dataset.time_range().unzip();

        let missing_values = dataset
            .rows()
            .iter()
            .map(|row| dataset.columns().iter().filter(|c| row.get(**c).is_none()).count())
            .sum();

        let peak_hour = Aggregator::new(TimeBucket::Hour)
            .summarize(dataset, &[Column::Ghi])
            .peak(Column::Ghi)
            .and_then(|(key, mean)| match key {
                BucketKey::Hour(hour) => Some((hour, mean)),
                _ => None,
            });

        Self {
            country: dataset.country().to_string(),
            rows: dataset.len(),
            columns: dataset.columns().len(),
            first_timestamp,
            last_timestamp,
            missing_values,
            peak_hour,
            weather_impact: weather_impact(dataset),
        }
    }
}

fn weather_impact(dataset: &CountryDataset) -> Vec<(Column, f64)> {
    if !dataset.has_column(Column::Ghi) {
        return Vec::new();
    }

    let mut columns = vec![Column::Ghi];
    columns.extend(Column::WEATHER.into_iter().filter(|c| dataset.has_column(*c)));
    CorrelationMatrix::compute(dataset, &columns).ranked_against(Column::Ghi)
}
