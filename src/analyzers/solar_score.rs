use crate::analyzers::stats::{mean, percentile, sample_std_dev, sorted};
use crate::models::{Column, CountryDataset};
use crate::utils::constants::{
    SCORE_CONSISTENCY_WEIGHT, SCORE_ENERGY_REFERENCE, SCORE_ENERGY_WEIGHT, SCORE_HUMIDITY_LIMIT,
    SCORE_RELIABILITY_QUANTILE, SCORE_RELIABILITY_WEIGHT, SCORE_WEATHER_WEIGHT,
};
use serde::{Deserialize, Serialize};

/// Composite 0-100 solar potential score for one country.
///
/// Components are already weighted: energy up to 40, consistency up to 30,
/// reliability up to 20 and weather resilience up to 10.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarScore {
    pub country: String,
    pub energy: f64,
    pub consistency: f64,
    pub reliability: f64,
    pub weather: f64,
    pub total: f64,
    pub ghi_mean: f64,
    pub ghi_std_dev: f64,
    /// Share of samples (%) with RH above the humidity limit, if RH was recorded
    pub high_humidity_pct: Option<f64>,
}

pub struct SolarScorer;

impl SolarScorer {
    /// Score a cleaned dataset; `None` when it holds no GHI observations
    pub fn score(dataset: &CountryDataset) -> Option<SolarScore> {
        let ghi = dataset.values(Column::Ghi);
        let ghi_mean = mean(&ghi)?;
        let ghi_std_dev = sample_std_dev(&ghi).unwrap_or(0.0);

        let energy = ghi_mean / ghi_mean.max(SCORE_ENERGY_REFERENCE) * SCORE_ENERGY_WEIGHT;

        let consistency = if ghi_std_dev > 0.0 && ghi_mean > 0.0 {
            (1.0 - ghi_std_dev / ghi_mean).max(0.0) * SCORE_CONSISTENCY_WEIGHT
        } else {
            0.0
        };

        let threshold = percentile(&sorted(&ghi), SCORE_RELIABILITY_QUANTILE)?;
        let optimal = ghi.iter().filter(|v| **v > threshold).count();
        let reliability = optimal as f64 / ghi.len() as f64 * SCORE_RELIABILITY_WEIGHT;

        let rh = dataset.values(Column::Rh);
        let high_humidity_pct = (!rh.is_empty()).then(|| {
            100.0 * rh.iter().filter(|v| **v > SCORE_HUMIDITY_LIMIT).count() as f64 / rh.len() as f64
        });
        let resilience = (100.0 - 0.5 * high_humidity_pct.unwrap_or(0.0)).max(0.0);
        let weather = resilience / 100.0 * SCORE_WEATHER_WEIGHT;

        Some(SolarScore {
            country: dataset.country().to_string(),
            energy,
            consistency,
            reliability,
            weather,
            total: energy + consistency + reliability + weather,
            ghi_mean,
            ghi_std_dev,
            high_humidity_pct,
        })
    }

    /// Scores for every dataset with GHI data, best first
    pub fn rank(datasets: &[CountryDataset]) -> Vec<SolarScore> {
        let mut scores: Vec<SolarScore> = datasets.iter().filter_map(Self::score).collect();
        scores.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.country.cmp(&b.country))
        });
        scores
    }
}
