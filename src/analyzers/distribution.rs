use crate::analyzers::stats::{percentile, sorted};
use crate::models::{Column, CountryDataset};
use serde::{Deserialize, Serialize};

/// Half-open value range `[lower, upper)`; the last bin also holds the maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Five-number summary and equal-width histogram of one column for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub country: String,
    pub column: Column,
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub bins: Vec<HistogramBin>,
}

impl Distribution {
    /// `None` when the column has no observed values
    pub fn compute(dataset: &CountryDataset, column: Column, bins: usize) -> Option<Self> {
        let values = sorted(&dataset.values(column));
        let (&min, &max) = (values.first()?, values.last()?);

        Some(Self {
            country: dataset.country().to_string(),
            column,
            count: values.len(),
            min,
            q1: percentile(&values, 0.25)?,
            median: percentile(&values, 0.5)?,
            q3: percentile(&values, 0.75)?,
            max,
            bins: histogram(&values, min, max, bins.max(1)),
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn modal_bin(&self) -> Option<&HistogramBin> {
        self.bins
            .iter()
            .fold(None, |best: Option<&HistogramBin>, bin| match best {
                Some(top) if top.count >= bin.count => best,
                _ => Some(bin),
            })
    }
}

fn histogram(values: &[f64], min: f64, max: f64, bins: usize) -> Vec<HistogramBin> {
    let width = (max - min) / bins as f64;
    if width <= 0.0 {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let mut counts = vec![0usize; bins];
    for value in values {
        let index = (((value - min) / width) as usize).min(bins - 1);
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: min + i as f64 * width,
            upper: min + (i + 1) as f64 * width,
            count,
        })
        .collect()
}
