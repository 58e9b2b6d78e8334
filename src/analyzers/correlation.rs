use crate::models::{Column, CountryDataset};
use serde::{Deserialize, Serialize};

/// Pearson correlations between a set of columns for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub country: String,
    pub columns: Vec<Column>,
    /// Row-major, `None` where fewer than two shared observations exist or a column is constant
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn compute(dataset: &CountryDataset, columns: &[Column]) -> Self {
        let values = columns
            .iter()
            .map(|a| {
                columns
                    .iter()
                    .map(|b| pearson_pairwise(dataset, *a, *b))
                    .collect()
            })
            .collect();

        Self {
            country: dataset.country().to_string(),
            columns: columns.to_vec(),
            values,
        }
    }

    pub fn get(&self, a: Column, b: Column) -> Option<f64> {
        let i = self.columns.iter().position(|c| *c == a)?;
        let j = self.columns.iter().position(|c| *c == b)?;
        self.values[i][j]
    }

    /// Correlation of every other column with `target`, strongest first
    pub fn ranked_against(&self, target: Column) -> Vec<(Column, f64)> {
        let mut pairs: Vec<(Column, f64)> = self
            .columns
            .iter()
            .filter(|c| **c != target)
            .filter_map(|c| self.get(target, *c).map(|r| (*c, r)))
            .collect();
        pairs.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        pairs
    }
}

fn pearson_pairwise(dataset: &CountryDataset, a: Column, b: Column) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = dataset
        .rows()
        .iter()
        .filter_map(|row| Some((row.get(a)?, row.get(b)?)))
        .unzip();
    pearson(&xs, &ys)
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some((covariance / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MeasurementRow;
    use chrono::{Duration, NaiveDate};

    fn dataset() -> CountryDataset {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let rows = (0..10)
            .map(|i| {
                let x = i as f64;
                let mut row = MeasurementRow::new(start + Duration::hours(i))
                    .with_value(Column::Ghi, 100.0 * x)
                    .with_value(Column::Tamb, 20.0 + x)
                    .with_value(Column::Rh, 90.0 - 3.0 * x)
                    .with_value(Column::Bp, 1000.0);
                if i == 3 {
                    row.ws = Some(1.0);
                }
                row
            })
            .collect();
        CountryDataset::new("Benin", Column::CORE.to_vec(), rows)
    }

    #[test]
    fn test_perfect_correlations() {
        let matrix = CorrelationMatrix::compute(&dataset(), &[Column::Ghi, Column::Tamb, Column::Rh]);

        assert!((matrix.get(Column::Ghi, Column::Tamb).unwrap() - 1.0).abs() < 1e-12);
        assert!((matrix.get(Column::Ghi, Column::Rh).unwrap() + 1.0).abs() < 1e-12);
        assert!((matrix.get(Column::Ghi, Column::Ghi).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_pairs_have_no_value() {
        let matrix = CorrelationMatrix::compute(&dataset(), &[Column::Ghi, Column::Bp, Column::Ws]);

        // Constant pressure
        assert_eq!(matrix.get(Column::Ghi, Column::Bp), None);
        // Single shared observation
        assert_eq!(matrix.get(Column::Ghi, Column::Ws), None);
        assert_eq!(matrix.get(Column::Ghi, Column::Dni), None);
    }

    #[test]
    fn test_ranked_against_target() {
        let matrix = CorrelationMatrix::compute(&dataset(), &[Column::Ghi, Column::Tamb, Column::Bp]);
        let ranked = matrix.ranked_against(Column::Ghi);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0, Column::Tamb);
    }
}
