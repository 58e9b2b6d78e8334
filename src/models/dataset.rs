use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::models::{Column, MeasurementRow};

/// Cleaned, timestamp-ordered measurements for one country.
///
/// Read-only once built; filters return a new dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryDataset {
    country: String,
    columns: Vec<Column>,
    rows: Vec<MeasurementRow>,
}

impl CountryDataset {
    pub fn new(country: impl Into<String>, columns: Vec<Column>, mut rows: Vec<MeasurementRow>) -> Self {
        rows.sort_by_key(|r| r.timestamp);
        Self {
            country: country.into(),
            columns,
            rows,
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    /// Columns present in the source file
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    pub fn rows(&self) -> &[MeasurementRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Observed values of a column, skipping missing cells
    pub fn values(&self, column: Column) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get(column)).collect()
    }

    /// Restrict to rows whose hour of day lies in `start..=end`
    pub fn filter_hours(&self, start: u32, end: u32) -> Self {
        let rows = self
            .rows
            .iter()
            .filter(|r| (start..=end).contains(&r.timestamp.hour()))
            .cloned()
            .collect();

        Self {
            country: self.country.clone(),
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn time_range(&self) -> Option<(chrono::NaiveDateTime, chrono::NaiveDateTime)> {
        match (self.rows.first(), self.rows.last()) {
            (Some(first), Some(last)) => Some((first.timestamp, last.timestamp)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(hour: u32, ghi: Option<f64>) -> MeasurementRow {
        let ts = NaiveDate::from_ymd_opt(2022, 3, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        let mut row = MeasurementRow::new(ts);
        row.ghi = ghi;
        row
    }

    #[test]
    fn test_rows_sorted_on_construction() {
        let dataset = CountryDataset::new(
            "Togo",
            vec![Column::Ghi],
            vec![row(14, Some(600.0)), row(6, Some(20.0)), row(10, None)],
        );

        let hours: Vec<u32> = dataset.rows().iter().map(|r| r.timestamp.hour()).collect();
        assert_eq!(hours, vec![6, 10, 14]);
        assert_eq!(dataset.values(Column::Ghi), vec![20.0, 600.0]);
        assert!(dataset.has_column(Column::Ghi));
        assert!(!dataset.has_column(Column::Bp));
    }

    #[test]
    fn test_filter_hours_returns_new_dataset() {
        let dataset = CountryDataset::new(
            "Benin",
            vec![Column::Ghi],
            (0..24).map(|h| row(h, Some(h as f64))).collect(),
        );

        let daytime = dataset.filter_hours(6, 18);
        assert_eq!(daytime.len(), 13);
        assert_eq!(dataset.len(), 24);
        assert_eq!(daytime.country(), "Benin");
        assert_eq!(daytime.time_range().unwrap().0.hour(), 6);
    }
}
