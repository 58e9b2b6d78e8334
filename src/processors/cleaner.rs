use crate::analyzers::stats::{mean, median, sample_std_dev};
use crate::config::{CleaningConfig, MissingValuePolicy, NegativeIrradiancePolicy};
use crate::error::{ProcessingError, Result};
use crate::models::{Column, CountryDataset, MeasurementRow, RawDataset, RawRecord};
use crate::utils::constants::MISSING_MARKERS;
use crate::utils::timestamp::parse_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use validator::Validate;

/// Per-column counters collected while cleaning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnCleaning {
    /// Negative irradiance values set to zero
    pub clipped: usize,
    /// Non-empty cells that were not numbers
    pub unparsable: usize,
    /// Missing cells in kept rows, before imputation
    pub missing: usize,
    pub imputed: usize,
    /// Value used to fill missing cells
    pub fill_value: Option<f64>,
    /// Values beyond the z-score threshold (flagged, not removed)
    pub outliers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub country: String,
    pub source: String,
    pub negative_policy: NegativeIrradiancePolicy,
    pub missing_policy: MissingValuePolicy,
    pub rows_read: usize,
    pub malformed_rows: usize,
    pub dropped_unparsable_timestamp: usize,
    pub dropped_negative_irradiance: usize,
    pub dropped_out_of_range: usize,
    pub dropped_duplicate_timestamp: usize,
    pub dropped_missing_values: usize,
    pub rows_kept: usize,
    pub columns: BTreeMap<Column, ColumnCleaning>,
    /// Columns with no observed value at all, left missing
    pub unimputable_columns: Vec<Column>,
}

impl CleaningReport {
    fn new(raw: &RawDataset, config: &CleaningConfig) -> Self {
        Self {
            country: raw.country.clone(),
            source: raw.source.clone(),
            negative_policy: config.negative_irradiance,
            missing_policy: config.missing,
            rows_read: raw.rows.len(),
            malformed_rows: raw.malformed_rows,
            dropped_unparsable_timestamp: 0,
            dropped_negative_irradiance: 0,
            dropped_out_of_range: 0,
            dropped_duplicate_timestamp: 0,
            dropped_missing_values: 0,
            rows_kept: 0,
            columns: raw
                .columns
                .iter()
                .map(|c| (*c, ColumnCleaning::default()))
                .collect(),
            unimputable_columns: Vec::new(),
        }
    }

    fn column_mut(&mut self, column: Column) -> &mut ColumnCleaning {
        self.columns.entry(column).or_default()
    }

    pub fn rows_dropped(&self) -> usize {
        self.dropped_unparsable_timestamp
            + self.dropped_negative_irradiance
            + self.dropped_out_of_range
            + self.dropped_duplicate_timestamp
            + self.dropped_missing_values
    }

    pub fn values_clipped(&self) -> usize {
        self.columns.values().map(|c| c.clipped).sum()
    }

    pub fn values_imputed(&self) -> usize {
        self.columns.values().map(|c| c.imputed).sum()
    }

    pub fn outliers_flagged(&self) -> usize {
        self.columns.values().map(|c| c.outliers).sum()
    }

    /// Multi-line human readable summary
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("=== Cleaning Report: {} ===\n", self.country));
        summary.push_str(&format!("Source: {}\n", self.source));
        summary.push_str(&format!(
            "Rows read: {} (unreadable: {})\n",
            self.rows_read, self.malformed_rows
        ));
        summary.push_str(&format!(
            "Rows kept: {} ({:.1}%)\n",
            self.rows_kept,
            percentage(self.rows_kept, self.rows_read)
        ));
        summary.push_str(&format!("Rows dropped: {}\n", self.rows_dropped()));
        summary.push_str(&format!(
            "  - unparsable timestamp: {}\n",
            self.dropped_unparsable_timestamp
        ));
        summary.push_str(&format!(
            "  - negative irradiance: {}\n",
            self.dropped_negative_irradiance
        ));
        summary.push_str(&format!(
            "  - outside physical range: {}\n",
            self.dropped_out_of_range
        ));
        summary.push_str(&format!(
            "  - duplicate timestamp: {}\n",
            self.dropped_duplicate_timestamp
        ));
        summary.push_str(&format!(
            "  - missing values: {}\n",
            self.dropped_missing_values
        ));
        summary.push_str(&format!(
            "Negative irradiance policy: {:?}, clipped values: {}\n",
            self.negative_policy,
            self.values_clipped()
        ));
        summary.push_str(&format!(
            "Missing value policy: {:?}, imputed values: {}\n",
            self.missing_policy,
            self.values_imputed()
        ));
        summary.push_str(&format!("Outliers flagged: {}\n", self.outliers_flagged()));

        let noisy: Vec<String> = self
            .columns
            .iter()
            .filter(|(_, c)| c.clipped + c.unparsable + c.missing + c.outliers > 0)
            .map(|(column, c)| {
                format!(
                    "  {:<14} clipped={} unparsable={} missing={} imputed={} outliers={}",
                    column.header(),
                    c.clipped,
                    c.unparsable,
                    c.missing,
                    c.imputed,
                    c.outliers
                )
            })
            .collect();

        if !noisy.is_empty() {
            summary.push_str("\nPer-column:\n");
            for line in noisy {
                summary.push_str(&line);
                summary.push('\n');
            }
        }

        if !self.unimputable_columns.is_empty() {
            let names: Vec<&str> = self.unimputable_columns.iter().map(|c| c.header()).collect();
            summary.push_str(&format!(
                "Columns without any observations: {}\n",
                names.join(", ")
            ));
        }

        summary
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * part as f64 / total as f64
    }
}

enum Cell {
    Value(f64),
    Missing,
    Unparsable,
}

fn parse_cell(raw: Option<&str>) -> Cell {
    let Some(text) = raw.map(str::trim) else {
        return Cell::Missing;
    };

    if MISSING_MARKERS.contains(&text.to_ascii_lowercase().as_str()) {
        return Cell::Missing;
    }

    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Cell::Value(v),
        _ => Cell::Unparsable,
    }
}

fn parse_cleaning_flag(raw: Option<&str>) -> bool {
    let Some(text) = raw.map(str::trim) else {
        return false;
    };

    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" => true,
        other => other.parse::<f64>().is_ok_and(|v| v.is_finite() && v != 0.0),
    }
}

/// Turns raw loader rows into a cleaned `CountryDataset`.
pub struct Cleaner {
    config: CleaningConfig,
}

impl Cleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Clean one country. Row-level problems are counted, never returned as errors.
    pub fn clean(&self, raw: &RawDataset) -> Result<(CountryDataset, CleaningReport)> {
        let mut report = CleaningReport::new(raw, &self.config);

        let mut rows: Vec<MeasurementRow> = raw
            .rows
            .iter()
            .filter_map(|record| self.clean_record(raw, record, &mut report))
            .collect();

        self.drop_duplicate_timestamps(&mut rows, &mut report);
        self.handle_missing(&raw.columns, &mut rows, &mut report);

        if rows.is_empty() {
            return Err(ProcessingError::NoValidRows {
                country: raw.country.clone(),
            });
        }

        self.flag_outliers(&raw.columns, &rows, &mut report);
        report.rows_kept = rows.len();

        if report.rows_dropped() > 0 {
            warn!(
                "{}: dropped {} of {} rows ({} bad timestamps, {} negative irradiance, {} out of range, {} duplicates, {} missing)",
                raw.country,
                report.rows_dropped(),
                report.rows_read,
                report.dropped_unparsable_timestamp,
                report.dropped_negative_irradiance,
                report.dropped_out_of_range,
                report.dropped_duplicate_timestamp,
                report.dropped_missing_values
            );
        }

        info!(
            "{}: kept {} rows, clipped {} values, imputed {} values, flagged {} outliers",
            raw.country,
            report.rows_kept,
            report.values_clipped(),
            report.values_imputed(),
            report.outliers_flagged()
        );

        let dataset = CountryDataset::new(raw.country.clone(), raw.columns.clone(), rows);
        Ok((dataset, report))
    }

    fn clean_record(
        &self,
        raw: &RawDataset,
        record: &RawRecord,
        report: &mut CleaningReport,
    ) -> Option<MeasurementRow> {
        let Some(timestamp) = parse_timestamp(&record.timestamp) else {
            report.dropped_unparsable_timestamp += 1;
            debug!(
                "{}: line {} has unparsable timestamp '{}'",
                raw.country, record.line, record.timestamp
            );
            return None;
        };

        let mut row = MeasurementRow::new(timestamp)
            .with_cleaning(parse_cleaning_flag(record.cleaning.as_deref()));

        for (column, cell) in raw.columns.iter().zip(&record.values) {
            match parse_cell(cell.as_deref()) {
                Cell::Value(v) => row.set(*column, Some(v)),
                Cell::Missing => {}
                Cell::Unparsable => {
                    report.column_mut(*column).unparsable += 1;
                    debug!(
                        "{}: line {} has non-numeric {} value {:?}",
                        raw.country, record.line, column, cell
                    );
                }
            }
        }

        if row.has_negative_irradiance() {
            match self.config.negative_irradiance {
                NegativeIrradiancePolicy::Clip => {
                    for column in Column::IRRADIANCE {
                        if row.get(column).is_some_and(|v| v < 0.0) {
                            row.set(column, Some(0.0));
                            report.column_mut(column).clipped += 1;
                        }
                    }
                }
                NegativeIrradiancePolicy::Drop => {
                    report.dropped_negative_irradiance += 1;
                    debug!("{}: line {} dropped for negative irradiance", raw.country, record.line);
                    return None;
                }
            }
        }

        if let Err(e) = row.validate() {
            report.dropped_out_of_range += 1;
            debug!(
                "{}: line {} outside physical range: {}",
                raw.country, record.line, e
            );
            return None;
        }

        Some(row)
    }

    /// Keep the first row for each timestamp, in file order
    fn drop_duplicate_timestamps(&self, rows: &mut Vec<MeasurementRow>, report: &mut CleaningReport) {
        rows.sort_by_key(|r| r.timestamp);
        let before = rows.len();
        rows.dedup_by_key(|r| r.timestamp);
        report.dropped_duplicate_timestamp = before - rows.len();
    }

    fn handle_missing(
        &self,
        columns: &[Column],
        rows: &mut Vec<MeasurementRow>,
        report: &mut CleaningReport,
    ) {
        for column in columns {
            report.column_mut(*column).missing =
                rows.iter().filter(|r| r.get(*column).is_none()).count();
        }

        match self.config.missing {
            MissingValuePolicy::Drop => {
                // Columns without any observation never cause a drop
                let (observed, empty): (Vec<Column>, Vec<Column>) = columns
                    .iter()
                    .copied()
                    .partition(|c| rows.iter().any(|r| r.get(*c).is_some()));
                report.unimputable_columns.extend(empty);

                let before = rows.len();
                rows.retain(|r| !r.has_missing(&observed));
                report.dropped_missing_values = before - rows.len();
            }
            MissingValuePolicy::Mean | MissingValuePolicy::Median => {
                for column in columns {
                    let observed: Vec<f64> = rows.iter().filter_map(|r| r.get(*column)).collect();
                    let missing = report.column_mut(*column).missing;
                    if missing == 0 {
                        continue;
                    }

                    let fill = match self.config.missing {
                        MissingValuePolicy::Median => median(&observed),
                        _ => mean(&observed),
                    };

                    let Some(fill) = fill else {
                        report.unimputable_columns.push(*column);
                        continue;
                    };

                    for row in rows.iter_mut().filter(|r| r.get(*column).is_none()) {
                        row.set(*column, Some(fill));
                    }

                    let stats = report.column_mut(*column);
                    stats.imputed = missing;
                    stats.fill_value = Some(fill);
                }
            }
        }
    }

    fn flag_outliers(&self, columns: &[Column], rows: &[MeasurementRow], report: &mut CleaningReport) {
        let threshold = self.config.outlier_z_threshold;

        for column in columns {
            let values: Vec<f64> = rows.iter().filter_map(|r| r.get(*column)).collect();
            let (Some(mean), Some(std_dev)) = (mean(&values), sample_std_dev(&values)) else {
                continue;
            };
            if std_dev == 0.0 {
                continue;
            }

            report.column_mut(*column).outliers = values
                .iter()
                .filter(|v| ((*v - mean) / std_dev).abs() > threshold)
                .count();
        }
    }
}

impl Default for Cleaner {
    fn default() -> Self {
        Self::new(CleaningConfig::default())
    }
}
