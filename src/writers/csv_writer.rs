use crate::error::Result;
use crate::models::CountryDataset;
use crate::utils::constants::{CLEANING_HEADER, OUTPUT_TIMESTAMP_FORMAT, TIMESTAMP_HEADERS};
use crate::utils::filename::cleaned_filename;
use csv::WriterBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Exports cleaned datasets as CSV, one file per country.
pub struct CsvWriter {
    delimiter: u8,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write one dataset; missing values become empty cells. Returns rows written.
    pub fn write_dataset(&self, dataset: &CountryDataset, path: &Path) -> Result<usize> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        let mut header = vec![TIMESTAMP_HEADERS[0]];
        header.extend(dataset.columns().iter().map(|c| c.header()));
        header.push(CLEANING_HEADER);
        writer.write_record(&header)?;

        for row in dataset.rows() {
            let mut record = Vec::with_capacity(header.len());
            record.push(row.timestamp.format(OUTPUT_TIMESTAMP_FORMAT).to_string());
            record.extend(
                dataset
                    .columns()
                    .iter()
                    .map(|c| row.get(*c).map(|v| v.to_string()).unwrap_or_default()),
            );
            record.push(if row.cleaning { "1" } else { "0" }.to_string());
            writer.write_record(&record)?;
        }

        writer.flush()?;
        info!(
            "Wrote {} cleaned rows for {} to {}",
            dataset.len(),
            dataset.country(),
            path.display()
        );
        Ok(dataset.len())
    }

    /// Write every dataset into `dir` as `<country>_clean.csv`
    pub fn write_all(&self, datasets: &[CountryDataset], dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        datasets
            .iter()
            .map(|dataset| {
                let path = dir.join(cleaned_filename(dataset.country()));
                self.write_dataset(dataset, &path)?;
                Ok(path)
            })
            .collect()
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
