use crate::error::{ProcessingError, Result};
use crate::models::RawDataset;
use crate::readers::MeasurementReader;
use crate::utils::filename::country_from_path;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};
use zip::ZipArchive;

/// Reads every `.csv` entry of a zip archive as one country dataset.
pub struct ArchiveReader {
    reader: MeasurementReader,
}

impl ArchiveReader {
    pub fn new(reader: MeasurementReader) -> Self {
        Self { reader }
    }

    pub fn read_archive(&self, zip_path: &Path) -> Result<Vec<RawDataset>> {
        let file = File::open(zip_path)?;
        let mut archive = ZipArchive::new(file)?;
        let mut datasets = Vec::new();

        for i in 0..archive.len() {
            let mut zip_file = archive.by_index(i)?;
            if zip_file.is_dir() {
                continue;
            }

            let entry_name = zip_file.name().to_string();
            let entry_path = Path::new(&entry_name);
            let is_csv = entry_path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

            // macOS archive metadata
            if !is_csv || entry_name.starts_with("__MACOSX") {
                continue;
            }

            let Some(country) = country_from_path(entry_path) else {
                warn!("Cannot derive a country name from archive entry '{}'", entry_name);
                continue;
            };

            let mut bytes = Vec::with_capacity(zip_file.size() as usize);
            zip_file.read_to_end(&mut bytes)?;

            let origin = zip_path.join(&entry_name);
            datasets.push(self.reader.parse_bytes(&bytes, &country, &origin)?);
        }

        if datasets.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "No CSV files found in archive: {}",
                zip_path.display()
            )));
        }

        info!(
            "Read {} country files from archive {}",
            datasets.len(),
            zip_path.display()
        );
        Ok(datasets)
    }
}

impl Default for ArchiveReader {
    fn default() -> Self {
        Self::new(MeasurementReader::new())
    }
}
