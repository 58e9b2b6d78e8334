use crate::error::{ProcessingError, Result};
use crate::models::RawDataset;
use crate::readers::{ArchiveReader, MeasurementReader};
use crate::utils::filename::country_from_path;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// One `--input` argument: `[COUNTRY=]PATH`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub country: Option<String>,
    pub path: PathBuf,
}

impl InputSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            country: None,
            path: path.into(),
        }
    }

    pub fn with_country(country: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            country: Some(country.into()),
            path: path.into(),
        }
    }

    pub fn is_archive(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
    }

    fn resolved_country(&self) -> Result<String> {
        match &self.country {
            Some(country) => Ok(country.clone()),
            None => country_from_path(&self.path).ok_or_else(|| {
                ProcessingError::InvalidFormat(format!(
                    "Cannot derive a country name from '{}'; use COUNTRY=PATH",
                    self.path.display()
                ))
            }),
        }
    }
}

impl FromStr for InputSource {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ProcessingError::InvalidFormat("Empty input path".to_string()));
        }

        match trimmed.split_once('=') {
            Some((country, path)) if !country.contains(['/', '\\']) => {
                let country = country.trim();
                let path = path.trim();
                if country.is_empty() || path.is_empty() {
                    return Err(ProcessingError::InvalidFormat(format!(
                        "Expected COUNTRY=PATH, got '{}'",
                        s
                    )));
                }
                Ok(Self::with_country(country, path))
            }
            _ => Ok(Self::new(trimmed)),
        }
    }
}

/// Resolves input sources to raw country datasets.
pub struct DatasetLoader {
    use_mmap: bool,
    delimiter: u8,
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self {
            use_mmap: false,
            delimiter: b',',
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn reader(&self) -> MeasurementReader {
        MeasurementReader::new()
            .with_mmap(self.use_mmap)
            .with_delimiter(self.delimiter)
    }

    /// Load one source; archives yield one dataset per CSV entry
    pub fn load(&self, source: &InputSource) -> Result<Vec<RawDataset>> {
        if source.is_archive() {
            let mut datasets = ArchiveReader::new(self.reader()).read_archive(&source.path)?;
            // An explicit country only makes sense for a single-file archive
            if let (Some(country), [dataset]) = (&source.country, datasets.as_mut_slice()) {
                dataset.country = country.clone();
            }
            return Ok(datasets);
        }

        let country = source.resolved_country()?;
        Ok(vec![self.reader().read_file(&source.path, &country)?])
    }

    /// Every `.csv` and `.zip` file directly inside `dir`, sorted by file name
    pub fn discover(dir: &Path) -> Result<Vec<InputSource>> {
        if !dir.is_dir() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Path is not a directory: {}",
                dir.display()
            )));
        }

        let mut sources = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let wanted = path.is_file()
                && path.extension().is_some_and(|ext| {
                    ext.eq_ignore_ascii_case("csv") || ext.eq_ignore_ascii_case("zip")
                });

            if wanted {
                sources.push(InputSource::new(path));
            } else {
                debug!("Skipping {}", path.display());
            }
        }

        sources.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

        if sources.is_empty() {
            return Err(ProcessingError::InvalidFormat(format!(
                "No .csv or .zip files found in directory: {}",
                dir.display()
            )));
        }

        Ok(sources)
    }
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}
