use crate::error::{ProcessingError, Result};
use crate::models::{Column, RawDataset, RawRecord};
use crate::utils::constants::{CLEANING_HEADER, DEFAULT_BUFFER_SIZE, TIMESTAMP_HEADERS};
use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::{UTF_8, WINDOWS_1252};
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reads per-country measurement CSV files into raw, unparsed tables.
pub struct MeasurementReader {
    use_mmap: bool,
    delimiter: u8,
}

/// Header positions resolved once per file
struct HeaderLayout {
    timestamp: usize,
    cleaning: Option<usize>,
    columns: Vec<(Column, usize)>,
}

impl MeasurementReader {
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

    /// Read a measurement file for `country`
    pub fn read_file(&self, path: &Path, country: &str) -> Result<RawDataset> {
        let bytes = if self.use_mmap {
            self.read_bytes_mmap(path)?
        } else {
            self.read_bytes_buffered(path)?
        };

        self.parse_bytes(&bytes, country, path)
    }

    /// Parse an in-memory file body, e.g. a zip entry. `origin` is only used in messages.
    pub fn parse_bytes(&self, bytes: &[u8], country: &str, origin: &Path) -> Result<RawDataset> {
        let text = decode_text(bytes, origin);
        self.parse_text(&text, country, origin)
    }

    fn read_bytes_buffered(&self, path: &Path) -> Result<Vec<u8>> {
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Read via a memory map for large files
    fn read_bytes_mmap(&self, path: &Path) -> Result<Vec<u8>> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Vec::new());
        }
        // The map is copied out immediately and never outlives this call.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(mmap.to_vec())
    }

    fn parse_text(&self, text: &str, country: &str, origin: &Path) -> Result<RawDataset> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(ProcessingError::EmptyInput {
                path: origin.to_path_buf(),
            });
        }

        let layout = resolve_headers(&headers, origin)?;
        let columns: Vec<Column> = layout.columns.iter().map(|(c, _)| *c).collect();

        let mut rows = Vec::new();
        let mut malformed_rows = 0;

        // Line numbers come from the csv reader, which skips blank lines
        for result in reader.records() {
            match result {
                Ok(record) => {
                    if record.iter().all(|f| f.is_empty()) {
                        continue;
                    }
                    let line = record.position().map_or(0, |p| p.line());
                    rows.push(to_raw_record(&record, &layout, line));
                }
                Err(e) => {
                    malformed_rows += 1;
                    let line = e.position().map_or(0, |p| p.line());
                    debug!("Skipping unreadable row {} in {}: {}", line, origin.display(), e);
                }
            }
        }

        if rows.is_empty() {
            return Err(ProcessingError::EmptyInput {
                path: origin.to_path_buf(),
            });
        }

        if malformed_rows > 0 {
            warn!(
                "{}: skipped {} unreadable rows in {}",
                country,
                malformed_rows,
                origin.display()
            );
        }

        info!(
            "Loaded {} rows with {} measurement columns for {} from {}",
            rows.len(),
            columns.len(),
            country,
            origin.display()
        );

        Ok(RawDataset {
            country: country.to_string(),
            source: origin.display().to_string(),
            columns,
            rows,
            malformed_rows,
        })
    }
}

impl Default for MeasurementReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode file bytes as UTF-8 (BOM aware), falling back to Windows-1252
fn decode_text<'a>(bytes: &'a [u8], origin: &Path) -> Cow<'a, str> {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text;
    }

    warn!(
        "{} is not valid UTF-8, decoding as Windows-1252",
        origin.display()
    );
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text
}

fn resolve_headers(headers: &StringRecord, origin: &Path) -> Result<HeaderLayout> {
    let timestamp = TIMESTAMP_HEADERS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == *name))
        .ok_or_else(|| ProcessingError::MissingColumn {
            path: PathBuf::from(origin),
            column: TIMESTAMP_HEADERS[0].to_string(),
        })?;

    let cleaning = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(CLEANING_HEADER));

    let mut columns: Vec<(Column, usize)> = Vec::new();
    for (index, header) in headers.iter().enumerate() {
        match Column::from_header(header) {
            Some(column) if !columns.iter().any(|(c, _)| *c == column) => {
                columns.push((column, index))
            }
            Some(column) => debug!("Ignoring duplicate {} column at position {}", column, index),
            None if index != timestamp && Some(index) != cleaning => {
                debug!("Ignoring unrecognised column '{}'", header)
            }
            None => {}
        }
    }

    Ok(HeaderLayout {
        timestamp,
        cleaning,
        columns,
    })
}

fn to_raw_record(record: &StringRecord, layout: &HeaderLayout, line: u64) -> RawRecord {
    RawRecord {
        line,
        timestamp: record.get(layout.timestamp).unwrap_or_default().to_string(),
        values: layout
            .columns
            .iter()
            .map(|(_, index)| record.get(*index).map(str::to_string))
            .collect(),
        cleaning: layout
            .cleaning
            .and_then(|index| record.get(index))
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "Timestamp,GHI,DNI,DHI,ModA,ModB,Tamb,RH,WS,WSgust,WSstdev,WD,WDstdev,BP,Cleaning,Precipitation,TModA,TModB,Comments";

    #[test]
    fn test_read_measurement_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "{}", HEADER)?;
        writeln!(
            temp_file,
            "2021-08-09 00:01,-1.2,0.0,0.0,0.0,0.0,26.2,93.4,0.0,0.4,0.1,122.1,0.0,998,0,0.0,26.3,26.2,"
        )?;
        writeln!(
            temp_file,
            "2021-08-09 00:02,-1.1,0.0,0.0,0.0,0.0,26.2,93.6,0.0,0.0,0.0,0.0,0.0,998,0,0.0,26.3,26.2,"
        )?;
        writeln!(temp_file)?;

        let reader = MeasurementReader::new();
        let dataset = reader.read_file(temp_file.path(), "Benin")?;

        assert_eq!(dataset.country, "Benin");
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.malformed_rows, 0);
        // WSstdev, WDstdev and Comments are not tracked
        assert_eq!(dataset.columns.len(), 14);
        assert_eq!(dataset.columns[0], Column::Ghi);

        let first = &dataset.rows[0];
        assert_eq!(first.line, 2);
        assert_eq!(first.timestamp, "2021-08-09 00:01");
        assert_eq!(first.values[0].as_deref(), Some("-1.2"));
        assert_eq!(first.cleaning.as_deref(), Some("0"));
        Ok(())
    }

    #[test]
    fn test_line_numbers_survive_blank_lines() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "Timestamp,GHI")?;
        writeln!(temp_file, "2021-08-09 12:00,800.5")?;
        writeln!(temp_file)?;
        writeln!(temp_file)?;
        writeln!(temp_file, "2021-08-09 12:01,801.0")?;

        let dataset = MeasurementReader::new().read_file(temp_file.path(), "Togo")?;
        let lines: Vec<u64> = dataset.rows.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 5]);
        Ok(())
    }

    #[test]
    fn test_semicolon_delimiter() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "Timestamp;GHI;Tamb")?;
        writeln!(temp_file, "2021-08-09 12:00;800.5;31.2")?;

        let dataset = MeasurementReader::new()
            .with_delimiter(b';')
            .read_file(temp_file.path(), "Togo")?;
        assert_eq!(dataset.columns, vec![Column::Ghi, Column::Tamb]);
        assert_eq!(dataset.rows[0].values[1].as_deref(), Some("31.2"));
        Ok(())
    }

    #[test]
    fn test_short_rows_yield_missing_cells() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "Timestamp,GHI,DNI,DHI")?;
        writeln!(temp_file, "2021-08-09 12:00,800.5")?;

        let dataset = MeasurementReader::new().read_file(temp_file.path(), "Togo")?;
        let row = &dataset.rows[0];
        assert_eq!(row.values, vec![Some("800.5".to_string()), None, None]);
        assert_eq!(row.cleaning, None);
        Ok(())
    }

    #[test]
    fn test_mmap_matches_buffered() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "Date,GHI,Tamb")?;
        writeln!(temp_file, "2021-08-09 12:00,800.5,31.2")?;

        let buffered = MeasurementReader::new().read_file(temp_file.path(), "Togo")?;
        let mapped = MeasurementReader::new()
            .with_mmap(true)
            .read_file(temp_file.path(), "Togo")?;

        assert_eq!(buffered.rows, mapped.rows);
        assert_eq!(buffered.columns, vec![Column::Ghi, Column::Tamb]);
        Ok(())
    }

    #[test]
    fn test_latin1_fallback() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        // Windows-1252 encoded comment (0xE9 = é)
        temp_file.write_all(b"Timestamp,GHI,Comments\n2021-08-09 12:00,800.5,nettoy\xe9\n")?;

        let dataset = MeasurementReader::new().read_file(temp_file.path(), "Benin")?;
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.rows[0].values[0].as_deref(), Some("800.5"));
        Ok(())
    }

    #[test]
    fn test_missing_timestamp_column_is_fatal() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "GHI,DNI")?;
        writeln!(temp_file, "1.0,2.0")?;

        let result = MeasurementReader::new().read_file(temp_file.path(), "Benin");
        assert!(matches!(result, Err(ProcessingError::MissingColumn { .. })));
        Ok(())
    }

    #[test]
    fn test_empty_and_missing_files_are_fatal() -> Result<()> {
        let empty = NamedTempFile::new()?;
        let result = MeasurementReader::new().read_file(empty.path(), "Benin");
        assert!(matches!(result, Err(ProcessingError::EmptyInput { .. })));

        let mut header_only = NamedTempFile::new()?;
        writeln!(header_only, "Timestamp,GHI")?;
        let result = MeasurementReader::new().read_file(header_only.path(), "Benin");
        assert!(matches!(result, Err(ProcessingError::EmptyInput { .. })));

        let result = MeasurementReader::new().read_file(Path::new("/nonexistent/benin.csv"), "Benin");
        assert!(matches!(result, Err(ProcessingError::Io(_))));
        Ok(())
    }
}
