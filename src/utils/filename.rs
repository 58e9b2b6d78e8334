use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Derive a country name from a data file name.
///
/// Takes the first `-`/`_` separated segment of the stem and title-cases it,
/// e.g. `benin-malanville.csv` -> `Benin`.
pub fn country_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let first = stem
        .split(['-', '_', ' '])
        .find(|s| !s.is_empty())?;
    Some(title_case(first))
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// File name for a cleaned country export: `{country}_clean.csv`
pub fn cleaned_filename(country: &str) -> String {
    let slug: String = country
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{}_clean.csv", slug)
}

/// Generate default report filename with format: solar-report-{YYMMDD}.{ext}
pub fn generate_default_report_filename(extension: &str) -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!(
        "solar-report-{:02}{:02}{:02}.{}",
        year, month, day, extension
    );
    PathBuf::from("output").join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_country_from_path() {
        assert_eq!(
            country_from_path(Path::new("data/benin-malanville.csv")).as_deref(),
            Some("Benin")
        );
        assert_eq!(
            country_from_path(Path::new("SIERRALEONE_bumbuna.csv")).as_deref(),
            Some("Sierraleone")
        );
        assert_eq!(
            country_from_path(Path::new("togo.csv")).as_deref(),
            Some("Togo")
        );
        assert_eq!(country_from_path(Path::new("")), None);
    }

    #[test]
    fn test_cleaned_filename() {
        assert_eq!(cleaned_filename("Benin"), "benin_clean.csv");
        assert_eq!(cleaned_filename("Sierra Leone"), "sierra_leone_clean.csv");
    }

    #[test]
    fn test_generate_default_report_filename() {
        let filename = generate_default_report_filename("json");
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output"));
        assert!(filename_str.contains("solar-report-"));
        assert!(filename_str.ends_with(".json"));
    }
}
