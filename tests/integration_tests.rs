use pretty_assertions::assert_eq;
use solar_analytics::analyzers::{Aggregator, Comparator, SolarScorer};
use solar_analytics::cli::commands::{build_report, load_and_clean};
use solar_analytics::cli::InputArgs;
use solar_analytics::config::{AppConfig, HourRange};
use solar_analytics::models::{Column, TestKind, TimeBucket};
use solar_analytics::processors::Cleaner;
use solar_analytics::readers::{DatasetLoader, InputSource};
use solar_analytics::writers::{CsvWriter, ReportFormat, ReportWriter};
use solar_analytics::{ProcessingError, Result};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const HEADER: &str = "Timestamp,GHI,DNI,DHI,ModA,ModB,Tamb,RH,WS,WSgust,WD,BP,Cleaning,Precipitation,TModA,TModB,Comments";

/// One day of hourly rows with a GHI peak of `peak` at noon
fn write_country_file(dir: &Path, name: &str, peak: f64) -> Result<PathBuf> {
    let mut body = String::new();
    writeln!(body, "{}", HEADER).unwrap();
    for day in 1..=3 {
        for hour in 0..24 {
            let sun = (1.0 - ((hour as f64 - 12.0) / 6.0).powi(2)).max(0.0);
            let ghi = if sun > 0.0 { peak * sun + day as f64 } else { -1.5 };
            let cleaning = if hour == 8 { 1 } else { 0 };
            writeln!(
                body,
                "2021-08-{:02} {:02}:00,{:.1},{:.1},{:.1},{:.1},{:.1},{:.1},{:.1},1.2,2.0,180,998,{},0.0,{:.1},{:.1},",
                day,
                hour,
                ghi,
                ghi * 0.7,
                ghi * 0.3,
                ghi * 0.95,
                ghi * 0.9,
                24.0 + sun * 8.0,
                90.0 - sun * 40.0,
                cleaning,
                25.0 + sun * 20.0,
                25.0 + sun * 19.0
            )
            .unwrap();
        }
    }

    let path = dir.join(name);
    fs::write(&path, body)?;
    Ok(path)
}

fn input_for(paths: &[PathBuf]) -> InputArgs {
    InputArgs {
        inputs: paths.iter().map(InputSource::new).collect(),
        ..InputArgs::default()
    }
}

#[test]
fn test_load_clean_and_compare_two_countries() -> Result<()> {
    let dir = TempDir::new()?;
    let benin = write_country_file(dir.path(), "benin-malanville.csv", 900.0)?;
    let togo = write_country_file(dir.path(), "togo-dapaong_qc.csv", 800.0)?;

    let (datasets, reports) = load_and_clean(&input_for(&[benin, togo]), &AppConfig::default(), true)?;

    assert_eq!(datasets.len(), 2);
    assert_eq!(datasets[0].country(), "Benin");
    assert_eq!(datasets[0].len(), 72);
    // Night-time GHI/DNI/DHI/ModA/ModB offsets are clipped, not dropped
    assert_eq!(reports[0].rows_dropped(), 0);
    assert!(reports[0].values_clipped() > 0);
    for dataset in &datasets {
        for row in dataset.rows() {
            assert!(!row.has_negative_irradiance());
        }
    }

    let comparison = Comparator::default().compare(&datasets, Column::Ghi)?;
    let order: Vec<&str> = comparison.ranking.iter().map(|r| r.country.as_str()).collect();
    assert_eq!(order, vec!["Benin", "Togo"]);
    assert_eq!(comparison.test.as_ref().map(|t| t.kind), Some(TestKind::Welch));
    Ok(())
}

#[test]
fn test_unparsable_timestamps_counted() -> Result<()> {
    let dir = TempDir::new()?;
    let mut body = String::from("Timestamp,GHI,Tamb\n");
    for i in 0..100 {
        if i % 20 == 7 {
            writeln!(body, "not-a-date,{},25.0", i).unwrap();
        } else {
            writeln!(body, "2022-03-01T{:02}:{:02}:00,{},25.0", i / 60, i % 60, i).unwrap();
        }
    }
    let path = dir.path().join("sierraleone-bumbuna.csv");
    fs::write(&path, body)?;

    let raw = DatasetLoader::new().load(&InputSource::with_country("Sierra Leone", &path))?;
    let (dataset, report) = Cleaner::default().clean(&raw[0])?;

    assert_eq!(dataset.country(), "Sierra Leone");
    assert_eq!(dataset.len(), 95);
    assert_eq!(report.dropped_unparsable_timestamp, 5);
    Ok(())
}

#[test]
fn test_daytime_filter_and_hourly_profile() -> Result<()> {
    let dir = TempDir::new()?;
    let benin = write_country_file(dir.path(), "benin.csv", 900.0)?;

    let mut config = AppConfig::default();
    config.analysis.hours = Some(HourRange { start: 6, end: 18 });
    let (datasets, _) = load_and_clean(&input_for(&[benin]), &config, true)?;

    assert_eq!(datasets[0].len(), 39);

    let profile = Aggregator::new(TimeBucket::Hour).summarize(&datasets[0], &[Column::Ghi]);
    let night: Vec<bool> = profile
        .buckets
        .iter()
        .filter(|b| matches!(b.key, solar_analytics::models::BucketKey::Hour(h) if h < 6))
        .map(|b| b.get(Column::Ghi).map_or(false, |a| a.is_no_data()))
        .collect();
    assert_eq!(night, vec![true; 6]);
    Ok(())
}

#[test]
fn test_single_country_comparison_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let benin = write_country_file(dir.path(), "benin.csv", 900.0)?;

    let (datasets, _) = load_and_clean(&input_for(&[benin]), &AppConfig::default(), true)?;
    let result = Comparator::default().compare(&datasets, Column::Ghi);

    assert!(matches!(result, Err(ProcessingError::InsufficientInput(_))));
    Ok(())
}

#[test]
fn test_full_report_as_json() -> Result<()> {
    let dir = TempDir::new()?;
    let data = dir.path().join("data");
    fs::create_dir_all(&data)?;
    write_country_file(&data, "benin-malanville.csv", 900.0)?;
    write_country_file(&data, "sierraleone-bumbuna.csv", 700.0)?;
    write_country_file(&data, "togo-dapaong.csv", 800.0)?;

    let input = InputArgs {
        input_dir: Some(data),
        ..InputArgs::default()
    };
    let config = AppConfig::default();
    let (datasets, reports) = load_and_clean(&input, &config, true)?;
    let report = build_report(&config, datasets, reports, &[]);

    assert_eq!(report.cleaning.len(), 3);
    assert_eq!(report.comparisons.len(), 3);
    assert!(report.notes.is_empty());
    assert_eq!(report.solar_scores[0].country, "Benin");
    assert_eq!(report.hourly_profiles.len(), 3);
    assert_eq!(report.cleaning_impact.len(), 3);
    assert_eq!(report.distributions.len(), 3);
    assert_eq!(report.overviews[0].peak_hour.map(|(hour, _)| hour), Some(12));

    let output = dir.path().join("out").join("report.json");
    ReportWriter::new(ReportFormat::Json).write(&report, Some(&output))?;

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output)?)?;
    assert_eq!(value["comparisons"][0]["column"], "ghi");
    assert_eq!(value["comparisons"][0]["test"]["kind"], "anova");
    assert_eq!(value["comparisons"][0]["ranking"][2]["country"], "Sierraleone");
    Ok(())
}

#[test]
fn test_text_report_and_csv_export() -> Result<()> {
    let dir = TempDir::new()?;
    let benin = write_country_file(dir.path(), "benin.csv", 900.0)?;
    let togo = write_country_file(dir.path(), "togo.csv", 800.0)?;

    let config = AppConfig::default();
    let (datasets, reports) = load_and_clean(&input_for(&[benin, togo]), &config, true)?;

    let paths = CsvWriter::new().write_all(&datasets, &dir.path().join("clean"))?;
    let exported = fs::read_to_string(&paths[0])?;
    assert_eq!(
        exported.lines().next(),
        Some("Timestamp,GHI,DNI,DHI,ModA,ModB,Tamb,RH,WS,WSgust,WD,BP,Precipitation,TModA,TModB,Cleaning")
    );
    assert_eq!(exported.lines().count(), 73);

    let scores = SolarScorer::rank(&datasets);
    assert_eq!(scores.len(), 2);

    let report = build_report(&config, datasets, reports, &[Column::Ghi]);
    let text = ReportWriter::new(ReportFormat::Text).render(&report)?;

    assert!(text.contains("=== Cleaning Report: Benin ==="));
    assert!(text.contains("=== Ranking by mean GHI (W/m²) ==="));
    assert!(text.contains("Welch t-test across Benin, Togo"));
    assert!(text.contains("=== Solar potential score ==="));
    assert!(text.contains("=== Hourly profile: mean GHI (W/m²) ==="));
    assert!(text.contains("=== Data overview ==="));
    assert!(text.contains("2021-08-01 to 2021-08-03"));
    assert!(text.contains("=== Togo distribution: GHI (W/m²) ==="));
    assert!(text.contains("=== GHI vs weather (Pearson r) ==="));
    Ok(())
}

#[test]
fn test_missing_file_is_fatal() {
    let input = input_for(&[PathBuf::from("/nonexistent/benin.csv")]);
    let result = load_and_clean(&input, &AppConfig::default(), true);
    assert!(matches!(result, Err(ProcessingError::Io(_))));
}
