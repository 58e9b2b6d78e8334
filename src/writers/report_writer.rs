use crate::analyzers::{CorrelationMatrix, DatasetOverview, Distribution, SolarScore};
use crate::config::HourRange;
use crate::error::Result;
use crate::models::{
    Aggregate, BucketKey, Column, ComparisonResult, CountrySummary, SignificanceTest,
};
use crate::processors::CleaningReport;
use crate::utils::constants::CHART_WIDTH;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}

/// Everything one pipeline run produced, in presentation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: String,
    pub hours: Option<HourRange>,
    pub cleaning: Vec<CleaningReport>,
    pub overviews: Vec<DatasetOverview>,
    pub summaries: Vec<CountrySummary>,
    pub hourly_profiles: Vec<CountrySummary>,
    pub cleaning_impact: Vec<CountrySummary>,
    pub comparisons: Vec<ComparisonResult>,
    pub solar_scores: Vec<SolarScore>,
    pub correlations: Vec<CorrelationMatrix>,
    pub distributions: Vec<Distribution>,
    /// Steps that could not be computed, e.g. a comparison with too few countries
    pub notes: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ..Self::default()
        }
    }
}

/// Renders pipeline results as terminal text or JSON.
pub struct ReportWriter {
    format: ReportFormat,
    chart_width: usize,
}

impl ReportWriter {
    pub fn new(format: ReportFormat) -> Self {
        Self {
            format,
            chart_width: CHART_WIDTH,
        }
    }

    pub fn with_chart_width(mut self, width: usize) -> Self {
        self.chart_width = width.max(1);
        self
    }

    pub fn render(&self, report: &Report) -> Result<String> {
        match self.format {
            ReportFormat::Text => Ok(self.render_text(report)),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        }
    }

    /// Write to `output`, or stdout when no path is given
    pub fn write(&self, report: &Report, output: Option<&Path>) -> Result<()> {
        let rendered = self.render(report)?;

        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                fs::write(path, rendered)?;
                info!("Report written to {}", path.display());
            }
            None => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(rendered.as_bytes())?;
                if !rendered.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
            }
        }
        Ok(())
    }

    pub fn render_text(&self, report: &Report) -> String {
        let mut out = String::new();

        out.push_str("Solar Irradiance Report\n");
        out.push_str("=======================\n");
        out.push_str(&format!("Generated: {}\n", report.generated_at));
        if let Some(hours) = report.hours {
            out.push_str(&format!("Hours: {}\n", hours));
        }

        for cleaning in &report.cleaning {
            out.push('\n');
            out.push_str(&cleaning.summary());
        }

        if !report.overviews.is_empty() {
            out.push('\n');
            out.push_str(&render_overviews(&report.overviews));
        }

        for summary in &report.summaries {
            out.push('\n');
            out.push_str(&self.render_summary(summary));
        }

        for comparison in &report.comparisons {
            out.push('\n');
            out.push_str(&self.render_comparison(comparison));
        }

        if !report.hourly_profiles.is_empty() {
            out.push('\n');
            out.push_str(&render_hourly_profile(&report.hourly_profiles, Column::Ghi));
        }

        if !report.distributions.is_empty() {
            out.push('\n');
            out.push_str(&render_quartiles(&report.distributions));
            for distribution in &report.distributions {
                out.push('\n');
                out.push_str(&self.render_histogram(distribution));
            }
        }

        if !report.cleaning_impact.is_empty() {
            out.push('\n');
            out.push_str(&render_cleaning_impact(&report.cleaning_impact));
        }

        if !report.solar_scores.is_empty() {
            out.push('\n');
            out.push_str(&render_scores(&report.solar_scores));
        }

        for matrix in &report.correlations {
            out.push('\n');
            out.push_str(&render_correlations(matrix));
        }

        if report.overviews.iter().any(|o| !o.weather_impact.is_empty()) {
            out.push('\n');
            out.push_str(&render_weather_impact(&report.overviews));
        }

        if !report.notes.is_empty() {
            out.push_str("\nNotes:\n");
            for note in &report.notes {
                out.push_str(&format!("  - {}\n", note));
            }
        }

        out
    }

    /// Per-bucket statistics table for one country
    pub fn render_summary(&self, summary: &CountrySummary) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "=== {} summary ({} rows) ===\n",
            summary.country, summary.total_rows
        ));
        out.push_str(&format!(
            "{:<12} {:<20} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "Bucket", "Column", "Count", "Mean", "Median", "Std", "Min", "Max"
        ));

        for bucket in &summary.buckets {
            for aggregate in &bucket.aggregates {
                let label = column_label(aggregate.column());
                match aggregate {
                    Aggregate::Stats(s) => out.push_str(&format!(
                        "{:<12} {:<20} {:>8} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}\n",
                        bucket.key.to_string(),
                        label,
                        s.count,
                        s.mean,
                        s.median,
                        s.std_dev,
                        s.min,
                        s.max
                    )),
                    Aggregate::NoData { .. } => out.push_str(&format!(
                        "{:<12} {:<20} {:>8} {:>10}\n",
                        bucket.key.to_string(),
                        label,
                        0,
                        "no data"
                    )),
                }
            }
        }

        out
    }

    /// Ranking table, bar chart and test outcome
    pub fn render_comparison(&self, comparison: &ComparisonResult) -> String {
        let mut out = self.render_ranking(comparison);
        out.push('\n');
        out.push_str(&self.render_bar_chart(comparison));
        if let Some(test) = &comparison.test {
            out.push('\n');
            out.push_str(&render_test(test));
        }
        out
    }

    pub fn render_ranking(&self, comparison: &ComparisonResult) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "=== Ranking by mean {} ===\n",
            column_label(comparison.column)
        ));
        out.push_str(&format!(
            "{:>4}  {:<16} {:>10} {:>10} {:>10} {:>8}\n",
            "Rank", "Country", "Mean", "Median", "Std", "Count"
        ));
        for entry in &comparison.ranking {
            out.push_str(&format!(
                "{:>4}  {:<16} {:>10.2} {:>10.2} {:>10.2} {:>8}\n",
                entry.rank, entry.country, entry.mean, entry.median, entry.std_dev, entry.count
            ));
        }
        out
    }

    /// Horizontal bars scaled to the largest absolute mean
    pub fn render_bar_chart(&self, comparison: &ComparisonResult) -> String {
        let max = comparison
            .ranking
            .iter()
            .map(|r| r.mean.abs())
            .fold(0.0, f64::max);
        let name_width = comparison
            .ranking
            .iter()
            .map(|r| r.country.chars().count())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for entry in &comparison.ranking {
            let length = if max > 0.0 {
                (entry.mean.abs() / max * self.chart_width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "{:<width$} | {} {:.1}\n",
                entry.country,
                "#".repeat(length),
                entry.mean,
                width = name_width
            ));
        }
        out
    }

    /// Horizontal histogram bars scaled to the fullest bin
    pub fn render_histogram(&self, distribution: &Distribution) -> String {
        let mut out = format!(
            "=== {} distribution: {} ===\n",
            distribution.country,
            column_label(distribution.column)
        );
        let fullest = distribution.bins.iter().map(|b| b.count).max().unwrap_or(0);

        for bin in &distribution.bins {
            let length = if fullest > 0 {
                (bin.count as f64 / fullest as f64 * self.chart_width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "{:>8.1} - {:>8.1} | {} {}\n",
                bin.lower,
                bin.upper,
                "#".repeat(length),
                bin.count
            ));
        }
        out
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::new(ReportFormat::default())
    }
}

fn column_label(column: Column) -> String {
    format!("{} ({})", column.header(), column.units())
}

fn render_test(test: &SignificanceTest) -> String {
    let df = match test.degrees_of_freedom {
        (df, Some(df2)) => format!("df = ({:.0}, {:.0})", df, df2),
        (df, None) => format!("df = {:.2}", df),
    };
    let verdict = if test.significant {
        "significant"
    } else {
        "not significant"
    };

    format!(
        "{} across {}: statistic = {:.4}, {}, p = {:.4e} ({} at alpha = {})\n",
        test.kind,
        test.countries.join(", "),
        test.statistic,
        df,
        test.p_value,
        verdict,
        test.significance_level
    )
}

fn bucket_mean(summary: &CountrySummary, key: BucketKey, column: Column) -> Option<f64> {
    summary
        .buckets
        .iter()
        .find(|b| b.key == key)
        .and_then(|b| b.get(column))
        .and_then(|a| a.stats())
        .map(|s| s.mean)
}

/// Mean of `column` per hour of day, one column per country
fn render_hourly_profile(profiles: &[CountrySummary], column: Column) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== Hourly profile: mean {} ===\n",
        column_label(column)
    ));
    out.push_str(&format!("{:<6}", "Hour"));
    for profile in profiles {
        out.push_str(&format!(" {:>14}", profile.country));
    }
    out.push('\n');

    for hour in 0..24 {
        let key = BucketKey::Hour(hour);
        out.push_str(&format!("{:<6}", key.to_string()));
        for profile in profiles {
            match bucket_mean(profile, key, column) {
                Some(mean) => out.push_str(&format!(" {:>14.1}", mean)),
                None => out.push_str(&format!(" {:>14}", "-")),
            }
        }
        out.push('\n');
    }
    out
}

/// Module irradiance with and without a cleaning event
fn render_cleaning_impact(summaries: &[CountrySummary]) -> String {
    let mut out = String::new();
    out.push_str("=== Cleaning impact on module irradiance ===\n");
    out.push_str(&format!(
        "{:<16} {:<8} {:>14} {:>14}\n",
        "Country", "Column", "not cleaned", "cleaned"
    ));

    for summary in summaries {
        for column in [Column::ModA, Column::ModB] {
            let cell = |cleaning| match bucket_mean(summary, BucketKey::Cleaning(cleaning), column) {
                Some(mean) => format!("{:.1}", mean),
                None => "-".to_string(),
            };
            out.push_str(&format!(
                "{:<16} {:<8} {:>14} {:>14}\n",
                summary.country,
                column.header(),
                cell(false),
                cell(true)
            ));
        }
    }
    out
}

fn render_scores(scores: &[SolarScore]) -> String {
    let mut out = String::new();
    out.push_str("=== Solar potential score ===\n");
    out.push_str(&format!(
        "{:<16} {:>7} {:>8} {:>12} {:>12} {:>8}\n",
        "Country", "Total", "Energy", "Consistency", "Reliability", "Weather"
    ));
    for score in scores {
        out.push_str(&format!(
            "{:<16} {:>7.1} {:>8.1} {:>12.1} {:>12.1} {:>8.1}\n",
            score.country,
            score.total,
            score.energy,
            score.consistency,
            score.reliability,
            score.weather
        ));
    }
    out
}

fn render_overviews(overviews: &[DatasetOverview]) -> String {
    let mut out = String::new();
    out.push_str("=== Data overview ===\n");
    out.push_str(&format!(
        "{:<16} {:>8} {:>8} {:<23} {:>10}\n",
        "Country", "Rows", "Missing", "Date range", "Peak hour"
    ));

    for overview in overviews {
        let range = match (overview.first_timestamp, overview.last_timestamp) {
            (Some(first), Some(last)) => {
                format!("{} to {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d"))
            }
            _ => "-".to_string(),
        };
        let peak = match overview.peak_hour {
            Some((hour, mean)) => format!("{:02}:00 ({:.1})", hour, mean),
            None => "-".to_string(),
        };
        out.push_str(&format!(
            "{:<16} {:>8} {:>8} {:<23} {:>10}\n",
            overview.country, overview.rows, overview.missing_values, range, peak
        ));
    }
    out
}

/// Box-plot numbers per country
fn render_quartiles(distributions: &[Distribution]) -> String {
    let mut out = String::new();
    out.push_str("=== Quartiles ===\n");
    out.push_str(&format!(
        "{:<16} {:<8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
        "Country", "Column", "Min", "Q1", "Median", "Q3", "Max", "IQR"
    ));
    for d in distributions {
        out.push_str(&format!(
            "{:<16} {:<8} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>10.1} {:>10.1}\n",
            d.country,
            d.column.header(),
            d.min,
            d.q1,
            d.median,
            d.q3,
            d.max,
            d.iqr()
        ));
    }
    out
}

fn render_weather_impact(overviews: &[DatasetOverview]) -> String {
    let mut out = String::new();
    out.push_str("=== GHI vs weather (Pearson r) ===\n");
    for overview in overviews.iter().filter(|o| !o.weather_impact.is_empty()) {
        let pairs: Vec<String> = overview
            .weather_impact
            .iter()
            .map(|(column, r)| format!("{} {:+.3}", column.header(), r))
            .collect();
        out.push_str(&format!("{:<16} {}\n", overview.country, pairs.join(", ")));
    }
    out
}

fn render_correlations(matrix: &CorrelationMatrix) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} correlations ===\n", matrix.country));
    out.push_str(&format!("{:<14}", ""));
    for column in &matrix.columns {
        out.push_str(&format!(" {:>8}", column.header()));
    }
    out.push('\n');

    for (column, row) in matrix.columns.iter().zip(&matrix.values) {
        out.push_str(&format!("{:<14}", column.header()));
        for value in row {
            match value {
                Some(r) => out.push_str(&format!(" {:>8.2}", r)),
                None => out.push_str(&format!(" {:>8}", "-")),
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BucketSummary, RankedCountry, SummaryStats, TestKind};

    fn ranked(rank: usize, country: &str, mean: f64) -> RankedCountry {
        RankedCountry {
            rank,
            country: country.to_string(),
            mean,
            median: mean,
            std_dev: 10.0,
            count: 100,
        }
    }

    fn comparison() -> ComparisonResult {
        ComparisonResult {
            column: Column::Ghi,
            ranking: vec![ranked(1, "Benin", 450.0), ranked(2, "Togo", 225.0)],
            test: Some(SignificanceTest {
                kind: TestKind::Welch,
                countries: vec!["Benin".to_string(), "Togo".to_string()],
                statistic: 12.5,
                degrees_of_freedom: (180.3, None),
                p_value: 1e-6,
                significance_level: 0.05,
                significant: true,
            }),
        }
    }

    #[test]
    fn test_bar_chart_scales_to_largest_mean() {
        let chart = ReportWriter::default()
            .with_chart_width(20)
            .render_bar_chart(&comparison());
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines[0], format!("Benin | {} 450.0", "#".repeat(20)));
        assert_eq!(lines[1], format!("Togo  | {} 225.0", "#".repeat(10)));
    }

    #[test]
    fn test_text_report_sections() {
        let mut report = Report::new();
        report.comparisons.push(comparison());
        report.summaries.push(CountrySummary {
            country: "Togo".to_string(),
            total_rows: 0,
            buckets: vec![BucketSummary {
                key: BucketKey::Overall,
                aggregates: vec![Aggregate::NoData {
                    country: "Togo".to_string(),
                    column: Column::Ghi,
                }],
            }],
        });
        report.notes.push("Kruskal-Wallis skipped".to_string());

        let text = ReportWriter::default().render_text(&report);

        assert!(text.contains("=== Togo summary (0 rows) ==="));
        assert!(text.contains("no data"));
        assert!(text.contains("=== Ranking by mean GHI (W/m²) ==="));
        assert!(text.contains("Welch t-test across Benin, Togo"));
        assert!(text.contains("significant at alpha = 0.05"));
        assert!(text.contains("Kruskal-Wallis skipped"));
    }

    #[test]
    fn test_json_report_roundtrips() -> Result<()> {
        let mut report = Report::new();
        report.comparisons.push(comparison());
        report.summaries.push(CountrySummary {
            country: "Benin".to_string(),
            total_rows: 1,
            buckets: vec![BucketSummary {
                key: BucketKey::Hour(12),
                aggregates: vec![Aggregate::Stats(SummaryStats {
                    country: "Benin".to_string(),
                    column: Column::Ghi,
                    count: 1,
                    mean: 800.0,
                    median: 800.0,
                    std_dev: 0.0,
                    min: 800.0,
                    max: 800.0,
                })],
            }],
        });

        let json = ReportWriter::new(ReportFormat::Json).render(&report)?;
        let value: serde_json::Value = serde_json::from_str(&json)?;

        assert_eq!(value["comparisons"][0]["ranking"][0]["country"], "Benin");
        assert_eq!(value["comparisons"][0]["test"]["kind"], "welch");
        assert_eq!(value["summaries"][0]["buckets"][0]["key"]["bucket"], "hour");
        assert_eq!(
            value["summaries"][0]["buckets"][0]["aggregates"][0]["status"],
            "stats"
        );
        Ok(())
    }

    #[test]
    fn test_overview_and_distribution_sections() {
        let start = chrono::NaiveDate::from_ymd_opt(2021, 8, 9)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut report = Report::new();
        report.overviews.push(DatasetOverview {
            country: "Benin".to_string(),
            rows: 72,
            columns: 3,
            first_timestamp: Some(start),
            last_timestamp: Some(start + chrono::Duration::hours(71)),
            missing_values: 0,
            peak_hour: Some((12, 903.0)),
            weather_impact: vec![(Column::Rh, -0.982), (Column::Tamb, 0.951)],
        });
        report.distributions.push(Distribution {
            country: "Benin".to_string(),
            column: Column::Ghi,
            count: 6,
            min: 0.0,
            q1: 0.0,
            median: 250.0,
            q3: 600.0,
            max: 900.0,
            bins: vec![
                crate::analyzers::HistogramBin {
                    lower: 0.0,
                    upper: 450.0,
                    count: 4,
                },
                crate::analyzers::HistogramBin {
                    lower: 450.0,
                    upper: 900.0,
                    count: 2,
                },
            ],
        });

        let text = ReportWriter::default().with_chart_width(8).render_text(&report);

        assert!(text.contains("2021-08-09 to 2021-08-11"));
        assert!(text.contains("12:00 (903.0)"));
        assert!(text.contains("=== Quartiles ==="));
        assert!(text.contains("=== Benin distribution: GHI (W/m²) ==="));
        assert!(text.contains("    0.0 -    450.0 | ######## 4"));
        assert!(text.contains("  450.0 -    900.0 | #### 2"));
        assert!(text.contains("Benin            RH -0.982, Tamb +0.951"));
    }

    #[test]
    fn test_hourly_profile_marks_missing_hours() {
        let profile = CountrySummary {
            country: "Benin".to_string(),
            total_rows: 1,
            buckets: vec![BucketSummary {
                key: BucketKey::Hour(12),
                aggregates: vec![Aggregate::Stats(SummaryStats {
                    country: "Benin".to_string(),
                    column: Column::Ghi,
                    count: 1,
                    mean: 812.0,
                    median: 812.0,
                    std_dev: 0.0,
                    min: 812.0,
                    max: 812.0,
                })],
            }],
        };

        let text = render_hourly_profile(&[profile], Column::Ghi);
        assert!(text.contains("12:00"));
        assert!(text.contains("812.0"));
        assert_eq!(text.lines().count(), 26);
    }
}
