use crate::config::{HourRange, MissingValuePolicy, NegativeIrradiancePolicy};
use crate::models::{Column, TestKind, TimeBucket};
use crate::readers::InputSource;
use crate::writers::ReportFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "solar-analytics")]
#[command(about = "Clean, summarize and compare solar irradiance data across countries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Only log warnings and errors, hide progress"
    )]
    pub quiet: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Configuration file [default: ./solar-analytics.toml if present]"
    )]
    pub config: Option<PathBuf>,
}

/// Input selection and cleaning overrides shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    #[arg(
        short,
        long = "input",
        value_name = "[COUNTRY=]PATH",
        value_parser = parse_input_source,
        help = "Country data file or zip archive (repeatable)"
    )]
    pub inputs: Vec<InputSource>,

    #[arg(long, value_name = "DIR", help = "Use every .csv and .zip file in a directory")]
    pub input_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "START-END",
        value_parser = parse_hour_range,
        help = "Restrict analysis to an inclusive hour range, e.g. 6-18"
    )]
    pub hours: Option<HourRange>,

    #[arg(long, value_enum, help = "Negative irradiance handling [default: clip]")]
    pub negative: Option<NegativeIrradiancePolicy>,

    #[arg(long, value_enum, help = "Missing value handling [default: mean]")]
    pub missing: Option<MissingValuePolicy>,

    #[arg(long, help = "Memory-map input files")]
    pub mmap: bool,

    #[arg(
        short,
        long,
        value_parser = parse_delimiter,
        help = "Field delimiter for input and exported CSV files [default: ,]"
    )]
    pub delimiter: Option<u8>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and clean country files, print the cleaning report
    Clean {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short, long, help = "Write cleaned CSV files (<country>_clean.csv) here")]
        output_dir: Option<PathBuf>,
    },

    /// Per-country summary statistics
    Summarize {
        #[command(flatten)]
        input: InputArgs,

        #[arg(
            long = "column",
            value_enum,
            value_delimiter = ',',
            help = "Columns to summarize [default: all columns present]"
        )]
        columns: Vec<Column>,

        #[arg(short, long, value_enum, help = "Time bucket [default: overall]")]
        bucket: Option<TimeBucket>,

        #[arg(long, help = "Split by the panel-cleaning flag instead of time")]
        by_cleaning: bool,
    },

    /// Rank countries by a column and test whether they differ
    Compare {
        #[command(flatten)]
        input: InputArgs,

        #[arg(long, value_enum, default_value = "ghi")]
        column: Column,

        #[arg(short, long, value_enum, help = "Significance test [default: auto]")]
        test: Option<TestKind>,

        #[arg(long, help = "Significance level [default: 0.05]")]
        alpha: Option<f64>,
    },

    /// Full pipeline report
    Report {
        #[command(flatten)]
        input: InputArgs,

        #[arg(short, long, help = "Report file path [default: stdout]")]
        output: Option<PathBuf>,

        #[arg(
            long,
            conflicts_with = "output",
            help = "Save to output/solar-report-{YYMMDD}.<ext> instead of stdout"
        )]
        save: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: ReportFormat,

        #[arg(
            long = "column",
            value_enum,
            value_delimiter = ',',
            help = "Columns to compare [default: GHI, DNI, DHI]"
        )]
        columns: Vec<Column>,

        #[arg(short, long, value_enum, help = "Time bucket for summaries [default: overall]")]
        bucket: Option<TimeBucket>,
    },
}

fn parse_input_source(s: &str) -> Result<InputSource, String> {
    s.parse().map_err(|e: crate::ProcessingError| e.to_string())
}

fn parse_hour_range(s: &str) -> Result<HourRange, String> {
    s.parse().map_err(|e: crate::ProcessingError| e.to_string())
}

fn parse_delimiter(s: &str) -> Result<u8, String> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match s.as_bytes() {
            [byte] if byte.is_ascii() && !byte.is_ascii_alphanumeric() => Ok(*byte),
            _ => Err(format!("Delimiter must be a single ASCII symbol, got '{}'", s)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compare_command() {
        let cli = Cli::try_parse_from([
            "solar-analytics",
            "compare",
            "-i",
            "Benin=data/benin.csv",
            "--input",
            "data/togo-dapaong.csv",
            "--hours",
            "6-18",
            "--column",
            "dni",
            "--test",
            "kruskal",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Compare {
                input,
                column,
                test,
                alpha,
            } => {
                assert_eq!(input.inputs.len(), 2);
                assert_eq!(input.inputs[0].country.as_deref(), Some("Benin"));
                assert_eq!(input.hours, Some(HourRange { start: 6, end: 18 }));
                assert_eq!(column, Column::Dni);
                assert_eq!(test, Some(TestKind::Kruskal));
                assert_eq!(alpha, None);
            }
            _ => panic!("expected compare"),
        }
    }

    #[test]
    fn test_summarize_column_list() {
        let cli = Cli::try_parse_from([
            "solar-analytics",
            "summarize",
            "--input-dir",
            "data",
            "--column",
            "ghi,tamb,moda",
            "--bucket",
            "hour",
            "--missing",
            "median",
            "--delimiter",
            ";",
        ])
        .unwrap();

        match cli.command {
            Commands::Summarize {
                input,
                columns,
                bucket,
                by_cleaning,
            } => {
                assert_eq!(columns, vec![Column::Ghi, Column::Tamb, Column::ModA]);
                assert_eq!(bucket, Some(TimeBucket::Hour));
                assert_eq!(input.missing, Some(MissingValuePolicy::Median));
                assert_eq!(input.delimiter, Some(b';'));
                assert!(!by_cleaning);
            }
            _ => panic!("expected summarize"),
        }
    }

    #[test]
    fn test_invalid_hours_rejected() {
        let result = Cli::try_parse_from([
            "solar-analytics",
            "clean",
            "-i",
            "benin.csv",
            "--hours",
            "18-6",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("x").is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Cli::try_parse_from(["solar-analytics", "-v", "-q", "clean"]);
        assert!(result.is_err());
    }
}
