use crate::analyzers::{
    Aggregator, Comparator, CorrelationMatrix, DatasetOverview, Distribution, SolarScorer,
};
use crate::cli::args::{Cli, Commands, InputArgs};
use crate::config::AppConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{Column, CountryDataset, TimeBucket};
use crate::processors::{Cleaner, CleaningReport};
use crate::readers::{DatasetLoader, InputSource};
use crate::utils::constants::HISTOGRAM_BINS;
use crate::utils::filename::generate_default_report_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::{CsvWriter, Report, ReportFormat, ReportWriter};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Columns compared by the full report when none are requested
const DEFAULT_REPORT_COLUMNS: [Column; 3] = [Column::Ghi, Column::Dni, Column::Dhi];

pub fn run(cli: Cli) -> Result<()> {
    setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let mut config = AppConfig::load(cli.config.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Clean { input, output_dir } => {
            apply_input_overrides(&mut config, &input);
            let (datasets, reports) = load_and_clean(&input, &config, quiet)?;

            for report in &reports {
                println!("{}", report.summary());
            }

            if let Some(dir) = output_dir {
                let paths = CsvWriter::new()
                    .with_delimiter(input.delimiter.unwrap_or(b','))
                    .write_all(&datasets, &dir)?;
                for path in paths {
                    println!("Wrote {}", path.display());
                }
            }
        }

        Commands::Summarize {
            input,
            columns,
            bucket,
            by_cleaning,
        } => {
            apply_input_overrides(&mut config, &input);
            if let Some(bucket) = bucket {
                config.analysis.bucket = bucket;
            }

            let (datasets, _) = load_and_clean(&input, &config, quiet)?;
            let aggregator = Aggregator::new(config.analysis.bucket);
            let writer = ReportWriter::default();

            for dataset in &datasets {
                let columns = resolve_columns(&columns, std::slice::from_ref(dataset));
                let summary = if by_cleaning {
                    aggregator.summarize_by_cleaning(dataset, &columns)
                } else {
                    aggregator.summarize(dataset, &columns)
                };
                println!("{}", writer.render_summary(&summary));
            }
        }

        Commands::Compare {
            input,
            column,
            test,
            alpha,
        } => {
            apply_input_overrides(&mut config, &input);
            if let Some(test) = test {
                config.comparison.test = test;
            }
            if let Some(alpha) = alpha {
                config.comparison.significance_level = alpha;
            }
            validate(&config)?;

            let (datasets, _) = load_and_clean(&input, &config, quiet)?;
            let comparison = Comparator::new(config.comparison.clone()).compare(&datasets, column)?;

            println!("{}", ReportWriter::default().render_comparison(&comparison));
        }

        Commands::Report {
            input,
            output,
            save,
            format,
            columns,
            bucket,
        } => {
            apply_input_overrides(&mut config, &input);
            if let Some(bucket) = bucket {
                config.analysis.bucket = bucket;
            }

            // Progress output would interleave with JSON on the terminal
            let silent = quiet || (format == ReportFormat::Json && output.is_none());
            let (datasets, reports) = load_and_clean(&input, &config, silent)?;

            let output = output
                .or_else(|| save.then(|| generate_default_report_filename(format.extension())));
            let report = build_report(&config, datasets, reports, &columns);
            ReportWriter::new(format).write(&report, output.as_deref())?;
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let log_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("solar_analytics={}", log_level)));

    let initialised = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_level(true)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if initialised.is_err() {
        debug!("Logging already initialised");
    }
    Ok(())
}

/// CLI flags take precedence over file and environment configuration
fn apply_input_overrides(config: &mut AppConfig, input: &InputArgs) {
    if let Some(policy) = input.negative {
        config.cleaning.negative_irradiance = policy;
    }
    if let Some(policy) = input.missing {
        config.cleaning.missing = policy;
    }
    if input.hours.is_some() {
        config.analysis.hours = input.hours;
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    use validator::Validate;
    config.validate()?;
    Ok(())
}

fn collect_sources(input: &InputArgs) -> Result<Vec<InputSource>> {
    let mut sources = input.inputs.clone();
    if let Some(dir) = &input.input_dir {
        sources.extend(DatasetLoader::discover(dir)?);
    }

    if sources.is_empty() {
        return Err(ProcessingError::InsufficientInput(
            "No input files given; use --input or --input-dir".to_string(),
        ));
    }
    Ok(sources)
}

/// Loader and Cleaner stages, followed by the optional hour-range filter
pub fn load_and_clean(
    input: &InputArgs,
    config: &AppConfig,
    silent: bool,
) -> Result<(Vec<CountryDataset>, Vec<CleaningReport>)> {
    let sources = collect_sources(input)?;
    let loader = DatasetLoader::new()
        .with_mmap(input.mmap)
        .with_delimiter(input.delimiter.unwrap_or(b','));
    let cleaner = Cleaner::new(config.cleaning.clone());

    let progress = ProgressReporter::new(sources.len() as u64, "Loading country data...", silent);
    let mut datasets = Vec::new();
    let mut reports = Vec::new();

    for source in &sources {
        progress.set_message(&format!("Loading {}", source.path.display()));
        for raw in loader.load(source)? {
            progress.set_message(&format!("Cleaning {} ({} rows)", raw.country, raw.len()));
            let (dataset, report) = cleaner.clean(&raw)?;

            let dataset = match config.analysis.hours {
                Some(hours) => {
                    let filtered = dataset.filter_hours(hours.start, hours.end);
                    debug!(
                        "{}: {} of {} rows within {}",
                        filtered.country(),
                        filtered.len(),
                        dataset.len(),
                        hours
                    );
                    filtered
                }
                None => dataset,
            };

            datasets.push(dataset);
            reports.push(report);
        }
        progress.increment(1);
    }

    progress.finish_with_message(&format!("Cleaned {} country datasets", datasets.len()));
    info!(
        "Loaded {} datasets from {} sources",
        datasets.len(),
        sources.len()
    );
    Ok((datasets, reports))
}

/// Requested columns, or every column present in any dataset
fn resolve_columns(requested: &[Column], datasets: &[CountryDataset]) -> Vec<Column> {
    if !requested.is_empty() {
        return requested.to_vec();
    }
    Column::ALL
        .into_iter()
        .filter(|c| datasets.iter().any(|d| d.has_column(*c)))
        .collect()
}

/// Aggregator, Comparator and supplementary analyses for the full report
pub fn build_report(
    config: &AppConfig,
    datasets: Vec<CountryDataset>,
    cleaning: Vec<CleaningReport>,
    compare_columns: &[Column],
) -> Report {
    let mut report = Report::new();
    report.hours = config.analysis.hours;
    report.cleaning = cleaning;
    report.overviews = datasets.iter().map(DatasetOverview::from_dataset).collect();

    let summary_columns = resolve_columns(&[], &datasets);
    let aggregator = Aggregator::new(config.analysis.bucket);
    report.summaries = datasets
        .iter()
        .map(|d| aggregator.summarize(d, &summary_columns))
        .collect();

    let hourly = Aggregator::new(TimeBucket::Hour);
    report.hourly_profiles = datasets
        .iter()
        .filter(|d| d.has_column(Column::Ghi))
        .map(|d| hourly.summarize(d, &[Column::Ghi]))
        .collect();

    report.cleaning_impact = datasets
        .iter()
        .filter(|d| d.has_column(Column::ModA) || d.has_column(Column::ModB))
        .map(|d| aggregator.summarize_by_cleaning(d, &[Column::ModA, Column::ModB]))
        .collect();

    let compare_columns = if compare_columns.is_empty() {
        DEFAULT_REPORT_COLUMNS.to_vec()
    } else {
        compare_columns.to_vec()
    };
    let comparator = Comparator::new(config.comparison.clone());
    for column in compare_columns {
        match comparator.compare(&datasets, column) {
            Ok(comparison) => report.comparisons.push(comparison),
            Err(e) => {
                warn!("Skipping {} comparison: {}", column, e);
                report.notes.push(format!("{} comparison skipped: {}", column, e));
            }
        }
    }

    report.distributions = datasets
        .iter()
        .filter_map(|d| Distribution::compute(d, Column::Ghi, HISTOGRAM_BINS))
        .collect();

    report.solar_scores = SolarScorer::rank(&datasets);

    report.correlations = datasets
        .iter()
        .map(|d| {
            let columns: Vec<Column> = Column::CORE
                .into_iter()
                .filter(|c| d.has_column(*c))
                .collect();
            CorrelationMatrix::compute(d, &columns)
        })
        .collect();

    report
}
