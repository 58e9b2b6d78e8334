use crate::analyzers::stats::{mean, sample_variance};
use crate::analyzers::Aggregator;
use crate::config::ComparisonConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{
    Aggregate, Column, ComparisonResult, CountryDataset, RankedCountry, SignificanceTest, SummaryStats,
    TestKind,
};
use crate::utils::constants::MIN_OBSERVATIONS_PER_GROUP;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, StudentsT};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Observed values of one country for the column under test
struct Group<'a> {
    country: &'a str,
    values: Vec<f64>,
}

/// Test statistic, degrees of freedom and p-value
type Outcome = (f64, (f64, Option<f64>), f64);

/// Cross-country ranking and significance testing.
pub struct Comparator {
    config: ComparisonConfig,
}

impl Comparator {
    pub fn new(config: ComparisonConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    /// Rank countries by mean, highest first. Equal means are ordered by country name.
    pub fn rank(&self, stats: &[SummaryStats]) -> Result<ComparisonResult> {
        let Some(first) = stats.first() else {
            return Err(ProcessingError::InsufficientInput(
                "No countries to compare".to_string(),
            ));
        };
        let column = first.column;

        if stats.len() < 2 {
            return Err(ProcessingError::InsufficientInput(format!(
                "Comparing {} needs at least two countries, got {}",
                column,
                stats.len()
            )));
        }

        if let Some(other) = stats.iter().find(|s| s.column != column) {
            return Err(ProcessingError::ColumnMismatch {
                expected: column.to_string(),
                found: format!("{} for {}", other.column, other.country),
            });
        }

        check_unique(stats.iter().map(|s| s.country.as_str()))?;

        let mut sorted: Vec<&SummaryStats> = stats.iter().collect();
        sorted.sort_by(|a, b| {
            b.mean
                .total_cmp(&a.mean)
                .then_with(|| a.country.cmp(&b.country))
        });

        let ranking = sorted
            .into_iter()
            .enumerate()
            .map(|(i, s)| RankedCountry {
                rank: i + 1,
                country: s.country.clone(),
                mean: s.mean,
                median: s.median,
                std_dev: s.std_dev,
                count: s.count,
            })
            .collect();

        Ok(ComparisonResult {
            column,
            ranking,
            test: None,
        })
    }

    /// Run a significance test on the cleaned values of `column`.
    pub fn test(
        &self,
        datasets: &[&CountryDataset],
        column: Column,
        kind: TestKind,
    ) -> Result<SignificanceTest> {
        if datasets.len() < 2 {
            return Err(ProcessingError::InsufficientInput(format!(
                "A significance test on {} needs at least two countries, got {}",
                column,
                datasets.len()
            )));
        }
        check_unique(datasets.iter().map(|d| d.country()))?;

        let groups: Vec<Group> = datasets
            .iter()
            .map(|d| Group {
                country: d.country(),
                values: d.values(column),
            })
            .collect();

        if let Some(small) = groups
            .iter()
            .find(|g| g.values.len() < MIN_OBSERVATIONS_PER_GROUP)
        {
            return Err(ProcessingError::InsufficientInput(format!(
                "{} has {} {} observations; at least {} are required",
                small.country,
                small.values.len(),
                column,
                MIN_OBSERVATIONS_PER_GROUP
            )));
        }

        let kind = match kind {
            TestKind::Auto if groups.len() == 2 => TestKind::Welch,
            TestKind::Auto => TestKind::Anova,
            other => other,
        };

        let (statistic, degrees_of_freedom, p_value) = match kind {
            TestKind::Welch => welch_t_test(&groups)?,
            TestKind::Kruskal => kruskal_wallis(&groups)?,
            _ => one_way_anova(&groups)?,
        };

        let significance_level = self.config.significance_level;
        let significant = p_value < significance_level;

        info!(
            "{} on {}: statistic={:.4}, p={:.4e} ({})",
            kind,
            column,
            statistic,
            p_value,
            if significant { "significant" } else { "not significant" }
        );

        Ok(SignificanceTest {
            kind,
            countries: groups.iter().map(|g| g.country.to_string()).collect(),
            statistic,
            degrees_of_freedom,
            p_value,
            significance_level,
            significant,
        })
    }

    /// Rank all datasets by `column` and run the configured test.
    ///
    /// Countries without any observation of the column are left out of the comparison.
    pub fn compare(&self, datasets: &[CountryDataset], column: Column) -> Result<ComparisonResult> {
        let mut stats = Vec::new();
        let mut included = Vec::new();

        for dataset in datasets {
            match Aggregator::describe(dataset.country(), column, &dataset.values(column)) {
                Aggregate::Stats(s) => {
                    stats.push(s);
                    included.push(dataset);
                }
                Aggregate::NoData { .. } => {
                    warn!("{} has no {} data; excluded from comparison", dataset.country(), column);
                }
            }
        }

        let mut result = self.rank(&stats)?;
        result.test = Some(self.test(&included, column, self.config.test)?);

        debug!(
            "Compared {} countries on {}, leader: {:?}",
            result.ranking.len(),
            column,
            result.leader().map(|r| r.country.as_str())
        );
        Ok(result)
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(ComparisonConfig::default())
    }
}

fn check_unique<'a>(countries: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for country in countries {
        if !seen.insert(country) {
            return Err(ProcessingError::InsufficientInput(format!(
                "Country '{}' appears more than once",
                country
            )));
        }
    }
    Ok(())
}

fn stats_error(e: impl std::fmt::Display) -> ProcessingError {
    ProcessingError::Statistics(e.to_string())
}

/// Two-tailed Welch t-test with Welch–Satterthwaite degrees of freedom
fn welch_t_test(groups: &[Group]) -> Result<Outcome> {
    let [a, b] = groups else {
        return Err(ProcessingError::InsufficientInput(format!(
            "Welch t-test compares exactly two countries, got {}",
            groups.len()
        )));
    };

    let n1 = a.values.len() as f64;
    let n2 = b.values.len() as f64;
    let (Some(m1), Some(m2)) = (mean(&a.values), mean(&b.values)) else {
        return Err(stats_error("empty group"));
    };
    let (Some(v1), Some(v2)) = (sample_variance(&a.values), sample_variance(&b.values)) else {
        return Err(stats_error("group with fewer than two observations"));
    };

    let se1 = v1 / n1;
    let se2 = v2 / n2;
    let se_sum = se1 + se2;

    if se_sum == 0.0 {
        let df = n1 + n2 - 2.0;
        return Ok(degenerate(m1 == m2, df, None, (m1 - m2).signum()));
    }

    let t = (m1 - m2) / se_sum.sqrt();
    let df = se_sum.powi(2) / (se1.powi(2) / (n1 - 1.0) + se2.powi(2) / (n2 - 1.0));

    let dist = StudentsT::new(0.0, 1.0, df).map_err(stats_error)?;
    let p_value = (2.0 * dist.sf(t.abs())).min(1.0);

    Ok((t, (df, None), p_value))
}

/// One-way ANOVA F-test
fn one_way_anova(groups: &[Group]) -> Result<Outcome> {
    let k = groups.len() as f64;
    let total: usize = groups.iter().map(|g| g.values.len()).sum();
    let n = total as f64;

    let all: Vec<f64> = groups.iter().flat_map(|g| g.values.iter().copied()).collect();
    let grand_mean = mean(&all).ok_or_else(|| stats_error("empty groups"))?;

    let mut between = 0.0;
    let mut within = 0.0;
    for group in groups {
        let group_mean = mean(&group.values).ok_or_else(|| stats_error("empty group"))?;
        between += group.values.len() as f64 * (group_mean - grand_mean).powi(2);
        within += group
            .values
            .iter()
            .map(|v| (v - group_mean).powi(2))
            .sum::<f64>();
    }

    let df_between = k - 1.0;
    let df_within = n - k;

    if within == 0.0 {
        return Ok(degenerate(between == 0.0, df_between, Some(df_within), 1.0));
    }

    let f = (between / df_between) / (within / df_within);
    let dist = FisherSnedecor::new(df_between, df_within).map_err(stats_error)?;

    Ok((f, (df_between, Some(df_within)), dist.sf(f)))
}

/// Kruskal–Wallis H-test with average ranks for ties and tie correction
fn kruskal_wallis(groups: &[Group]) -> Result<Outcome> {
    let mut pooled: Vec<(f64, usize)> = groups
        .iter()
        .enumerate()
        .flat_map(|(i, g)| g.values.iter().map(move |v| (*v, i)))
        .collect();
    pooled.sort_by(|a, b| a.0.total_cmp(&b.0));

    let n = pooled.len() as f64;
    let df = groups.len() as f64 - 1.0;
    let mut rank_sums = vec![0.0; groups.len()];
    let mut tie_term = 0.0;

    let mut i = 0;
    while i < pooled.len() {
        let mut j = i;
        while j + 1 < pooled.len() && pooled[j + 1].0 == pooled[i].0 {
            j += 1;
        }
        // Ranks are 1-based; tied values share the average
        let average_rank = (i + j) as f64 / 2.0 + 1.0;
        for (_, group) in &pooled[i..=j] {
            rank_sums[*group] += average_rank;
        }
        let ties = (j - i + 1) as f64;
        tie_term += ties.powi(3) - ties;
        i = j + 1;
    }

    let correction = 1.0 - tie_term / (n.powi(3) - n);
    if correction <= 0.0 {
        // Every value identical
        return Ok(degenerate(true, df, None, 1.0));
    }

    let h = 12.0 / (n * (n + 1.0))
        * groups
            .iter()
            .zip(&rank_sums)
            .map(|(g, r)| r.powi(2) / g.values.len() as f64)
            .sum::<f64>()
        - 3.0 * (n + 1.0);
    let h = (h / correction).max(0.0);

    let dist = ChiSquared::new(df).map_err(stats_error)?;
    Ok((h, (df, None), dist.sf(h)))
}

/// Zero-variance outcome: no evidence when groups are identical, certainty otherwise
fn degenerate(identical: bool, df: f64, df2: Option<f64>, sign: f64) -> Outcome {
    if identical {
        (0.0, (df, df2), 1.0)
    } else {
        (f64::INFINITY.copysign(sign), (df, df2), 0.0)
    }
}
