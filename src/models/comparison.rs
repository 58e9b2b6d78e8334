use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Column;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCountry {
    pub rank: usize,
    pub country: String,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    /// Welch for two countries, ANOVA for more
    #[default]
    Auto,
    Welch,
    Anova,
    Kruskal,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TestKind::Auto => "auto",
            TestKind::Welch => "Welch t-test",
            TestKind::Anova => "one-way ANOVA",
            TestKind::Kruskal => "Kruskal-Wallis H",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTest {
    pub kind: TestKind,
    pub countries: Vec<String>,
    pub statistic: f64,
    /// (numerator, denominator) for F; single value for t and H
    pub degrees_of_freedom: (f64, Option<f64>),
    pub p_value: f64,
    pub significance_level: f64,
    pub significant: bool,
}

/// Cross-country comparison of a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub column: Column,
    pub ranking: Vec<RankedCountry>,
    pub test: Option<SignificanceTest>,
}

impl ComparisonResult {
    pub fn leader(&self) -> Option<&RankedCountry> {
        self.ranking.first()
    }
}
