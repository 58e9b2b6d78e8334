pub mod comparison;
pub mod dataset;
pub mod measurement;
pub mod raw;
pub mod summary;

pub use comparison::{ComparisonResult, RankedCountry, SignificanceTest, TestKind};
pub use dataset::CountryDataset;
pub use measurement::{Column, MeasurementRow};
pub use raw::{RawDataset, RawRecord};
pub use summary::{Aggregate, BucketKey, BucketSummary, CountrySummary, SummaryStats, TimeBucket};
