pub mod aggregator;
pub mod comparator;
pub mod correlation;
pub mod distribution;
pub mod overview;
pub mod solar_score;
pub mod stats;

pub use aggregator::Aggregator;
pub use comparator::Comparator;
pub use correlation::CorrelationMatrix;
pub use distribution::{Distribution, HistogramBin};
pub use overview::DatasetOverview;
pub use solar_score::{SolarScore, SolarScorer};
