pub mod constants;
pub mod filename;
pub mod progress;
pub mod timestamp;

pub use constants::*;
pub use filename::{cleaned_filename, country_from_path, generate_default_report_filename};
pub use progress::ProgressReporter;
pub use timestamp::parse_timestamp;
