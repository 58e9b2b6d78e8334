pub mod cleaner;

pub use cleaner::{Cleaner, CleaningReport, ColumnCleaning};
