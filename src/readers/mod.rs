pub mod archive_reader;
pub mod dataset_loader;
pub mod measurement_reader;

pub use archive_reader::ArchiveReader;
pub use dataset_loader::{DatasetLoader, InputSource};
pub use measurement_reader::MeasurementReader;
