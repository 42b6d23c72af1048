pub mod csv_source;
pub mod fn_loader;
pub mod memory_source;
pub mod synthetic;

pub use csv_source::CsvSource;
pub use fn_loader::FnLoader;
pub use memory_source::MemorySource;
pub use synthetic::SyntheticSource;

/// Samples between two cancellation checks in generating loaders
const CANCEL_CHECK_INTERVAL: usize = 1024;
