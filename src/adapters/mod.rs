// Adapters layer: concrete implementations of the domain ports.

pub mod csv_sink;
pub mod exporter;
pub mod sheets;
pub mod storage;

pub use csv_sink::CsvSink;
pub use exporter::JarWorldExporter;
pub use sheets::{GoogleEndpoints, GoogleSheetsSink, ServiceAccountKey};
pub use storage::LocalStorage;
