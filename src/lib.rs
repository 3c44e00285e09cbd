pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{CsvSink, GoogleSheetsSink, JarWorldExporter, LocalStorage};
pub use app::{build_sink, build_tracker, ValheimTracker};
pub use config::{OutputMode, RawSettings, TrackerConfig};
pub use core::etl::{CycleOutcome, TrackerEngine};
pub use utils::error::{Result, TrackerError};
