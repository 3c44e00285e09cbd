// Application layer: concrete pipelines and the polling loop that wires them.

pub mod pipelines;
pub mod tracker;

use crate::adapters::{CsvSink, GoogleSheetsSink, JarWorldExporter, LocalStorage};
use crate::config::{OutputMode, TrackerConfig};
use crate::core::etl::TrackerEngine;
use crate::core::{ConfigProvider, ReportSink, Role};
use crate::utils::error::Result;
use pipelines::{SkillsPipeline, WorldPipeline};
use std::sync::Arc;
use tracker::Tracker;

pub type SharedSink = Arc<dyn ReportSink>;
pub type HostWorldPipeline = WorldPipeline<JarWorldExporter, SharedSink>;
pub type LocalSkillsPipeline = SkillsPipeline<LocalStorage, Arc<TrackerConfig>, SharedSink>;
pub type ValheimTracker = Tracker<HostWorldPipeline, LocalSkillsPipeline>;

pub fn build_sink(config: &TrackerConfig) -> Result<SharedSink> {
    match config.output_mode {
        OutputMode::Sheets => {
            let sink = GoogleSheetsSink::from_credentials_file(&config.google_creds, &config.sheet_name)?;
            Ok(Arc::new(sink))
        }
        OutputMode::Csv => {
            let dir = config.csv_output_dir.clone();
            let display = dir.to_string_lossy().into_owned();
            Ok(Arc::new(CsvSink::new(LocalStorage::new(dir), display)))
        }
    }
}

pub fn build_tracker(config: TrackerConfig, sink: SharedSink, monitor: bool) -> ValheimTracker {
    let config = Arc::new(config);

    let world = (config.role == Role::Host).then(|| {
        let exporter = JarWorldExporter::new(
            config.java_bin.clone(),
            config.jar_path.clone(),
            config.world_file().to_path_buf(),
            config.world_json_out.clone(),
        );
        TrackerEngine::new_with_monitoring(WorldPipeline::new(exporter, sink.clone()), monitor)
    });

    let skills = TrackerEngine::new_with_monitoring(
        SkillsPipeline::new(LocalStorage::new("."), config.clone(), sink),
        monitor,
    );

    Tracker::new(config, world, skills)
}
