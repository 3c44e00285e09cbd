use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Source fingerprint matched the last successful publish.
    Unchanged,
    /// Nothing worth publishing was decoded.
    Empty,
    Published(String),
}

pub struct TrackerEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> TrackerEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    /// Runs one extract/transform/load pass. The fingerprint is committed only
    /// once the load succeeds, so a failed publish is retried on the next tick.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let name = self.pipeline.name();

        tracing::debug!("[{}] extracting", name);
        let Some(extracted) = self.pipeline.extract().await? else {
            return Ok(CycleOutcome::Unchanged);
        };
        self.monitor.log_stats(&format!("{} extract", name));

        tracing::debug!("[{}] transforming", name);
        let table = self.pipeline.transform(extracted.data).await?;
        tracing::info!("▶ [{}] {} rows for tab '{}'", name, table.rows.len(), table.title);

        if table.is_empty() && !self.pipeline.publish_when_empty() {
            tracing::warn!("⚠ [{}] nothing decoded; skipping upload", name);
            self.pipeline.commit(extracted.fingerprint);
            return Ok(CycleOutcome::Empty);
        }

        let location = self.pipeline.load(table).await?;
        self.pipeline.commit(extracted.fingerprint);
        self.monitor.log_stats(&format!("{} load", name));

        Ok(CycleOutcome::Published(location))
    }
}
