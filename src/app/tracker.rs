use crate::config::TrackerConfig;
use crate::core::etl::{CycleOutcome, TrackerEngine};
use crate::core::{ConfigProvider, Pipeline};
use crate::utils::error::{ErrorSeverity, Result};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineFailure {
    pub pipeline: String,
    pub message: String,
    pub severity: ErrorSeverity,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub outcomes: Vec<(String, CycleOutcome)>,
    pub failures: Vec<PipelineFailure>,
}

impl TickReport {
    fn record(&mut self, pipeline: &str, result: Result<CycleOutcome>) {
        match result {
            Ok(outcome) => {
                if let CycleOutcome::Published(location) = &outcome {
                    tracing::debug!("[{}] published to {}", pipeline, location);
                }
                self.outcomes.push((pipeline.to_string(), outcome));
            }
            Err(e) => {
                tracing::error!(
                    "✖ [{}] {} (Category: {:?}, Severity: {:?})",
                    pipeline,
                    e,
                    e.category(),
                    e.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                self.failures.push(PipelineFailure {
                    pipeline: pipeline.to_string(),
                    message: e.to_string(),
                    severity: e.severity(),
                    exit_code: e.exit_code(),
                });
            }
        }
    }

    /// Exit code of the most severe failure; the first one wins on ties.
    pub fn exit_code(&self) -> i32 {
        self.failures
            .iter()
            .rev()
            .max_by_key(|f| f.severity)
            .map_or(0, |f| f.exit_code)
    }
}

/// Drives the world (host only) and skills engines on a fixed interval.
pub struct Tracker<W: Pipeline, S: Pipeline> {
    config: Arc<TrackerConfig>,
    world: Option<TrackerEngine<W>>,
    skills: TrackerEngine<S>,
    ticks: AtomicU64,
}

impl<W: Pipeline, S: Pipeline> Tracker<W, S> {
    pub fn new(
        config: Arc<TrackerConfig>,
        world: Option<TrackerEngine<W>>,
        skills: TrackerEngine<S>,
    ) -> Self {
        Self {
            config,
            world,
            skills,
            ticks: AtomicU64::new(0),
        }
    }

    pub fn log_banner(&self) {
        tracing::info!(
            "▶ Valheim Tracker — Role: {}, Player: {}",
            self.config.role,
            self.config.player_name
        );
        tracing::info!("▶ World: {}", self.config.world_file().display());
        tracing::info!("▶ Sheet: {}", self.config.sheet_name);
        tracing::info!("▶ Interval: {} min", self.config.interval_minutes);
    }

    /// One polling cycle. Each pipeline's failure is logged and reported
    /// without stopping the other.
    pub async fn tick(&self) -> TickReport {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!("Tick #{}", tick);

        let mut report = TickReport::default();

        if let Some(world) = &self.world {
            let result = match self.config.validate_host_paths() {
                Ok(()) => world.run_once().await,
                Err(e) => Err(e),
            };
            report.record("world", result);
        }

        report.record("skills", self.skills.run_once().await);
        report
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks immediately, then every interval, until `shutdown` resolves.
    /// A tick in progress is abandoned on shutdown.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.interval().max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = async {
                    ticker.tick().await;
                    self.tick().await
                } => {}
            }
        }

        tracing::warn!("⚠ Exiting…");
    }

    pub async fn run(&self) {
        self.log_banner();
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("✖ Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;
    }
}
