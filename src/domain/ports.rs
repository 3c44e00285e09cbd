use crate::domain::model::{ReportTable, Role};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::time::{Duration, SystemTime};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// `None` when the file does not exist.
    fn modified(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Option<SystemTime>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn role(&self) -> Role;
    fn player_name(&self) -> &str;
    fn player_file(&self) -> &Path;
    fn world_file(&self) -> &Path;
    fn sheet_name(&self) -> &str;
    fn interval(&self) -> Duration;
}

/// Turns the binary world save into JSON text.
#[async_trait]
pub trait WorldExporter: Send + Sync {
    async fn ensure_runtime(&self) -> Result<()>;
    async fn export(&self) -> Result<String>;
}

#[async_trait]
impl<T: WorldExporter + ?Sized> WorldExporter for std::sync::Arc<T> {
    async fn ensure_runtime(&self) -> Result<()> {
        (**self).ensure_runtime().await
    }

    async fn export(&self) -> Result<String> {
        (**self).export().await
    }
}

/// Destination for report tabs. A publish replaces the tab's previous contents.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn publish(&self, table: &ReportTable) -> Result<String>;
}

#[async_trait]
impl<T: ReportSink + ?Sized> ReportSink for std::sync::Arc<T> {
    async fn publish(&self, table: &ReportTable) -> Result<String> {
        (**self).publish(table).await
    }
}

/// What change detection remembers between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fingerprint {
    Digest(String),
    Modified(SystemTime),
}

#[derive(Debug)]
pub struct Extracted<T> {
    pub data: T,
    pub fingerprint: Fingerprint,
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Raw: Send;

    fn name(&self) -> &str;

    /// `Ok(None)` when the source has not changed since the last commit.
    async fn extract(&self) -> Result<Option<Extracted<Self::Raw>>>;
    async fn transform(&self, raw: Self::Raw) -> Result<ReportTable>;
    async fn load(&self, table: ReportTable) -> Result<String>;
    fn commit(&self, fingerprint: Fingerprint);

    fn publish_when_empty(&self) -> bool {
        true
    }
}
