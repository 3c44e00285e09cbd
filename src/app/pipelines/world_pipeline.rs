use crate::core::world::{aggregate_chests, totals_table};
use crate::core::{Extracted, Fingerprint, Pipeline, ReportSink, ReportTable, WorldExporter};
use crate::utils::error::Result;
use sha2::{Digest, Sha256};
use std::sync::{Mutex, PoisonError};

pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Host-side pipeline: world save -> JSON -> chest totals -> `World` tab.
pub struct WorldPipeline<E: WorldExporter, K: ReportSink> {
    exporter: E,
    sink: K,
    last_digest: Mutex<Option<String>>,
}

impl<E: WorldExporter, K: ReportSink> WorldPipeline<E, K> {
    pub fn new(exporter: E, sink: K) -> Self {
        Self {
            exporter,
            sink,
            last_digest: Mutex::new(None),
        }
    }

    pub fn last_digest(&self) -> Option<String> {
        self.last_digest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl<E: WorldExporter, K: ReportSink> Pipeline for WorldPipeline<E, K> {
    type Raw = String;

    fn name(&self) -> &str {
        "world"
    }

    async fn extract(&self) -> Result<Option<Extracted<String>>> {
        self.exporter.ensure_runtime().await?;
        let raw = self.exporter.export().await?;
        let digest = sha256_hex(&raw);

        if self.last_digest().as_deref() == Some(digest.as_str()) {
            tracing::info!("▶ No world change detected; skipping upload.");
            return Ok(None);
        }

        Ok(Some(Extracted {
            data: raw,
            fingerprint: Fingerprint::Digest(digest),
        }))
    }

    async fn transform(&self, raw: String) -> Result<ReportTable> {
        let world: serde_json::Value = serde_json::from_str(&raw)?;
        let totals = aggregate_chests(&world)?;
        tracing::info!("▶ {} item types found. Uploading…", totals.len());
        Ok(totals_table(&totals, chrono::Utc::now()))
    }

    async fn load(&self, table: ReportTable) -> Result<String> {
        let location = self.sink.publish(&table).await?;
        tracing::info!(
            "✔ Updated {} tab at {}",
            table.title,
            chrono::Utc::now().format("%H:%M:%S")
        );
        Ok(location)
    }

    fn commit(&self, fingerprint: Fingerprint) {
        if let Fingerprint::Digest(digest) = fingerprint {
            *self.last_digest.lock().unwrap_or_else(PoisonError::into_inner) = Some(digest);
        }
    }
}
