use crate::core::skills::{decode_skills, skills_table};
use crate::core::{ConfigProvider, Extracted, Fingerprint, Pipeline, ReportSink, ReportTable, Storage};
use crate::utils::error::{Result, TrackerError};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

/// Player-side pipeline: character file -> skill levels -> `<player>` tab.
pub struct SkillsPipeline<S: Storage, C: ConfigProvider, K: ReportSink> {
    storage: S,
    config: C,
    sink: K,
    last_modified: Mutex<Option<SystemTime>>,
}

impl<S: Storage, C: ConfigProvider, K: ReportSink> SkillsPipeline<S, C, K> {
    pub fn new(storage: S, config: C, sink: K) -> Self {
        Self {
            storage,
            config,
            sink,
            last_modified: Mutex::new(None),
        }
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        *self.last_modified.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, K: ReportSink> Pipeline for SkillsPipeline<S, C, K> {
    type Raw = Vec<u8>;

    fn name(&self) -> &str {
        "skills"
    }

    async fn extract(&self) -> Result<Option<Extracted<Vec<u8>>>> {
        let path = self.config.player_file().to_string_lossy().into_owned();
        let player = self.config.player_name();

        let Some(modified) = self.storage.modified(&path).await? else {
            return Err(TrackerError::not_found("Character file", path));
        };

        if self.last_modified() == Some(modified) {
            tracing::info!("▶ No new save yet for {}, skipping upload.", player);
            return Ok(None);
        }

        tracing::info!("▶ Detected new save for {}, reading updated data...", player);
        let data = self.storage.read_file(&path).await?;

        Ok(Some(Extracted {
            data,
            fingerprint: Fingerprint::Modified(modified),
        }))
    }

    async fn transform(&self, raw: Vec<u8>) -> Result<ReportTable> {
        let skills = decode_skills(&raw)?;
        Ok(skills_table(self.config.player_name(), &skills, chrono::Utc::now()))
    }

    async fn load(&self, table: ReportTable) -> Result<String> {
        let location = self.sink.publish(&table).await?;
        tracing::info!(
            "✔ Uploaded {} skills to {} at {}",
            table.rows.len(),
            table.title,
            chrono::Utc::now().format("%H:%M:%S")
        );
        Ok(location)
    }

    fn commit(&self, fingerprint: Fingerprint) {
        if let Fingerprint::Modified(modified) = fingerprint {
            *self.last_modified.lock().unwrap_or_else(PoisonError::into_inner) = Some(modified);
        }
    }

    fn publish_when_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::etl::{CycleOutcome, TrackerEngine};
    use crate::core::Role;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, (Vec<u8>, SystemTime)>>>,
    }

    impl MockStorage {
        fn put(&self, path: &str, data: Vec<u8>, secs: u64) {
            let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(secs);
            self.files.lock().unwrap().insert(path.to_string(), (data, stamp));
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().unwrap();
            files.get(path).map(|(data, _)| data.clone()).ok_or_else(|| {
                TrackerError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.put(path, data.to_vec(), 0);
            Ok(())
        }

        async fn modified(&self, path: &str) -> Result<Option<SystemTime>> {
            Ok(self.files.lock().unwrap().get(path).map(|(_, stamp)| *stamp))
        }
    }

    struct MockConfig {
        player_file: PathBuf,
        world_file: PathBuf,
    }

    impl ConfigProvider for MockConfig {
        fn role(&self) -> Role {
            Role::Player
        }

        fn player_name(&self) -> &str {
            "Ragnar"
        }

        fn player_file(&self) -> &Path {
            &self.player_file
        }

        fn world_file(&self) -> &Path {
            &self.world_file
        }

        fn sheet_name(&self) -> &str {
            "Valheim LAN Stats"
        }

        fn interval(&self) -> Duration {
            Duration::from_secs(300)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<ReportTable>>,
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn publish(&self, table: &ReportTable) -> Result<String> {
            self.published.lock().unwrap().push(table.clone());
            Ok(format!("mock/{}", table.title))
        }
    }

    fn skills_bytes(levels: &[(i32, f32)]) -> Vec<u8> {
        let mut data = vec![0xFF; 5];
        for (id, level) in levels {
            data.extend_from_slice(&id.to_le_bytes());
            data.extend_from_slice(&level.to_le_bytes());
            data.extend_from_slice(&0.25f32.to_le_bytes());
        }
        data.extend_from_slice(&[0xFF; 16]);
        data
    }

    fn pipeline(
        storage: MockStorage,
        sink: Arc<RecordingSink>,
    ) -> SkillsPipeline<MockStorage, MockConfig, Arc<RecordingSink>> {
        let config = MockConfig {
            player_file: PathBuf::from("/saves/characters/ragnar.fch"),
            world_file: PathBuf::from("/saves/worlds/Midgard.db"),
        };
        SkillsPipeline::new(storage, config, sink)
    }

    #[tokio::test]
    async fn test_publishes_only_when_mtime_changes() {
        let storage = MockStorage::default();
        storage.put("/saves/characters/ragnar.fch", skills_bytes(&[(1, 15.0), (7, 22.5)]), 100);
        let sink = Arc::new(RecordingSink::default());
        let engine = TrackerEngine::new(pipeline(storage.clone(), sink.clone()));

        assert_eq!(
            engine.run_once().await.unwrap(),
            CycleOutcome::Published("mock/Ragnar".to_string())
        );
        assert_eq!(engine.run_once().await.unwrap(), CycleOutcome::Unchanged);

        storage.put("/saves/characters/ragnar.fch", skills_bytes(&[(1, 16.0), (7, 22.5)]), 200);
        assert!(matches!(engine.run_once().await.unwrap(), CycleOutcome::Published(_)));

        let published = sink.published.lock().unwrap();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].title, "Ragnar");
        assert_eq!(published[0].rows[0][0], "Axes");
        assert_eq!(published[0].rows[1][0], "Swords");
        assert_eq!(published[1].rows[1][1], 16.0);
    }

    #[tokio::test]
    async fn test_missing_character_file() {
        let sink = Arc::new(RecordingSink::default());
        let engine = TrackerEngine::new(pipeline(MockStorage::default(), sink));

        let err = engine.run_once().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Character file not found: /saves/characters/ragnar.fch"
        );
    }

    #[tokio::test]
    async fn test_undecodable_save_is_retried() {
        let storage = MockStorage::default();
        storage.put("/saves/characters/ragnar.fch", vec![0xFF; 40], 100);
        let sink = Arc::new(RecordingSink::default());
        let engine = TrackerEngine::new(pipeline(storage.clone(), sink.clone()));

        assert!(engine.run_once().await.is_err());
        assert!(engine.pipeline().last_modified().is_none());

        storage.put("/saves/characters/ragnar.fch", skills_bytes(&[(102, 3.0)]), 100);
        assert!(matches!(engine.run_once().await.unwrap(), CycleOutcome::Published(_)));
        assert_eq!(sink.published.lock().unwrap()[0].rows[0][0], "Run");
    }
}
