use crate::core::WorldExporter;
use crate::utils::error::{Result, TrackerError};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Runs `valheim-save-tools.jar` to convert the world `.db` into JSON.
#[derive(Debug, Clone)]
pub struct JarWorldExporter {
    java_bin: String,
    jar_path: PathBuf,
    world_path: PathBuf,
    json_out: PathBuf,
}

impl JarWorldExporter {
    pub fn new(
        java_bin: impl Into<String>,
        jar_path: impl Into<PathBuf>,
        world_path: impl Into<PathBuf>,
        json_out: impl Into<PathBuf>,
    ) -> Self {
        Self {
            java_bin: java_bin.into(),
            jar_path: jar_path.into(),
            world_path: world_path.into(),
            json_out: json_out.into(),
        }
    }

    fn java_missing(&self) -> TrackerError {
        TrackerError::RuntimeError {
            message: format!(
                "Java not found ('{}'). Install Java 17+ (Temurin/OpenJDK) and ensure 'java' is on PATH.",
                self.java_bin
            ),
        }
    }
}

#[async_trait]
impl WorldExporter for JarWorldExporter {
    async fn ensure_runtime(&self) -> Result<()> {
        // `java -version` prints to stderr on most JREs; only the exit code matters.
        let status = Command::new(&self.java_bin)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|_| self.java_missing())?;

        if status.success() {
            Ok(())
        } else {
            Err(self.java_missing())
        }
    }

    async fn export(&self) -> Result<String> {
        tracing::debug!(
            "Exporting {} -> {}",
            self.world_path.display(),
            self.json_out.display()
        );

        let output = Command::new(&self.java_bin)
            .arg("-jar")
            .arg(&self.jar_path)
            .arg(&self.world_path)
            .arg(&self.json_out)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|_| self.java_missing())?;

        if !output.status.success() {
            return Err(TrackerError::ExportError {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(tokio::fs::read_to_string(&self.json_out).await?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn fake_java(dir: &TempDir, body: &str) -> String {
        let path = dir.path().join("java");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_export_reads_converter_output() {
        let dir = TempDir::new().unwrap();
        let java = fake_java(
            &dir,
            r#"[ "$1" = "-version" ] && exit 0
printf '{"zdoList":[]}' > "$4""#,
        );
        let out = dir.path().join("world.json");
        let exporter = JarWorldExporter::new(java, "tools.jar", "Midgard.db", &out);

        exporter.ensure_runtime().await.unwrap();
        assert_eq!(exporter.export().await.unwrap(), r#"{"zdoList":[]}"#);
    }

    #[tokio::test]
    async fn test_export_failure_carries_stderr() {
        let dir = TempDir::new().unwrap();
        let java = fake_java(&dir, "echo 'world locked' >&2\nexit 4");
        let exporter = JarWorldExporter::new(java, "tools.jar", "Midgard.db", dir.path().join("w.json"));

        match exporter.export().await.unwrap_err() {
            TrackerError::ExportError { status, stderr } => {
                assert_eq!(status, 4);
                assert_eq!(stderr, "world locked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_java_is_runtime_error() {
        let exporter = JarWorldExporter::new(
            "/nonexistent/bin/java",
            "tools.jar",
            "Midgard.db",
            "world.json",
        );
        let err = exporter.ensure_runtime().await.unwrap_err();
        assert!(matches!(err, TrackerError::RuntimeError { .. }));
        assert!(err.to_string().contains("Java 17+"));
    }

    #[tokio::test]
    async fn test_failing_version_check() {
        let dir = TempDir::new().unwrap();
        let java = fake_java(&dir, "exit 1");
        let exporter = JarWorldExporter::new(java, "tools.jar", "Midgard.db", "world.json");
        assert!(exporter.ensure_runtime().await.is_err());
    }
}
