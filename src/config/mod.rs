#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::{ConfigProvider, Role};
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::{
    validate_exists, validate_path, validate_range, validate_required_keys, Validate,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_SHEET_NAME: &str = "Valheim LAN Stats";
pub const JAR_FILE_NAME: &str = "valheim-save-tools.jar";
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Sheets,
    Csv,
}

impl FromStr for OutputMode {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sheets" | "google" => Ok(OutputMode::Sheets),
            "csv" => Ok(OutputMode::Csv),
            other => Err(TrackerError::InvalidConfigValueError {
                field: "OUTPUT_MODE".to_string(),
                value: other.to_string(),
                reason: "expected 'sheets' or 'csv'".to_string(),
            }),
        }
    }
}

/// Unresolved settings from one layer (TOML, environment or CLI).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSettings {
    pub role: Option<String>,
    pub world_name: Option<String>,
    pub player_name: Option<String>,
    pub world_save_dir: Option<String>,
    pub char_save_dir: Option<String>,
    pub interval_minutes: Option<String>,
    pub sheet_name: Option<String>,
    pub jar_path: Option<String>,
    pub google_creds: Option<String>,
    pub java_bin: Option<String>,
    pub world_json_out: Option<String>,
    pub output_mode: Option<String>,
    pub csv_output_dir: Option<String>,
}

impl RawSettings {
    /// Reads the documented variables through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            role: get("ROLE"),
            world_name: get("WORLD_NAME"),
            player_name: get("PLAYER_NAME"),
            world_save_dir: get("WORLD_SAVE_DIR"),
            char_save_dir: get("CHAR_SAVE_DIR"),
            interval_minutes: get("INTERVAL_MINUTES"),
            sheet_name: get("SHEET_NAME"),
            jar_path: get("JAR_PATH"),
            google_creds: get("GOOGLE_CREDS"),
            java_bin: get("JAVA_BIN"),
            world_json_out: get("WORLD_JSON_OUT"),
            output_mode: get("OUTPUT_MODE"),
            csv_output_dir: get("CSV_OUTPUT_DIR"),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Values set in `top` win over `self`.
    pub fn overlay(self, top: RawSettings) -> RawSettings {
        RawSettings {
            role: top.role.or(self.role),
            world_name: top.world_name.or(self.world_name),
            player_name: top.player_name.or(self.player_name),
            world_save_dir: top.world_save_dir.or(self.world_save_dir),
            char_save_dir: top.char_save_dir.or(self.char_save_dir),
            interval_minutes: top.interval_minutes.or(self.interval_minutes),
            sheet_name: top.sheet_name.or(self.sheet_name),
            jar_path: top.jar_path.or(self.jar_path),
            google_creds: top.google_creds.or(self.google_creds),
            java_bin: top.java_bin.or(self.java_bin),
            world_json_out: top.world_json_out.or(self.world_json_out),
            output_mode: top.output_mode.or(self.output_mode),
            csv_output_dir: top.csv_output_dir.or(self.csv_output_dir),
        }
    }
}

/// Directory holding the running executable; falls back to the working directory.
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Loads `.env` files without overriding variables already in the environment.
/// Returns the files that were found.
pub fn load_env_files(explicit: Option<&Path>) -> Result<Vec<PathBuf>> {
    let candidates: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd.join(".env"));
            }
            paths.push(exe_dir().join(".env"));
            paths.dedup();
            paths
        }
    };

    let mut loaded = Vec::new();
    for path in candidates {
        if !path.exists() {
            if explicit.is_some() {
                return Err(TrackerError::not_found("Environment file", path.display().to_string()));
            }
            continue;
        }
        dotenvy::from_path(&path).map_err(|e| {
            TrackerError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded environment from {}", path.display());
        loaded.push(path);
    }
    Ok(loaded)
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackerConfig {
    pub role: Role,
    pub world_name: String,
    pub player_name: String,
    pub world_save_dir: PathBuf,
    pub char_save_dir: PathBuf,
    pub interval_minutes: u64,
    pub sheet_name: String,
    pub jar_path: PathBuf,
    pub google_creds: PathBuf,
    pub java_bin: String,
    pub world_json_out: PathBuf,
    pub output_mode: OutputMode,
    pub csv_output_dir: PathBuf,
    world_file: PathBuf,
    player_file: PathBuf,
}

impl TrackerConfig {
    /// Resolves merged settings; `base_dir` anchors the jar and credentials defaults.
    pub fn from_settings(raw: RawSettings, base_dir: &Path) -> Result<Self> {
        let role_raw = raw.role.clone().unwrap_or_default();
        let world_name = raw.world_name.clone().unwrap_or_default();
        let player_name = raw.player_name.clone().unwrap_or_default();
        let world_save_dir = raw.world_save_dir.clone().unwrap_or_default();
        let char_save_dir = raw.char_save_dir.clone().unwrap_or_default();

        validate_required_keys(&[
            ("ROLE", role_raw.as_str()),
            ("WORLD_NAME", world_name.as_str()),
            ("PLAYER_NAME", player_name.as_str()),
            ("WORLD_SAVE_DIR", world_save_dir.as_str()),
            ("CHAR_SAVE_DIR", char_save_dir.as_str()),
        ])?;

        let role = role_raw
            .parse::<Role>()
            .map_err(|reason| TrackerError::InvalidConfigValueError {
                field: "ROLE".to_string(),
                value: role_raw.clone(),
                reason,
            })?;

        let interval_minutes = match raw.interval_minutes.as_deref() {
            Some(value) => value.trim().parse::<u64>().map_err(|e| {
                TrackerError::InvalidConfigValueError {
                    field: "INTERVAL_MINUTES".to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                }
            })?,
            None => DEFAULT_INTERVAL_MINUTES,
        };

        let output_mode = match raw.output_mode.as_deref() {
            Some(mode) => mode.parse()?,
            None => OutputMode::Sheets,
        };

        let world_save_dir = PathBuf::from(world_save_dir);
        let char_save_dir = PathBuf::from(char_save_dir);
        let world_file = world_save_dir.join(&world_name);
        let player_file = char_save_dir.join(format!("{}.fch", player_name).to_lowercase());

        let world_json_out = raw.world_json_out.map(PathBuf::from).unwrap_or_else(|| {
            std::env::var_os("TEMP")
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.to_path_buf())
                .join("world.json")
        });

        Ok(Self {
            role,
            world_name,
            player_name,
            world_save_dir,
            char_save_dir,
            interval_minutes,
            sheet_name: raw.sheet_name.unwrap_or_else(|| DEFAULT_SHEET_NAME.to_string()),
            jar_path: raw
                .jar_path
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join(JAR_FILE_NAME)),
            google_creds: raw
                .google_creds
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join(CREDENTIALS_FILE_NAME)),
            java_bin: raw.java_bin.unwrap_or_else(|| "java".to_string()),
            world_json_out,
            output_mode,
            csv_output_dir: raw
                .csv_output_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./output")),
            world_file,
            player_file,
        })
    }

    /// Checks run before every host export: the game may move or lock files.
    pub fn validate_host_paths(&self) -> Result<()> {
        validate_exists("WORLD_SAVE_DIR", &self.world_save_dir)?;
        validate_exists("World file", &self.world_file)?;
        validate_exists(JAR_FILE_NAME, &self.jar_path)?;
        Ok(())
    }

    pub fn validate_output(&self) -> Result<()> {
        match self.output_mode {
            OutputMode::Sheets => validate_exists("Google credentials JSON", &self.google_creds),
            OutputMode::Csv => {
                validate_path("CSV_OUTPUT_DIR", &self.csv_output_dir.to_string_lossy())
            }
        }
    }
}

impl Validate for TrackerConfig {
    fn validate(&self) -> Result<()> {
        validate_range("INTERVAL_MINUTES", self.interval_minutes, 1, 24 * 60)?;
        validate_path("java_bin", &self.java_bin)?;
        self.validate_output()?;
        if self.role == Role::Host {
            self.validate_host_paths()?;
        }
        Ok(())
    }
}

impl ConfigProvider for TrackerConfig {
    fn role(&self) -> Role {
        self.role
    }

    fn player_name(&self) -> &str {
        &self.player_name
    }

    fn player_file(&self) -> &Path {
        &self.player_file
    }

    fn world_file(&self) -> &Path {
        &self.world_file
    }

    fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

impl<C: ConfigProvider + ?Sized> ConfigProvider for std::sync::Arc<C> {
    fn role(&self) -> Role {
        (**self).role()
    }

    fn player_name(&self) -> &str {
        (**self).player_name()
    }

    fn player_file(&self) -> &Path {
        (**self).player_file()
    }

    fn world_file(&self) -> &Path {
        (**self).world_file()
    }

    fn sheet_name(&self) -> &str {
        (**self).sheet_name()
    }

    fn interval(&self) -> Duration {
        (**self).interval()
    }
}
