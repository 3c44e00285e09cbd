use crate::config::RawSettings;
use crate::utils::error::{Result, TrackerError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional file-based configuration, lowest precedence layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub tracker: TrackerSection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerSection {
    pub role: Option<String>,
    pub player_name: Option<String>,
    pub interval_minutes: Option<u64>,
    pub sheet_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsSection {
    pub world_name: Option<String>,
    pub world_save_dir: Option<String>,
    pub char_save_dir: Option<String>,
    pub jar_path: Option<String>,
    pub google_creds: Option<String>,
    pub java_bin: Option<String>,
    pub world_json_out: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSection {
    pub mode: Option<String>,
    pub csv_dir: Option<String>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(TrackerError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as-is.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| TrackerError::config(format!("placeholder pattern: {}", e)))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn into_settings(self) -> RawSettings {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        RawSettings {
            role: non_empty(self.tracker.role),
            world_name: non_empty(self.paths.world_name),
            player_name: non_empty(self.tracker.player_name),
            world_save_dir: non_empty(self.paths.world_save_dir),
            char_save_dir: non_empty(self.paths.char_save_dir),
            interval_minutes: self.tracker.interval_minutes.map(|m| m.to_string()),
            sheet_name: non_empty(self.tracker.sheet_name),
            jar_path: non_empty(self.paths.jar_path),
            google_creds: non_empty(self.paths.google_creds),
            java_bin: non_empty(self.paths.java_bin),
            world_json_out: non_empty(self.paths.world_json_out),
            output_mode: non_empty(self.output.mode),
            csv_output_dir: non_empty(self.output.csv_dir),
        }
    }
}
