use std::collections::HashMap;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use valheim_tracker::config::toml_config::TomlConfig;
use valheim_tracker::config::{load_env_files, DEFAULT_SHEET_NAME};
use valheim_tracker::core::{ConfigProvider, Role};
use valheim_tracker::utils::error::ErrorCategory;
use valheim_tracker::utils::validation::Validate;
use valheim_tracker::{OutputMode, RawSettings, TrackerConfig, TrackerError};

fn lookup(pairs: &[(&str, &str)]) -> RawSettings {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    RawSettings::from_lookup(|key| map.get(key).cloned())
}

#[test]
fn test_layers_resolve_in_precedence_order() {
    let file_layer = TomlConfig::from_toml_str(
        r#"
[tracker]
role = "host"
player_name = "FromToml"
interval_minutes = 15
sheet_name = "Toml Sheet"

[paths]
world_name = "Midgard.db"
world_save_dir = "/saves/worlds_local"
char_save_dir = "/saves/characters_local"
"#,
    )
    .unwrap()
    .into_settings();

    let env_layer = lookup(&[("ROLE", "player"), ("PLAYER_NAME", "Ragnar")]);
    let cli_layer = RawSettings {
        interval_minutes: Some("2".to_string()),
        output_mode: Some("csv".to_string()),
        ..RawSettings::default()
    };

    let merged = file_layer.overlay(env_layer).overlay(cli_layer);
    let config = TrackerConfig::from_settings(merged, std::path::Path::new("/opt/tracker")).unwrap();

    assert_eq!(config.role, Role::Player);
    assert_eq!(config.player_name, "Ragnar");
    assert_eq!(config.interval_minutes, 2);
    assert_eq!(config.sheet_name, "Toml Sheet");
    assert_eq!(config.output_mode, OutputMode::Csv);
    assert_eq!(config.jar_path, std::path::Path::new("/opt/tracker/valheim-save-tools.jar"));
    assert_eq!(
        config.player_file(),
        std::path::Path::new("/saves/characters_local/ragnar.fch")
    );
}

#[test]
fn test_missing_keys_are_reported_together() {
    let err = TrackerConfig::from_settings(
        lookup(&[("ROLE", "host"), ("WORLD_NAME", "Midgard.db")]),
        std::path::Path::new("."),
    )
    .unwrap_err();

    match &err {
        TrackerError::MissingConfigError { fields } => {
            assert_eq!(fields, &["PLAYER_NAME", "WORLD_SAVE_DIR", "CHAR_SAVE_DIR"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_host_validation_requires_converter_jar() {
    let dir = TempDir::new().unwrap();
    let worlds = dir.path().join("worlds_local");
    std::fs::create_dir_all(&worlds).unwrap();
    std::fs::write(worlds.join("Midgard.db"), b"db").unwrap();
    std::fs::write(dir.path().join("credentials.json"), b"{}").unwrap();

    let worlds_str = worlds.to_string_lossy().into_owned();
    let config = TrackerConfig::from_settings(
        lookup(&[
            ("ROLE", "Host"),
            ("WORLD_NAME", "Midgard.db"),
            ("PLAYER_NAME", "Ragnar"),
            ("WORLD_SAVE_DIR", &worlds_str),
            ("CHAR_SAVE_DIR", &worlds_str),
        ]),
        dir.path(),
    )
    .unwrap();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("valheim-save-tools.jar not found"));
    assert!(err.recovery_suggestion().contains("JAR_PATH"));

    std::fs::write(dir.path().join("valheim-save-tools.jar"), b"jar").unwrap();
    config.validate().unwrap();
    assert_eq!(config.sheet_name, DEFAULT_SHEET_NAME);
}

#[test]
fn test_player_does_not_need_world_files() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("reports");
    let out_str = out.to_string_lossy().into_owned();
    let config = TrackerConfig::from_settings(
        lookup(&[
            ("ROLE", "player"),
            ("WORLD_NAME", "Midgard.db"),
            ("PLAYER_NAME", "Ragnar"),
            ("WORLD_SAVE_DIR", "/nowhere/worlds"),
            ("CHAR_SAVE_DIR", "/nowhere/characters"),
            ("OUTPUT_MODE", "csv"),
            ("CSV_OUTPUT_DIR", &out_str),
        ]),
        dir.path(),
    )
    .unwrap();

    config.validate().unwrap();
}

#[test]
fn test_dotenv_file_populates_environment() {
    let mut env_file = NamedTempFile::new().unwrap();
    writeln!(env_file, "# tracker settings").unwrap();
    writeln!(env_file, "VT_IT_PLAYER_NAME=Ragnar").unwrap();
    writeln!(env_file, "VT_IT_INTERVAL=\"7\"").unwrap();

    let loaded = load_env_files(Some(env_file.path())).unwrap();
    assert_eq!(loaded, vec![env_file.path().to_path_buf()]);
    assert_eq!(std::env::var("VT_IT_PLAYER_NAME").unwrap(), "Ragnar");
    assert_eq!(std::env::var("VT_IT_INTERVAL").unwrap(), "7");

    let err = load_env_files(Some(std::path::Path::new("/definitely/missing/.env"))).unwrap_err();
    assert!(matches!(err, TrackerError::NotFoundError { .. }));
}
