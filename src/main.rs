use anyhow::Context;
use clap::Parser;
use valheim_tracker::config::cli::Command;
use valheim_tracker::config::toml_config::TomlConfig;
use valheim_tracker::config::{exe_dir, load_env_files};
use valheim_tracker::core::skills::decode_skills;
use valheim_tracker::core::world::aggregate_chests;
use valheim_tracker::core::{ConfigProvider, Role, WorldExporter};
use valheim_tracker::utils::logger::{init_logger, LogFormat};
use valheim_tracker::utils::validation::Validate;
use valheim_tracker::{
    build_sink, build_tracker, CliArgs, JarWorldExporter, OutputMode, RawSettings, TrackerConfig, TrackerError,
};

fn fail(e: &TrackerError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

fn resolve_config(args: &CliArgs) -> Result<TrackerConfig, TrackerError> {
    let loaded = load_env_files(args.env_file.as_deref())?;
    if loaded.is_empty() {
        tracing::warn!("⚠ No .env found next to the executable or in the working directory; copy .env.example to .env to configure the tracker.");
    }

    let file_layer = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path.display());
            TomlConfig::from_file(path)?.into_settings()
        }
        None => RawSettings::default(),
    };

    let settings = file_layer
        .overlay(RawSettings::from_env())
        .overlay(args.overrides());
    let config = TrackerConfig::from_settings(settings, &exe_dir())?;
    config.validate()?;
    Ok(config)
}

fn display_config_summary(config: &TrackerConfig) {
    println!("📋 Configuration Summary:");
    println!("  Role: {}", config.role);
    println!("  Player: {}", config.player_name);
    println!("  World save dir: {}", config.world_save_dir.display());
    println!("  Character save dir: {}", config.char_save_dir.display());
    println!("  Interval: {} min", config.interval_minutes);
    println!("  Output: {:?}", config.output_mode);
    match config.output_mode {
        OutputMode::Sheets => {
            println!("  Spreadsheet: {}", config.sheet_name);
            println!("  Credentials: {}", config.google_creds.display());
        }
        OutputMode::Csv => {
            println!("  CSV directory: {}", config.csv_output_dir.display());
        }
    }
    if config.role == Role::Host {
        println!("  Converter jar: {}", config.jar_path.display());
        println!("  Java: {}", config.java_bin);
    }
}

fn inspect_skills(path: &std::path::Path) -> anyhow::Result<()> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let skills = decode_skills(&data)?;
    for (skill, level) in &skills {
        println!("{:<16} {:>7.2}", skill, level);
    }
    println!("✔ {} skills", skills.len());
    Ok(())
}

fn inspect_world(path: &std::path::Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let world: serde_json::Value = serde_json::from_str(&raw).context("parsing world JSON")?;
    let totals = aggregate_chests(&world)?;

    let mut sorted: Vec<_> = totals.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (item, count) in sorted {
        println!("{:<28} {:>8}", item, count);
    }
    println!("✔ {} item types", totals.len());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let format = if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_logger(format, args.verbose);

    tracing::info!("🚀 Starting valheim-tracker");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    match args.command() {
        Command::InspectSkills { file } => return inspect_skills(&file),
        Command::InspectWorld { file } => return inspect_world(&file),
        _ => {}
    }

    let config = resolve_config(&args).unwrap_or_else(|e| fail(&e));
    tracing::info!("✅ Configuration loaded and validated successfully");

    match args.command() {
        Command::Check => {
            display_config_summary(&config);
            if config.role == Role::Host {
                let exporter = JarWorldExporter::new(
                    config.java_bin.clone(),
                    config.jar_path.clone(),
                    config.world_file().to_path_buf(),
                    config.world_json_out.clone(),
                );
                if let Err(e) = exporter.ensure_runtime().await {
                    fail(&e);
                }
                println!("✔ Java runtime found");
            }
            println!("✔ Configuration OK");
        }
        Command::Once => {
            let sink = build_sink(&config).unwrap_or_else(|e| fail(&e));
            let tracker = build_tracker(config, sink, args.monitor);
            tracker.log_banner();
            let report = tracker.tick().await;
            for (pipeline, outcome) in &report.outcomes {
                tracing::info!("✔ [{}] {:?}", pipeline, outcome);
            }
            let code = report.exit_code();
            if code > 0 {
                std::process::exit(code);
            }
        }
        Command::Watch { .. } => {
            if args.monitor {
                tracing::info!("🔍 System monitoring enabled");
            }
            let sink = build_sink(&config).unwrap_or_else(|e| fail(&e));
            let tracker = build_tracker(config, sink, args.monitor);
            tracker.run().await;
        }
        Command::InspectSkills { .. } | Command::InspectWorld { .. } => {}
    }

    Ok(())
}
