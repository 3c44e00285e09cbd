use crate::config::RawSettings;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "valheim-tracker")]
#[command(about = "Tracks Valheim chest totals and player skills into Google Sheets")]
#[command(version)]
pub struct CliArgs {
    /// Optional TOML configuration file (lowest precedence)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Load this .env file instead of searching the working and executable directories
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Log process CPU and memory after each phase
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Override OUTPUT_MODE
    #[arg(long, value_enum, global = true)]
    pub output: Option<OutputArg>,

    /// Override CSV_OUTPUT_DIR
    #[arg(long, global = true)]
    pub csv_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    Sheets,
    Csv,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Poll the save files and publish changes (default)
    Watch {
        /// Override INTERVAL_MINUTES
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Run a single polling cycle and exit
    Once,
    /// Validate configuration without touching the saves or Google
    Check,
    /// Decode a character file and print its skills
    InspectSkills { file: PathBuf },
    /// Aggregate chest totals from an exported world JSON
    InspectWorld { file: PathBuf },
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Watch { interval: None })
    }

    /// Command-line overrides, the highest precedence layer.
    pub fn overrides(&self) -> RawSettings {
        let interval = match &self.command {
            Some(Command::Watch { interval }) => interval.map(|m| m.to_string()),
            _ => None,
        };

        RawSettings {
            interval_minutes: interval,
            output_mode: self.output.map(|o| match o {
                OutputArg::Sheets => "sheets".to_string(),
                OutputArg::Csv => "csv".to_string(),
            }),
            csv_output_dir: self.csv_dir.as_ref().map(|p| p.to_string_lossy().into_owned()),
            ..RawSettings::default()
        }
    }
}
