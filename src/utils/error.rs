use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Token signing failed: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Base64 decoding failed: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required .env keys: {}", fields.join(", "))]
    MissingConfigError { fields: Vec<String> },

    #[error("Invalid value for {field} ('{value}'): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{what} not found: {path}")]
    NotFoundError { what: String, path: String },

    #[error("Runtime unavailable: {message}")]
    RuntimeError { message: String },

    #[error("valheim-save-tools failed (exit {status}): {stderr}")]
    ExportError { status: i32, stderr: String },

    #[error("Decode error: {message}")]
    DecodeError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Google API returned {status}: {body}")]
    ApiError { status: u16, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Environment,
    SaveData,
    Network,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TrackerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeError {
            message: message.into(),
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>, path: impl Into<String>) -> Self {
        Self::NotFoundError {
            what: what.into(),
            path: path.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::RuntimeError { .. } | Self::ExportError { .. } | Self::NotFoundError { .. } => {
                ErrorCategory::Environment
            }
            Self::DecodeError { .. }
            | Self::ProcessingError { .. }
            | Self::Base64Error(_)
            | Self::SerializationError(_) => ErrorCategory::SaveData,
            Self::HttpError(_) | Self::ApiError { .. } | Self::JwtError(_) => {
                ErrorCategory::Network
            }
            Self::IoError(_) | Self::CsvError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // The game rewrites saves while running; a partial file usually
            // decodes fine on the next tick.
            Self::DecodeError { .. } | Self::ProcessingError { .. } | Self::Base64Error(_) => {
                ErrorSeverity::Medium
            }
            Self::HttpError(_) => ErrorSeverity::Medium,
            Self::ApiError { status, .. } if *status >= 500 || *status == 429 => {
                ErrorSeverity::Medium
            }
            Self::ApiError { .. } | Self::JwtError(_) => ErrorSeverity::High,
            Self::NotFoundError { .. } | Self::ExportError { .. } => ErrorSeverity::High,
            Self::SerializationError(_) | Self::CsvError(_) | Self::IoError(_) => {
                ErrorSeverity::High
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_)
            | Self::RuntimeError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingConfigError { .. } => {
                "Copy .env.example to .env and fill in the missing keys".to_string()
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } | Self::TomlError(_) => {
                "Check the .env file or --config TOML for typos".to_string()
            }
            Self::RuntimeError { .. } => {
                "Install Java 17+ (Temurin/OpenJDK) and ensure 'java' is on PATH, or set JAVA_BIN"
                    .to_string()
            }
            Self::ExportError { .. } => {
                "Make sure the world is not locked by the game and JAR_PATH points to valheim-save-tools.jar"
                    .to_string()
            }
            Self::NotFoundError { what, .. } => match what.as_str() {
                "valheim-save-tools.jar" => {
                    "Place the jar next to the executable or set JAR_PATH in .env".to_string()
                }
                "Google credentials JSON" => {
                    "Place credentials.json next to the executable or set GOOGLE_CREDS in .env"
                        .to_string()
                }
                _ => "Check WORLD_SAVE_DIR, CHAR_SAVE_DIR and the names in .env".to_string(),
            },
            Self::DecodeError { .. } | Self::ProcessingError { .. } | Self::Base64Error(_) => {
                "The save may be mid-write; it will be retried on the next tick".to_string()
            }
            Self::SerializationError(_) => {
                "The exported world JSON is malformed; try updating valheim-save-tools".to_string()
            }
            Self::HttpError(_) => "Check the network connection".to_string(),
            Self::ApiError { status, .. } if *status == 403 || *status == 404 => {
                "Share the spreadsheet with the service account's client_email".to_string()
            }
            Self::ApiError { .. } | Self::JwtError(_) => {
                "Verify the service-account credentials and that the Sheets and Drive APIs are enabled"
                    .to_string()
            }
            Self::IoError(_) | Self::CsvError(_) => {
                "Check file permissions and free disk space".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Environment => format!("Environment problem: {}", self),
            ErrorCategory::SaveData => format!("Could not read save data: {}", self),
            ErrorCategory::Network => format!("Could not reach Google: {}", self),
            ErrorCategory::Output => format!("Could not write report: {}", self),
        }
    }

    /// Exit code for the binary, derived from severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_listed_together() {
        let err = TrackerError::MissingConfigError {
            fields: vec!["ROLE".to_string(), "WORLD_NAME".to_string()],
        };
        assert_eq!(err.to_string(), "Missing required .env keys: ROLE, WORLD_NAME");
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_retryable_errors_are_medium() {
        assert_eq!(TrackerError::decode("short").severity(), ErrorSeverity::Medium);
        let throttled = TrackerError::ApiError {
            status: 429,
            body: String::new(),
        };
        assert_eq!(throttled.severity(), ErrorSeverity::Medium);
        let forbidden = TrackerError::ApiError {
            status: 403,
            body: String::new(),
        };
        assert_eq!(forbidden.severity(), ErrorSeverity::High);
        assert!(forbidden.recovery_suggestion().contains("client_email"));
    }

    #[test]
    fn test_not_found_suggestion_depends_on_target() {
        let jar = TrackerError::not_found("valheim-save-tools.jar", "/x/valheim-save-tools.jar");
        assert!(jar.recovery_suggestion().contains("JAR_PATH"));
        assert_eq!(
            jar.to_string(),
            "valheim-save-tools.jar not found: /x/valheim-save-tools.jar"
        );
    }
}
