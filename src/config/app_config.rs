use serde::Deserialize;
use std::path::Path;

use crate::core::errors::{Result, SealroomError};

/// Current format version supported by this build of Sealroom.
pub const CURRENT_FORMAT_VERSION: u32 = 1;

/// Shortest accepted poll interval.
pub const MIN_INTERVAL_SECS: u64 = 5;

/// Written by `sealroom init`.
pub const DEFAULT_CONFIG: &str = r#"[sealroom]
format_version = 1

[room]
# server_url = "http://127.0.0.1:8080"
username = "Anonymous"

[poll]
interval_secs = 60

[audit]
enabled = true
log_file = "audit.log"
"#;

/// Top-level configuration read from `<data-dir>/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sealroom: SealroomSection,
    #[serde(default)]
    pub room: RoomSection,
    #[serde(default)]
    pub poll: PollSection,
    pub audit: Option<AuditSection>,
}

impl AppConfig {
    /// Load the configuration, falling back to defaults when the file
    /// does not exist yet.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path)?;
        Self::parse(&content)
    }

    /// Parse and validate config text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| SealroomError::InvalidConfig {
            detail: format!("Failed to parse config.toml: {e}"),
        })?;

        if config.sealroom.format_version > CURRENT_FORMAT_VERSION {
            return Err(SealroomError::FormatVersionTooNew {
                found: config.sealroom.format_version,
                supported: CURRENT_FORMAT_VERSION,
            });
        }

        if let Some(url) = &config.room.server_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(SealroomError::InvalidConfig {
                detail: format!("room.server_url must be an http(s) URL, got '{url}'"),
            });
        }

        if config.poll.interval_secs < MIN_INTERVAL_SECS {
            return Err(SealroomError::InvalidConfig {
                detail: format!(
                    "poll.interval_secs must be at least {MIN_INTERVAL_SECS}, got {}",
                    config.poll.interval_secs
                ),
            });
        }

        if let Some(audit) = &config.audit {
            crate::cli::context::validate_simple_filename(&audit.log_file, "audit log file")?;
        }

        Ok(config)
    }

    /// The room URL, required by `fetch`, `watch` and `send`.
    pub fn server_url(&self) -> Result<&str> {
        self.room
            .server_url
            .as_deref()
            .ok_or_else(|| SealroomError::InvalidConfig {
                detail: "room.server_url is not set.\n\n  \
                         Add it to config.toml under [room], e.g.\n    \
                         server_url = \"http://127.0.0.1:8080\""
                    .into(),
            })
    }
}

/// The `[sealroom]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SealroomSection {
    #[serde(default = "default_format_version")]
    pub format_version: u32,
}

impl Default for SealroomSection {
    fn default() -> Self {
        Self {
            format_version: default_format_version(),
        }
    }
}

fn default_format_version() -> u32 {
    1
}

/// The `[room]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RoomSection {
    pub server_url: Option<String>,
    #[serde(default = "default_username")]
    pub username: String,
    /// Sent verbatim as the `Cookie` header, for servers behind a gate.
    pub cookie: Option<String>,
}

impl Default for RoomSection {
    fn default() -> Self {
        Self {
            server_url: None,
            username: default_username(),
            cookie: None,
        }
    }
}

fn default_username() -> String {
    "Anonymous".to_string()
}

/// The `[poll]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PollSection {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

fn default_interval() -> u64 {
    60
}

/// The `[audit]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditSection {
    pub enabled: bool,
    pub log_file: String,
}
