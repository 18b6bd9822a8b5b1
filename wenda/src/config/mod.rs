//! Configuration for the `wenda` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/wenda/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;
use wenda_proto::calendar::{CalendarError, Week};
use wenda_proto::task::{MAX_TASK_CONTENT_LENGTH, UserId};

use crate::store::StoreOptions;
use crate::sync::DEFAULT_CHANNEL_CAPACITY;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The service URL is not a valid absolute URL.
    #[error("invalid service URL {url:?}: {source}")]
    InvalidUrl {
        /// Value as given.
        url: String,
        /// Parser error.
        source: url::ParseError,
    },

    /// The starting week is not a valid `YYYY-Www` value.
    #[error("invalid week: {0}")]
    InvalidWeek(#[from] CalendarError),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    service: ServiceFileConfig,
    sync: SyncFileConfig,
    agenda: AgendaFileConfig,
}

/// `[service]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServiceFileConfig {
    url: Option<String>,
    user: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[sync]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SyncFileConfig {
    channel_capacity: Option<usize>,
}

/// `[agenda]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct AgendaFileConfig {
    max_task_content_len: Option<usize>,
    week: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Service --
    /// Base URL of the task service. `None` runs offline.
    pub service_url: Option<Url>,
    /// User whose tasks are shown.
    pub user: UserId,
    /// Timeout for a single HTTP request.
    pub request_timeout: Duration,

    // -- Sync --
    /// Capacity of the sync request/outcome channels.
    pub channel_capacity: usize,

    // -- Agenda --
    /// Maximum task content length in characters.
    pub max_task_content_len: usize,
    /// Week selected at startup. `None` selects the current week.
    pub week: Option<Week>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            user: UserId::new("me"),
            request_timeout: Duration::from_secs(10),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_task_content_len: MAX_TASK_CONTENT_LENGTH,
            week: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// Otherwise the default path (`~/.config/wenda/config.toml`) is tried
    /// and silently ignored if missing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// or if the service URL or starting week is malformed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let service_url = cli
            .service_url
            .clone()
            .or_else(|| file.service.url.clone())
            .map(|raw| parse_service_url(&raw))
            .transpose()?;

        let week = match (cli.week, file.agenda.week.as_deref()) {
            (Some(week), _) => Some(week),
            (None, Some(raw)) => Some(raw.parse::<Week>()?),
            (None, None) => None,
        };

        Ok(Self {
            service_url,
            user: cli
                .user
                .clone()
                .or_else(|| file.service.user.clone())
                .map_or(defaults.user, UserId::new),
            request_timeout: file
                .service
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            channel_capacity: file
                .sync
                .channel_capacity
                .filter(|&n| n > 0)
                .unwrap_or(defaults.channel_capacity),
            max_task_content_len: file
                .agenda
                .max_task_content_len
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_task_content_len),
            week,
        })
    }

    /// Whether no service is configured.
    #[must_use]
    pub const fn is_offline(&self) -> bool {
        self.service_url.is_none()
    }

    /// Store settings derived from this configuration. An unset starting
    /// week resolves to the current week.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            week: self.week.unwrap_or_else(Week::current),
            max_content_len: self.max_task_content_len,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Weekly agenda with optimistic task sync")]
pub struct CliArgs {
    /// Base URL of the task service. Runs offline when unset.
    #[arg(long, env = "WENDA_SERVICE_URL")]
    pub service_url: Option<String>,

    /// User whose tasks are shown.
    #[arg(long, env = "WENDA_USER")]
    pub user: Option<String>,

    /// Path to config file (default: `~/.config/wenda/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Week to open, as `YYYY-Www` (default: the current week).
    #[arg(long)]
    pub week: Option<Week>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "WENDA_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/wenda.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn parse_service_url(raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
        url: raw.to_string(),
        source,
    })
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("wenda").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
