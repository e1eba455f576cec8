use std::net::Ipv6Addr;
use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use clap::Parser;
use std::fs;
use thiserror::Error;
use tracing::{info, warn};

/// Address the server binds to by default
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Port the server listens on by default
pub const DEFAULT_PORT: u16 = 8080;
/// Upper bound for one browser step, in seconds
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 30;
/// Server the CLI talks to when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

const DATABASE_FILE: &str = "juggernaut.db";
const CONFIG_FILE: &str = "config.toml";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the Juggernaut server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// URL (path) of the SQLite database
    pub database_url: String,
    /// Address to bind the HTTP listener to
    pub host: String,
    /// Port to bind the HTTP listener to
    pub port: u16,
    /// Chromium binary for RPA runs; looked up on PATH when unset
    pub chromium_path: Option<PathBuf>,
    /// Upper bound for a single browser step, in seconds
    pub step_timeout_secs: u64,
    /// Directory for daily rolling log files; stdout only when unset
    pub log_dir: Option<PathBuf>,
}

/// Update structure for Config with all fields optional
///
/// This is the shape of `config.toml`. `server_url` is read only by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub chromium_path: Option<PathBuf>,
    #[serde(default)]
    pub step_timeout_secs: Option<u64>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Server URL for the CLI
    #[serde(default)]
    pub server_url: Option<String>,
}

/// Command line arguments for the server
#[derive(Parser, Debug, Default)]
#[clap(name = "juggernaut", about = "Plugin-based automation bot server")]
pub struct CliArgs {
    /// Database URL
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Address to bind to
    #[clap(long, env = "JUGGERNAUT_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[clap(long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to the Chromium binary used for RPA tasks
    #[clap(long, env = "JUGGERNAUT_CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Timeout for a single browser step, in seconds
    #[clap(long, env = "JUGGERNAUT_STEP_TIMEOUT_SECS")]
    pub step_timeout_secs: Option<u64>,

    /// Directory for rolling log files
    #[clap(long, env = "JUGGERNAUT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Debug mode
    #[clap(long, env = "JUGGERNAUT_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[clap(long, env = "JUGGERNAUT_LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Config {
    /// Applies a config update to the current configuration
    pub fn apply_update(self, update: ConfigUpdate) -> Self {
        Self {
            database_url: update.database_url.unwrap_or(self.database_url),
            host: update.host.unwrap_or(self.host),
            port: update.port.unwrap_or(self.port),
            chromium_path: update.chromium_path.or(self.chromium_path),
            step_timeout_secs: update.step_timeout_secs.unwrap_or(self.step_timeout_secs),
            log_dir: update.log_dir.or(self.log_dir),
        }
    }

    /// Returns the step timeout as a Duration
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    /// `host:port` for the listener, with IPv6 literals in brackets
    pub fn bind_address(&self) -> String {
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Rejects values the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid("database_url must not be empty".to_string()));
        }
        if self.step_timeout_secs == 0 {
            return Err(ConfigError::Invalid("step_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Returns the platform config directory, if it exists
pub fn get_config_dir_path() -> Option<PathBuf> {
    let path = match ProjectDirs::from("com", "juggernaut", "juggernaut") {
        Some(proj_dirs) => proj_dirs.config_dir().to_path_buf(),
        None => {
            warn!("Could not determine XDG config directory, skipping config file");
            return None;
        }
    };

    if !path.exists() {
        info!("Config path not found at {:?}, using defaults", path);
        return None;
    }

    Some(path)
}

/// Returns the base (default) configuration
///
/// The database lives in the config directory when there is one, and in
/// the working directory otherwise.
pub fn base_config(config_dir: Option<PathBuf>) -> Config {
    let database_url = config_dir.map_or(DATABASE_FILE.to_string(), |path| {
        path.join(DATABASE_FILE).to_string_lossy().to_string()
    });

    Config {
        database_url,
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_PORT,
        chromium_path: None,
        step_timeout_secs: DEFAULT_STEP_TIMEOUT_SECS,
        log_dir: None,
    }
}

/// Loads configuration from a TOML file
///
/// A missing file (or no path at all) yields an empty update.
pub fn config_from_file(config_path: Option<PathBuf>) -> Result<ConfigUpdate, ConfigError> {
    let Some(config_path) = config_path else {
        return Ok(ConfigUpdate::default());
    };

    if !config_path.exists() {
        info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(ConfigUpdate::default());
    }

    let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;

    let update = toml::from_str::<ConfigUpdate>(&content).map_err(|source| ConfigError::Parse {
        path: config_path.clone(),
        source,
    })?;

    info!("Loaded configuration from {:?}", config_path);
    Ok(update)
}

/// Loads configuration from command line arguments
pub fn config_from_args(args: &CliArgs) -> ConfigUpdate {
    ConfigUpdate {
        database_url: args.database_url.clone(),
        host: args.host.clone(),
        port: args.port,
        chromium_path: args.chromium_path.clone(),
        step_timeout_secs: args.step_timeout_secs,
        log_dir: args.log_dir.clone(),
        server_url: None,
    }
}

/// Gets the complete configuration by combining defaults with
/// values from config file, environment variables, and command line arguments
/// in order of increasing precedence
pub fn get_config(args: &CliArgs) -> Result<Config, ConfigError> {
    let config_dir = get_config_dir_path();
    let config_file = config_dir.as_ref().map(|dir| dir.join(CONFIG_FILE));

    let config = base_config(config_dir)
        .apply_update(config_from_file(config_file)?)
        .apply_update(config_from_args(args));

    config.validate()?;

    info!(
        "Final configuration: database_url={}, bind={}, step_timeout={}s, chromium={:?}, log_dir={:?}",
        config.database_url,
        config.bind_address(),
        config.step_timeout_secs,
        config.chromium_path,
        config.log_dir
    );

    Ok(config)
}

/// Resolves the server URL for the CLI
///
/// Precedence: CLI flag / env var > config file > default
pub fn resolve_server_url(cli_url: Option<String>) -> String {
    if let Some(url) = cli_url {
        return url;
    }

    let config_file = get_config_dir_path().map(|dir| dir.join(CONFIG_FILE));
    match config_from_file(config_file) {
        Ok(update) => update.server_url.unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
        Err(e) => {
            warn!("{}", e);
            DEFAULT_SERVER_URL.to_string()
        }
    }
}
