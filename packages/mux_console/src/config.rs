use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Config (figment-deserialized from defaults / mux.toml / env vars)
// =============================================================================
//
//   mux.toml:   [streams]
//               logs_capacity = 500
//
//   env var:    MUX_STREAMS__LOGS_CAPACITY=500   (double underscore = nesting)

/// View holding the HTTP server's request log.
pub const LOGS_VIEW: &str = "logs";
/// View holding the operator console's prompts.
pub const CONSOLE_VIEW: &str = "cmd";
/// File name looked up in the config directory.
pub const CONFIG_FILE: &str = "mux.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown initial view '{0}' (expected 'logs' or 'cmd')")]
    UnknownInitialView(String),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Log level for the console's own tracing output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// `EnvFilter` directive scoping this level to our crates, the binary
    /// and the HTTP layer.
    pub fn directive(&self) -> String {
        let level = self.as_str();
        format!("muxconsole={level},mux_console={level},view_mux={level},tower_http={level}")
    }
}

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileConfig {
    /// View shown at startup (`logs` or `cmd`).
    #[serde(default = "default_initial_view")]
    pub initial_view: String,
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub streams: StreamsFileConfig,
    #[serde(default)]
    pub log: LogFileConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            initial_view: default_initial_view(),
            server: ServerFileConfig::default(),
            streams: StreamsFileConfig::default(),
            log: LogFileConfig::default(),
        }
    }
}

/// HTTP listener settings (lives under `[server]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// History sizes (lives under `[streams]`). Negative values select the
/// library default; zero keeps no history at all.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreamsFileConfig {
    #[serde(default = "default_logs_capacity")]
    pub logs_capacity: i64,
    #[serde(default)]
    pub console_capacity: i64,
}

impl Default for StreamsFileConfig {
    fn default() -> Self {
        Self {
            logs_capacity: default_logs_capacity(),
            console_capacity: 0,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogFileConfig {
    #[serde(default)]
    pub level: LogLevel,
}

fn default_initial_view() -> String {
    CONSOLE_VIEW.to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_logs_capacity() -> i64 {
    100
}

/// Command-line values that take priority over file and env configuration.
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub initial_view: Option<String>,
    pub debug: bool,
}

/// Build a figment that layers: defaults → mux.toml → MUX_* env vars.
pub fn load_config(config_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_dir.join(CONFIG_FILE)))
        .merge(Env::prefixed("MUX_").split("__"))
}

impl FileConfig {
    /// Extract from `figment`, apply CLI overrides and validate.
    pub fn resolve(figment: &figment::Figment, cli: &CliOverrides) -> Result<Self, ConfigError> {
        let mut config: FileConfig = figment.extract().map_err(Box::new)?;
        config.apply(cli);
        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, cli: &CliOverrides) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(view) = &cli.initial_view {
            self.initial_view = view.clone();
        }
        if cli.debug {
            self.log.level = LogLevel::Debug;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.initial_view.as_str() {
            LOGS_VIEW | CONSOLE_VIEW => Ok(()),
            other => Err(ConfigError::UnknownInitialView(other.to_string())),
        }
    }
}
