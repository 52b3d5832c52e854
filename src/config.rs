use std::fs::read_to_string;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(match value {
            "trace" => Self::Trace,
            "debug" => Self::Debug,
            "info" => Self::Info,
            "warn" => Self::Warn,
            "error" => Self::Error,
            _ => return Err(format!("unknown log level: {value}")),
        })
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl LogLevel {
    pub fn as_level(&self) -> log::Level {
        match *self {
            Self::Error => log::Level::Error,
            Self::Debug => log::Level::Debug,
            Self::Trace => log::Level::Trace,
            Self::Warn => log::Level::Warn,
            Self::Info => log::Level::Info,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Default, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub struct Log {
    #[serde(default)]
    pub level: LogLevel,
}

/// Settings for a `Client`: where to bootstrap from, how long a single RPC
/// may take, and how many times the dispatcher will chase a redirect before
/// giving up.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    ///
    /// Addresses probed, in order, when first connecting to the cluster.
    /// The first one to return a routing map wins.
    ///
    #[serde(default = "ClientConfig::default_bootstrap")]
    pub bootstrap: Vec<String>,
    ///
    /// Deadline applied to every individual RPC attempt, including cold
    /// connect probes.
    ///
    #[serde(default = "ClientConfig::default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    ///
    /// Maximum number of wrong-endpoint retries the dispatcher will chase
    /// (unary or streaming) before surfacing the last redirect status.
    ///
    #[serde(default = "ClientConfig::default_max_redirects")]
    pub max_redirects: u32,
    #[serde(default)]
    pub log: Log,
}

impl ClientConfig {
    fn default_bootstrap() -> Vec<String> {
        Vec::new()
    }

    fn default_call_timeout_secs() -> u64 {
        10
    }

    fn default_max_redirects() -> u32 {
        4
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bootstrap: Self::default_bootstrap(),
            call_timeout_secs: Self::default_call_timeout_secs(),
            max_redirects: Self::default_max_redirects(),
            log: Log::default(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    ///
    /// Path to a TOML config file. Falls back to defaults plus `--bootstrap`
    /// when omitted.
    ///
    #[arg(long, short)]
    config: Option<String>,
    ///
    /// One or more `host:port` bootstrap addresses; overrides the config
    /// file's `bootstrap` list when given.
    ///
    #[arg(long, short)]
    bootstrap: Vec<String>,
}

impl ClientConfig {
    /// Load configuration from an optional TOML file plus command line
    /// overrides.
    pub fn load() -> anyhow::Result<Self> {
        let cli = Cli::parse();
        let mut config = match &cli.config {
            Some(path) => toml::from_str::<Self>(&read_to_string(path)?)?,
            None => Self::default(),
        };
        if !cli.bootstrap.is_empty() {
            config.bootstrap = cli.bootstrap;
        }
        Ok(config)
    }
}
