//! Logging System
//!
//! Structured logging built on `tracing`. Level, format and destination come from the
//! `[logging]` config table and can be overridden through `REVGEOM_LOG*` variables.

use crate::error::RegenError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Line format of emitted records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "invalid log format '{}' (expected text or json)",
                other
            )),
        }
    }
}

/// Where records go; `Both` writes to stderr and the log file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
    Both,
}

impl LogOutput {
    fn writes_file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(LogOutput::Stdout),
            "stderr" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            other => Err(format!(
                "invalid log output '{}' (expected stdout, stderr, file or both)",
                other
            )),
        }
    }
}

/// `[logging]` config table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error or off
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Used when `output` is `file` or `both`; relative paths resolve against the workspace
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// ANSI colors for text records on a terminal stream
    #[serde(default = "default_color")]
    pub color: bool,

    /// Per-module levels, e.g. `revgeom::store = "trace"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(".revgeom/revgeom.log")
}

fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file: default_log_file(),
            color: default_color(),
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Logging switched off entirely
    pub fn silent() -> Self {
        Self {
            level: "off".to_string(),
            ..Self::default()
        }
    }

    pub fn is_known_level(level: &str) -> bool {
        LEVELS.contains(&level)
    }

    /// Anchor a relative log file at `workspace_root`
    pub fn resolve_file(&mut self, workspace_root: &Path) {
        if self.file.is_relative() {
            self.file = workspace_root.join(&self.file);
        }
    }
}

/// Install the global subscriber
///
/// Environment variables (`REVGEOM_LOG`, `REVGEOM_LOG_FORMAT`, `REVGEOM_LOG_OUTPUT`,
/// `REVGEOM_LOG_MODULES`) take precedence over `config`. Fails if a subscriber is
/// already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), RegenError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = build_filter(config)?;
    let format = env_override("REVGEOM_LOG_FORMAT")?.unwrap_or(config.format);
    let output = env_override("REVGEOM_LOG_OUTPUT")?.unwrap_or(config.output);

    let writer = match output {
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::File => BoxMakeWriter::new(Mutex::new(open_log_file(&config.file)?)),
        LogOutput::Both => BoxMakeWriter::new(
            std::io::stderr.and(Mutex::new(open_log_file(&config.file)?)),
        ),
    };
    // no escape codes in files
    let ansi = config.color && !output.writes_file();

    let subscriber = Registry::default().with(filter);
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(writer);
    let installed = match format {
        LogFormat::Json => subscriber.with(layer.json()).try_init(),
        LogFormat::Text => subscriber.with(layer.with_ansi(ansi)).try_init(),
    };
    installed.map_err(|e| RegenError::Config(format!("Failed to install logger: {}", e)))
}

fn env_override<T: FromStr<Err = String>>(var: &str) -> Result<Option<T>, RegenError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: String| RegenError::Config(format!("{}: {}", var, e))),
        Err(_) => Ok(None),
    }
}

fn open_log_file(path: &Path) -> Result<std::fs::File, RegenError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| RegenError::Config(format!("Failed to create log directory: {}", e)))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            RegenError::Config(format!("Failed to open log file {}: {}", path.display(), e))
        })
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, RegenError> {
    if let Ok(filter) = EnvFilter::try_from_env("REVGEOM_LOG") {
        return Ok(filter);
    }
    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut directives: Vec<String> = config
        .modules
        .iter()
        .map(|(module, level)| format!("{}={}", module, level))
        .collect();
    if let Ok(raw) = std::env::var("REVGEOM_LOG_MODULES") {
        directives.extend(
            raw.split(',')
                .filter_map(|entry| entry.split_once('='))
                .map(|(module, level)| format!("{}={}", module.trim(), level.trim())),
        );
    }

    let mut filter = EnvFilter::new(&config.level);
    for directive in directives {
        let parsed: Directive = directive.parse().map_err(|e| {
            RegenError::Config(format!("Invalid log directive '{}': {}", directive, e))
        })?;
        filter = filter.add_directive(parsed);
    }
    Ok(filter)
}
