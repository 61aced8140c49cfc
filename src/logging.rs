//! Log subscriber installation.
//!
//! relay itself only emits `tracing` events. Applications that do not bring
//! their own subscriber can install one from a [`LogConfig`] with [`init`].
//! `RUST_LOG` takes precedence over the configured level.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::error::Error;
use crate::paths;

/// Minimum level that gets written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    Info,
    #[default]
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Silent => LevelFilter::OFF,
            LogLevel::Error  => LevelFilter::ERROR,
            LogLevel::Warn   => LevelFilter::WARN,
            LogLevel::Info   => LevelFilter::INFO,
            LogLevel::Debug  => LevelFilter::DEBUG,
            LogLevel::Trace  => LevelFilter::TRACE,
        }
    }
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly   => Rotation::HOURLY,
            LogRotation::Daily    => Rotation::DAILY,
            LogRotation::Never    => Rotation::NEVER,
        }
    }
}

/// The `[log]` table of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Also write to rotating files under `path`.
    pub create_file: bool,
    /// Directory for the log files; [`paths::log_dir`] when unset.
    pub path: Option<PathBuf>,
    /// File name prefix; rotated files get a date suffix.
    pub file: String,
    pub rotation: LogRotation,
    /// Rotated files kept before the oldest is deleted.
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            create_file: false,
            path: None,
            file: "relay.log".to_owned(),
            rotation: LogRotation::default(),
            max_files: 30,
        }
    }
}

impl LogConfig {
    /// Directory the log files are written to.
    pub fn dir(&self) -> Result<PathBuf, Error> {
        match &self.path {
            Some(dir) => Ok(dir.clone()),
            None => paths::log_dir(),
        }
    }

    /// Rotating file writer for this config.
    pub fn appender(&self) -> Result<RollingFileAppender, Error> {
        let dir = self.dir()?;
        fs::create_dir_all(&dir)?;
        RollingFileAppender::builder()
            .rotation(self.rotation.into())
            .filename_prefix(&self.file)
            .max_log_files(self.max_files.max(1))
            .build(dir)
            .map_err(|e| Error::Logging(e.to_string()))
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// [`Error::Io`] or [`Error::Logging`] when the log directory cannot be used,
/// [`Error::Logging`] when a global subscriber is already set.
pub fn init(config: &LogConfig) -> Result<(), Error> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(config.level).into())
        .from_env_lossy();
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = if config.create_file {
        builder
            .with_ansi(false)
            .with_writer(std::io::stdout.and(config.appender()?))
            .try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_filters() {
        assert_eq!(LevelFilter::from(LogLevel::Silent), LevelFilter::OFF);
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
        assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::DEBUG);
    }

    #[test]
    fn explicit_path_wins() {
        let config = LogConfig {
            path: Some(PathBuf::from("/var/log/relay")),
            ..LogConfig::default()
        };
        assert_eq!(config.dir().unwrap(), PathBuf::from("/var/log/relay"));
    }

    #[test]
    fn defaults_roll_daily_and_keep_thirty_files() {
        let config = LogConfig::default();
        assert_eq!(config.rotation, LogRotation::Daily);
        assert_eq!(Rotation::from(config.rotation), Rotation::DAILY);
        assert_eq!(config.max_files, 30);
    }

    #[test]
    fn appender_writes_prefixed_file() {
        use std::io::Write;

        let dir = std::env::temp_dir().join(format!("relay-log-test-{}", std::process::id()));
        let config = LogConfig {
            path: Some(dir.clone()),
            file: "app.log".to_owned(),
            ..LogConfig::default()
        };

        let mut appender = config.appender().unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.starts_with("app.log")), "files: {names:?}");
        fs::remove_dir_all(dir).unwrap();
    }
}
