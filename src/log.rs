//! Initialisation of the program logger.
//!
//! Messages go to the terminal (coloured if it supports it) and, when a model is run, to log files
//! in the output folder. Model assembly reports counts at `info`, per-family detail at `debug` and
//! degraded solves or overwritten outputs at `warn`.
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record, debug};
use std::env;
use std::fmt::Arguments;
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used when neither `MES2_LOG_LEVEL` nor the settings file names one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level
const LOG_LEVEL_ENV_VAR: &str = "MES2_LOG_LEVEL";

/// Receives everything below warnings for a run
const LOG_INFO_FILE_NAME: &str = "mes2_info.log";

/// Receives warnings and errors for a run
const LOG_ERROR_FILE_NAME: &str = "mes2_error.log";

/// Where the log level in force was taken from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelSource {
    /// The `MES2_LOG_LEVEL` environment variable
    Environment,
    /// The `log_level` setting
    Settings,
    /// [`DEFAULT_LOG_LEVEL`]
    Default,
}

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Convert a log level name (case-insensitive) to a [`LevelFilter`].
///
/// Accepted names are `off`, `error`, `warn`, `info`, `debug` and `trace`.
pub fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    Ok(match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    })
}

/// Pick the log level: the environment variable wins over the setting, which wins over the
/// default. Empty values count as absent.
pub fn resolve_log_level(
    from_env: Option<String>,
    from_settings: Option<&str>,
) -> Result<(LevelFilter, LevelSource)> {
    if let Some(level) = from_env.filter(|level| !level.is_empty()) {
        let level = parse_log_level(&level)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}"))?;
        return Ok((level, LevelSource::Environment));
    }

    match from_settings.filter(|level| !level.is_empty()) {
        Some(level) => Ok((parse_log_level(level)?, LevelSource::Settings)),
        None => Ok((parse_log_level(DEFAULT_LOG_LEVEL)?, LevelSource::Default)),
    }
}

/// The pair of log files written into a run's output folder
struct LogFiles {
    info: File,
    error: File,
}

impl LogFiles {
    /// Create (or truncate) both log files in `dir`
    fn create(dir: &Path) -> Result<Self> {
        let open = |file_name: &str| {
            let path = dir.join(file_name);
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .with_context(|| format!("Could not create log file {}", path.display()))
        };

        Ok(Self {
            info: open(LOG_INFO_FILE_NAME)?,
            error: open(LOG_ERROR_FILE_NAME)?,
        })
    }
}

/// Colours for each level on a terminal
fn level_colours() -> ColoredLevelConfig {
    ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta)
}

/// Write one record as `[time level target] message`, colouring the level if `colours` is given
fn format_record(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    let target = record.target();
    match colours {
        Some(colours) => {
            let level = colours.color(record.level());
            out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
        }
        None => {
            let level = record.level();
            out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
        }
    }
}

/// Initialise the program logger.
///
/// Messages below warnings go to stdout and warnings and errors to stderr, coloured only when the
/// stream is a terminal. If `log_dir` is given, the run's messages are also written to plain log
/// files there: the info file gets at least `info`, whatever the terminal level.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_dir`: Folder in which to create log files
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let (log_level, source) =
        resolve_log_level(env::var(LOG_LEVEL_ENV_VAR).ok(), log_level_from_settings)?;
    let files = log_dir.map(LogFiles::create).transpose()?;

    let stdout_colours = std::io::stdout().is_terminal().then(level_colours);
    let stderr_colours = std::io::stderr().is_terminal().then(level_colours);
    let mut dispatch = Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    format_record(out, message, record, stdout_colours.as_ref());
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    format_record(out, message, record, stderr_colours.as_ref());
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(LogFiles { info, error }) = files {
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(|out, message, record| format_record(out, message, record, None))
                    .level(log_level.max(LevelFilter::Info))
                    .chain(info),
            )
            .chain(
                Dispatch::new()
                    .format(|out, message, record| format_record(out, message, record, None))
                    .level(LevelFilter::Warn)
                    .chain(error),
            );
    }

    dispatch
        .apply()
        .context("Another logger has already been installed")?;
    LOGGER_INIT.get_or_init(|| ());
    debug!("Log level {log_level} taken from {source:?}");

    Ok(())
}
