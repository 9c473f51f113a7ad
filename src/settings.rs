//! Code for loading program settings.
//!
//! Settings apply to every model run on this machine: where logs and results go, and solver
//! options such as the number of threads which depend on the computer rather than on the model.
use crate::get_mes2_config_dir;
use crate::input::overrides::ParameterOverrides;
use crate::input::read_toml;
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use crate::output::DEFAULT_RESULTS_DIR;
use crate::solver::SolverOptions;
use anyhow::{Context, Result};
use documented::DocumentedFields;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for mes2
# Uncomment a line to change the setting from its default value.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RESULTS_DIR)
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_mes2_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Folder in which a results folder is created for each model, unless one is given
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
    /// HiGHS options for every model, e.g. `threads = 4`. These replace the model's own options.
    #[serde(default)]
    pub solver_options: IndexMap<String, toml::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            results_dir: default_results_dir(),
            solver_options: IndexMap::new(),
        }
    }
}

impl Settings {
    /// Read the program settings file.
    ///
    /// If the file is not present, default values for settings will be used.
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read and check the settings at `file_path`, falling back to defaults if there is no file
    pub fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", file_path.display()))?;

        Ok(settings)
    }

    /// Check the log level and the solver options
    pub fn validate(&self) -> Result<()> {
        if !self.log_level.is_empty() {
            parse_log_level(&self.log_level)?;
        }
        SolverOptions::from_config(&self.solver_options)?;

        Ok(())
    }

    /// The solver options as overrides of a model's `solver.options` table
    pub fn solver_overrides(&self) -> ParameterOverrides {
        let mut overrides = ParameterOverrides::default();
        for (name, value) in &self.solver_options {
            overrides.insert(&format!("solver.options.{name}"), value.clone());
        }

        overrides
    }

    /// The contents of the default settings file.
    ///
    /// Every setting is commented out and preceded by its documentation, so the file gives the
    /// default settings until the user uncomments a line.
    pub fn default_file_contents() -> String {
        let settings_raw =
            toml::to_string(&Settings::default()).expect("Could not convert settings to TOML");

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines().map(str::trim) {
            // Tables (i.e. solver options) are written as `[name]`, other settings as `name = ...`
            let field = match line.strip_prefix('[').and_then(|line| line.strip_suffix(']')) {
                Some(table) => table,
                None => match line.split_once('=') {
                    Some((field, _)) => field.trim(),
                    None => continue,
                },
            };

            let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
            for doc_line in docs.lines() {
                write!(&mut out, "\n# # {}\n", doc_line.trim()).unwrap();
            }
            writeln!(&mut out, "# {line}").unwrap();
        }

        out
    }
}
