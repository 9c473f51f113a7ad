//! The command line interface for the model.
use crate::input::overrides::ParameterOverrides;
use crate::log;
use crate::model::Model;
use crate::optimisation::build_model_spec;
use crate::output::{create_output_directory, get_output_dir};
use crate::sensitivity::run_sensitivity;
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod example;
use example::ExampleSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the model.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Parameter values which replace those in the model file
#[derive(Args, Default)]
pub struct OverrideOpts {
    /// Override a parameter of the model file, e.g. `--set battery.investment_cost=400`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub overrides: Vec<String>,
}

impl OverrideOpts {
    /// The solver options from the settings file, followed by the overrides given on the command
    /// line, which take precedence
    fn parse(&self, settings: &Settings) -> Result<ParameterOverrides> {
        let mut overrides = settings.solver_overrides();
        for raw in &self.overrides {
            overrides.insert_raw(raw)?;
        }

        Ok(overrides)
    }
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Parameter overrides
    #[command(flatten)]
    pub overrides: OverrideOpts,
}

/// Options for the sensitivity command
#[derive(Args)]
pub struct SensitivityOpts {
    /// Dotted name of the parameter to vary, e.g. `reliability.ee_value_of_lost_load`
    #[arg(long)]
    pub parameter: String,
    /// Comma-separated values for the parameter
    #[arg(long, value_delimiter = ',', required = true)]
    pub values: Vec<String>,
    /// Other run options
    #[command(flatten)]
    pub run: RunOpts,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Size a microgrid and write the results.
    Run {
        /// Path to the model directory.
        model_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Load and assemble a model without solving it.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
        /// Parameter overrides
        #[command(flatten)]
        overrides: OverrideOpts,
    },
    /// Solve a model once for each value of a parameter.
    Sensitivity {
        /// The path to the model directory.
        model_dir: PathBuf,
        /// Sweep options
        #[command(flatten)]
        opts: SensitivityOpts,
    },
    /// Manage example models.
    Example {
        /// The available subcommands for managing example models.
        #[command(subcommand)]
        subcommand: ExampleSubcommands,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_dir, opts } => handle_run_command(&model_dir, &opts, None),
            Self::Validate {
                model_dir,
                overrides,
            } => handle_validate_command(&model_dir, &overrides, None),
            Self::Sensitivity { model_dir, opts } => {
                handle_sensitivity_command(&model_dir, &opts, None)
            }
            Self::Example { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start mes2
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ mes2 --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Initialise the program logger, unless a previous command already has
fn init_logger(settings: &Settings, log_file_path: Option<&Path>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(Some(&settings.log_level), log_file_path).context("Failed to initialise logging.")
}

/// Create the output folder for a command, returning its path and whether it is being overwritten
fn prepare_output_dir(
    model_path: &Path,
    opts: &RunOpts,
    settings: &Settings,
    subfolder: Option<&str>,
) -> Result<(PathBuf, bool)> {
    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => {
            let mut path = get_output_dir(model_path, &settings.results_dir)?;
            if let Some(subfolder) = subfolder {
                path.push(subfolder);
            }
            path
        }
    };

    // The command-line flag can only turn overwriting on
    let allow_overwrite = opts.overwrite || settings.overwrite;
    let overwrite = create_output_directory(&output_path, allow_overwrite).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    Ok((output_path, overwrite))
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    let overrides = opts.overrides.parse(&settings)?;
    let (output_path, overwrite) = prepare_output_dir(model_path, opts, &settings, None)?;
    init_logger(&settings, Some(&output_path))?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let model = Model::from_path(model_path, &overrides).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    crate::simulation::run(&model, &output_path)?;
    info!("Run complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(
    model_path: &Path,
    overrides: &OverrideOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;

    // We won't save log files when running the validate command
    init_logger(&settings, None)?;

    let model = Model::from_path(model_path, &overrides.parse(&settings)?)
        .context("Failed to validate model.")?;
    let spec = build_model_spec(&model);
    info!(
        "Model validation successful! {} scenario(s), {} period(s), {} class(es): {} variables, \
         {} constraints",
        model.sets.scenarios,
        model.sets.periods,
        model.sets.classes,
        spec.num_variables(),
        spec.num_constraints()
    );

    Ok(())
}

/// Handle the `sensitivity` command.
pub fn handle_sensitivity_command(
    model_path: &Path,
    opts: &SensitivityOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    let overrides = opts.run.overrides.parse(&settings)?;
    let (output_path, overwrite) =
        prepare_output_dir(model_path, &opts.run, &settings, Some("sensitivity"))?;
    init_logger(&settings, Some(&output_path))?;
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    let rows = run_sensitivity(
        model_path,
        &overrides,
        &opts.parameter,
        &opts.values,
        &output_path,
    )?;
    let not_optimal = rows.iter().filter(|row| !row.is_optimal()).count();
    info!(
        "Sensitivity sweep complete: {} run(s), {not_optimal} not solved to optimality",
        rows.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::write_model_dir;
    use tempfile::tempdir;

    fn settings() -> Settings {
        Settings {
            log_level: "off".into(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sensitivity_values() {
        let cli = Cli::try_parse_from([
            "mes2",
            "sensitivity",
            "model",
            "--parameter",
            "battery.investment_cost",
            "--values",
            "100,200,300",
            "--set",
            "project.discount_rate=0.1",
        ])
        .unwrap();
        let Some(Commands::Sensitivity { opts, .. }) = cli.command else {
            panic!("Expected sensitivity command");
        };
        assert_eq!(opts.values, ["100", "200", "300"]);
        assert_eq!(opts.run.overrides.overrides, ["project.discount_rate=0.1"]);
    }

    #[test]
    fn test_handle_run_command() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path());
        let output_dir = tempdir().unwrap();
        let opts = RunOpts {
            output_dir: Some(output_dir.path().to_path_buf()),
            ..Default::default()
        };

        handle_run_command(model_dir.path(), &opts, Some(settings())).unwrap();
        assert!(output_dir.path().join("costs.csv").is_file());

        // The folder is no longer empty
        assert!(handle_run_command(model_dir.path(), &opts, Some(settings())).is_err());
    }

    #[test]
    fn test_handle_validate_command() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path());
        handle_validate_command(model_dir.path(), &OverrideOpts::default(), Some(settings()))
            .unwrap();

        let overrides = OverrideOpts {
            overrides: vec!["battery.no_such_parameter=1".into()],
        };
        assert!(handle_validate_command(model_dir.path(), &overrides, Some(settings())).is_err());
    }

    #[test]
    fn test_override_precedence() {
        let settings = Settings {
            solver_options: [
                ("time_limit".to_string(), toml::Value::Integer(5)),
                ("threads".to_string(), toml::Value::Integer(2)),
            ]
            .into_iter()
            .collect(),
            ..settings()
        };
        let opts = OverrideOpts {
            overrides: vec!["solver.options.time_limit=10".into()],
        };

        let overrides = opts.parse(&settings).unwrap();
        let overrides: Vec<_> = overrides.iter().collect();
        assert_eq!(
            overrides,
            [
                ("solver.options.time_limit", &toml::Value::Integer(10)),
                ("solver.options.threads", &toml::Value::Integer(2)),
            ]
        );
    }

    #[test]
    fn test_settings_solver_options_reach_model() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path());
        let with_option = |name: &str| Settings {
            solver_options: [(name.to_string(), toml::Value::Integer(1))]
                .into_iter()
                .collect(),
            ..settings()
        };

        let opts = OverrideOpts::default();
        handle_validate_command(model_dir.path(), &opts, Some(with_option("threads"))).unwrap();
        assert!(
            handle_validate_command(model_dir.path(), &opts, Some(with_option("warp_speed")))
                .is_err()
        );
    }

    #[test]
    fn test_results_dir_from_settings() {
        let model_dir = tempdir().unwrap();
        write_model_dir(model_dir.path());
        let results_dir = tempdir().unwrap();
        let settings = Settings {
            results_dir: results_dir.path().to_path_buf(),
            ..settings()
        };

        handle_run_command(model_dir.path(), &RunOpts::default(), Some(settings)).unwrap();
        let model_name = model_dir.path().file_name().unwrap();
        assert!(results_dir.path().join(model_name).join("costs.csv").is_file());
    }
}
