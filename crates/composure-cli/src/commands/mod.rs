//! CLI command definitions and dispatch.

pub mod config;
pub mod ls;
pub mod order;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use composure_common::config::ProjectSettings;
use composure_common::constants::{ENV_PROFILES, ENV_PROJECT_FILE, ENV_PROJECT_NAME};
use composure_project::Project;
use composure_project::types::Mapping;

/// Composure: inspect and transform multi-service projects.
#[derive(Parser, Debug)]
#[command(name = "composure", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Project selection shared by every subcommand.
    #[command(flatten)]
    pub project: ProjectArgs,
}

/// Flags selecting which project to load.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project file; defaults to `compose.yaml` and friends in the project directory.
    #[arg(short = 'f', long = "file", global = true, env = ENV_PROJECT_FILE)]
    pub file: Option<PathBuf>,

    /// Project name; defaults to the document's name, then the directory name.
    #[arg(short = 'p', long, global = true, env = ENV_PROJECT_NAME)]
    pub project_name: Option<String>,

    /// Profile to enable; may be repeated or comma separated.
    #[arg(long = "profile", global = true, env = ENV_PROFILES)]
    pub profiles: Vec<String>,

    /// Directory relative paths resolve against.
    #[arg(long, global = true, default_value = ".")]
    pub project_directory: PathBuf,
}

impl ProjectArgs {
    /// Maps the flags onto loader settings.
    #[must_use]
    pub fn settings(&self) -> ProjectSettings {
        ProjectSettings {
            project_name: self.project_name.clone(),
            working_dir: self.project_directory.clone(),
            files: self.file.iter().cloned().collect(),
            profiles: self
                .profiles
                .iter()
                .flat_map(|p| ProjectSettings::parse_profiles(p))
                .collect(),
            ..ProjectSettings::default()
        }
    }
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the resolved project.
    Config(config::ConfigArgs),
    /// List the project's services.
    Ls(ls::LsArgs),
    /// Print the order in which services start.
    Order(order::OrderArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Config(args) => config::execute(&cli.project, args),
        Command::Ls(args) => ls::execute(&cli.project, args),
        Command::Order(args) => order::execute(&cli.project, args),
    }
}

/// Loads the project with the process environment as project environment.
///
/// Variables whose name or value is not valid UTF-8 are left out.
///
/// # Errors
///
/// Returns an error if the project cannot be located, read, or decoded.
pub fn load_project(settings: &ProjectSettings) -> anyhow::Result<Project> {
    let environment: Mapping = std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect();
    Ok(Project::load(settings, environment)?)
}
