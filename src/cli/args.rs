use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

/// Collects and processes the dependencies specified in dependencies.json files.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Option<Command>,
    /// Cleans all existing dependencies and regathers them.
    #[clap(short, long)]
    pub force: bool,
    /// Either CRITICAL, ERROR, WARNING, INFO, or DEBUG.
    #[clap(short, long, value_enum, ignore_case = true, default_value_t = Verbosity::Info)]
    pub verbosity: Verbosity,
    /// Directory holding the top level manifest.
    #[clap(short, long, default_value = ".")]
    pub root: PathBuf,
    /// Name of the manifest file looked up in every directory.
    #[clap(short, long, default_value = "dependencies.json")]
    pub manifest_file_name: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cleans all the dependencies in the root directory and any subdirectories
    Clean {
        /// Suppresses the confirmation prompt
        #[clap(long)]
        no_prompt: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Verbosity {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl From<Verbosity> for LevelFilter {
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Critical | Verbosity::Error => LevelFilter::Error,
            Verbosity::Warning => LevelFilter::Warn,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}
