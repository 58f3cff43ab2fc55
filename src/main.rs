use std::process::ExitCode;

use clap::Parser;
use dialoguer::Confirm;
use log::{error, info};

use depfetch::{
    cli::args::{CliArgs, Command},
    DepFetch,
};

fn main() -> ExitCode {
    let cli_args: CliArgs = CliArgs::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_level(cli_args.verbosity.into())
        .format_target(false)
        .format_timestamp(None)
        .init();

    match run(cli_args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every dependency was processed successfully.
fn run(cli_args: CliArgs) -> anyhow::Result<bool> {
    let depfetch = DepFetch::builder()
        .root(&cli_args.root)
        .manifest_file_name(&cli_args.manifest_file_name)
        .try_build()?;

    match cli_args.cmd {
        None => Ok(depfetch.fetch(cli_args.force)?.is_success()),
        Some(Command::Clean { no_prompt }) => {
            let confirmed = no_prompt
                || Confirm::new()
                    .with_prompt(
                        "Are you sure you want to clean the dependencies? \
                         This will remove all dependencies in the root directory and any subdirectories.",
                    )
                    .default(false)
                    .interact()?;
            if confirmed {
                depfetch.clean()?;
            } else {
                info!("Clean aborted");
            }
            Ok(true)
        }
    }
}
