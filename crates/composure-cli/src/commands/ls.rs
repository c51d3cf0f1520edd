//! `composure ls`: list the project's services.

use clap::Args;

use super::ProjectArgs;
use crate::output;

/// Arguments for the `ls` command.
#[derive(Args, Debug)]
pub struct LsArgs {
    /// List services disabled by the active profiles instead.
    #[arg(long)]
    pub disabled: bool,

    /// Print only service names.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Executes the `ls` command.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded.
#[allow(clippy::print_stdout)]
pub fn execute(project_args: &ProjectArgs, args: LsArgs) -> anyhow::Result<()> {
    let project = super::load_project(&project_args.settings())?;
    let services = if args.disabled {
        &project.disabled_services
    } else {
        &project.services
    };

    if args.quiet {
        for name in services.keys() {
            println!("{name}");
        }
        return Ok(());
    }

    println!("SERVICE\tIMAGE\tDEPENDS ON\tPROFILES");
    for (name, service) in services {
        println!("{}", output::service_row(name, service));
    }
    Ok(())
}
