//! `composure order`: print the order in which services start.

use clap::Args;
use composure_project::DependencyGraph;

use super::ProjectArgs;

/// Arguments for the `order` command.
#[derive(Args, Debug)]
pub struct OrderArgs {
    /// Print the order in which services stop instead.
    #[arg(long)]
    pub reverse: bool,
}

/// Executes the `order` command.
///
/// # Errors
///
/// Returns an error if the project cannot be loaded or its enabled
/// services form a dependency cycle.
#[allow(clippy::print_stdout)]
pub fn execute(project_args: &ProjectArgs, args: OrderArgs) -> anyhow::Result<()> {
    let project = super::load_project(&project_args.settings())?;
    let mut order = DependencyGraph::from_project(&project).startup_order()?;
    if args.reverse {
        order.reverse();
    }
    tracing::debug!(services = order.len(), "resolved startup order");

    for (position, name) in order.iter().enumerate() {
        println!("{:>3}  {name}", position + 1);
    }
    Ok(())
}
