use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use tfdr_cloud::TfeGateway;
use tfdr_core::transfer::{copy_state, delete_resources, TransferSummary};

use crate::config::Configuration;

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Copy the selected resources from one workspace into a new, empty workspace
    Copy(CopyArgs),

    /// Remove the selected resources from a workspace's state
    Delete(DeleteArgs),
}

#[derive(clap::Args, Debug)]
pub(crate) struct CopyArgs {
    /// Workspace to read the state from
    #[arg(short = 'o', long = "source", alias = "originalWorkspaceName")]
    source: String,

    /// Workspace to create the state in; it must not have any state yet
    #[arg(short = 'n', long = "destination", alias = "newWorkspaceName")]
    destination: String,

    /// JSON file with the global resource types and rules to copy
    #[arg(short = 'f', long = "filter-config", alias = "filterConfigFile")]
    filter_config: PathBuf,
}

#[derive(clap::Args, Debug)]
pub(crate) struct DeleteArgs {
    /// Workspace whose state to prune
    #[arg(short = 'w', long = "workspace", alias = "workspaceName")]
    workspace: String,

    /// JSON file with the global resource types and rules to delete
    #[arg(short = 'f', long = "filter-config", alias = "filterConfigFile")]
    filter_config: PathBuf,
}

pub(crate) fn run(config: &Configuration, command: &Commands) -> Result<()> {
    config.validate()?;
    match command {
        Commands::Copy(args) => {
            check_filter_config(&args.filter_config)?;
            let gateway = connect(config)?;
            let summary = copy_state(
                &gateway,
                &args.source,
                &args.destination,
                &args.filter_config,
            )?;
            println!(
                "Copied {} resources from `{}` ({})",
                summary.kept,
                args.source,
                describe(&summary)
            );
        }
        Commands::Delete(args) => {
            check_filter_config(&args.filter_config)?;
            let gateway = connect(config)?;
            let summary = delete_resources(&gateway, &args.workspace, &args.filter_config)?;
            println!(
                "Deleted {} resources ({})",
                summary.dropped,
                describe(&summary)
            );
        }
    }
    Ok(())
}

fn connect(config: &Configuration) -> Result<TfeGateway> {
    TfeGateway::new(config.tfe_settings()).context("setting up the Terraform Cloud client")
}

/// Fail before contacting Terraform Cloud when the rule file is plainly absent.
fn check_filter_config(path: &Path) -> Result<()> {
    if !path.is_file() {
        bail!("filter config file {} does not exist", path.display());
    }
    Ok(())
}

fn describe(summary: &TransferSummary) -> String {
    format!(
        "workspace `{}` now at serial {} with {} resources, {} dropped",
        summary.workspace, summary.serial, summary.kept, summary.dropped
    )
}
