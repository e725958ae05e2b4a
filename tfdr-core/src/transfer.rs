//! The `copy` and `delete` operations: pull, filter, push.

use std::path::Path;

use tracing::{info, info_span};

use crate::{
    error::TransferError,
    filter::{apply_filter, FilterPolicy, FilterRuleSet},
    gateway::{self, GatewayError, StateGateway},
    state::StateDocument,
};

/// What a completed operation wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    /// The workspace that received the new state version.
    pub workspace: String,
    pub serial: u64,
    pub kept: usize,
    pub dropped: usize,
}

/// Copy the resources selected by the rule file from `source` into the empty
/// workspace `destination`, starting a new lineage there.
pub fn copy_state<G: StateGateway + ?Sized>(
    gateway: &G,
    source: &str,
    destination: &str,
    rules_path: &Path,
) -> Result<TransferSummary, TransferError> {
    let _span = info_span!("copy state", source, destination).entered();

    let source_state = pull_existing(gateway, source)?;

    let destination_state =
        gateway::pull(gateway, destination).map_err(|e| read_failed(destination, e))?;
    if destination_state.is_some() {
        return Err(TransferError::DestinationNotEmpty {
            workspace: destination.to_string(),
        });
    }

    let rules = FilterRuleSet::load(rules_path)?;
    let resources = apply_filter(&source_state.resources, FilterPolicy::Copy, &rules);
    let summary = TransferSummary {
        workspace: destination.to_string(),
        serial: 1,
        kept: resources.len(),
        dropped: source_state.resources.len() - resources.len(),
    };
    info!(
        kept = summary.kept,
        dropped = summary.dropped,
        "filtered resources for copy"
    );

    let new_state = StateDocument::fresh(
        source_state.version,
        source_state.terraform_version,
        resources,
    );
    gateway::push(gateway, &new_state, destination).map_err(|e| push_failed(destination, e))?;
    Ok(summary)
}

/// Remove the resources selected by the rule file from the state of
/// `workspace`, continuing its lineage.
pub fn delete_resources<G: StateGateway + ?Sized>(
    gateway: &G,
    workspace: &str,
    rules_path: &Path,
) -> Result<TransferSummary, TransferError> {
    let _span = info_span!("delete resources", workspace).entered();

    let mut state = pull_existing(gateway, workspace)?;

    let rules = FilterRuleSet::load(rules_path)?;
    let before = state.resources.len();
    state.resources = apply_filter(&state.resources, FilterPolicy::Delete, &rules);
    state.serial = state
        .serial
        .checked_add(1)
        .ok_or_else(|| TransferError::SerialExhausted {
            workspace: workspace.to_string(),
        })?;
    let summary = TransferSummary {
        workspace: workspace.to_string(),
        serial: state.serial,
        kept: state.resources.len(),
        dropped: before - state.resources.len(),
    };
    info!(
        kept = summary.kept,
        dropped = summary.dropped,
        "filtered resources for delete"
    );

    gateway::push(gateway, &state, workspace).map_err(|e| push_failed(workspace, e))?;
    Ok(summary)
}

fn pull_existing<G: StateGateway + ?Sized>(
    gateway: &G,
    workspace: &str,
) -> Result<StateDocument, TransferError> {
    gateway::pull(gateway, workspace)
        .map_err(|e| read_failed(workspace, e))?
        .ok_or_else(|| TransferError::SourceIsEmpty {
            workspace: workspace.to_string(),
        })
}

fn read_failed(workspace: &str, source: GatewayError) -> TransferError {
    TransferError::ReadStateFailed {
        workspace: workspace.to_string(),
        source,
    }
}

fn push_failed(workspace: &str, source: GatewayError) -> TransferError {
    TransferError::PushFailed {
        workspace: workspace.to_string(),
        source,
    }
}
