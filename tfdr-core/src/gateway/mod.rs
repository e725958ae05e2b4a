//! The interface to a remote store of versioned workspace state.
//!
//! Implementations provide the individual API calls; [`pull`] and [`push`]
//! sequence them.

#[cfg(test)]
pub(crate) mod memory;

use md5::{Digest, Md5};
use tracing::{info, warn};

use crate::state::StateDocument;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("workspace `{workspace}` not found")]
    WorkspaceNotFound { workspace: String },

    #[error("{operation} failed with HTTP status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("{operation} failed")]
    Transport {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("state payload is not a valid state document")]
    MalformedState(#[source] serde_json::Error),

    #[error("unable to serialize state document")]
    Serialize(#[source] serde_json::Error),

    #[error("unable to lock workspace `{workspace}`")]
    LockFailed {
        workspace: String,
        #[source]
        source: Box<GatewayError>,
    },
}

/// A resolved workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    /// Store-assigned identifier, used in API calls.
    pub id: String,
    pub name: String,
}

/// A serialized state document with the metadata a store needs to create a
/// state version from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateUpload {
    pub serial: u64,
    pub lineage: String,
    /// Hex MD5 digest of `state`.
    pub md5: String,
    pub state: Vec<u8>,
}

impl StateUpload {
    pub fn from_document(document: &StateDocument) -> Result<StateUpload, GatewayError> {
        let state = document.to_json_vec().map_err(GatewayError::Serialize)?;
        let md5 = hex::encode(Md5::digest(&state));
        Ok(StateUpload {
            serial: document.serial,
            lineage: document.lineage.clone(),
            md5,
            state,
        })
    }
}

/// The API calls of a remote state store. All calls are blocking.
pub trait StateGateway {
    fn workspace(&self, name: &str) -> Result<Workspace, GatewayError>;

    /// The current state of the workspace, or `None` if no state version
    /// exists yet.
    fn current_state(&self, workspace: &Workspace) -> Result<Option<StateDocument>, GatewayError>;

    fn lock(&self, workspace: &Workspace, reason: &str) -> Result<(), GatewayError>;

    fn unlock(&self, workspace: &Workspace) -> Result<(), GatewayError>;

    fn create_state_version(
        &self,
        workspace: &Workspace,
        upload: &StateUpload,
    ) -> Result<(), GatewayError>;
}

/// Read the current state of the named workspace.
pub fn pull<G: StateGateway + ?Sized>(
    gateway: &G,
    workspace_name: &str,
) -> Result<Option<StateDocument>, GatewayError> {
    let workspace = gateway.workspace(workspace_name)?;
    let state = gateway.current_state(&workspace)?;
    match &state {
        None => info!(workspace = workspace_name, "workspace has no state"),
        Some(state) if state.is_blank() => warn!(
            workspace = workspace_name,
            "workspace has a state version, but it is blank; treating it as present"
        ),
        Some(state) => info!(
            workspace = workspace_name,
            serial = state.serial,
            resources = state.resources.len(),
            "pulled state"
        ),
    }
    Ok(state)
}

/// Write `document` as a new state version of the named workspace, holding
/// the workspace lock while doing so.
///
/// The lock is released even if the upload fails. A failure to release it
/// is only logged.
pub fn push<G: StateGateway + ?Sized>(
    gateway: &G,
    document: &StateDocument,
    workspace_name: &str,
) -> Result<(), GatewayError> {
    let upload = StateUpload::from_document(document)?;
    let workspace = gateway.workspace(workspace_name)?;

    gateway
        .lock(&workspace, "tfdr: writing new state version")
        .map_err(|e| GatewayError::LockFailed {
            workspace: workspace_name.to_string(),
            source: Box::new(e),
        })?;

    let result = gateway.create_state_version(&workspace, &upload);

    if let Err(e) = gateway.unlock(&workspace) {
        warn!(
            workspace = workspace_name,
            error = %e,
            "unable to unlock workspace; it may need to be unlocked manually"
        );
    }

    result?;
    info!(
        workspace = workspace_name,
        serial = upload.serial,
        md5 = %upload.md5,
        "created state version"
    );
    Ok(())
}
