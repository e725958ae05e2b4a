use std::path::PathBuf;

use crate::gateway::GatewayError;

/// The filter rule file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum FilterConfigError {
    #[error("unable to read filter config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse filter config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of a copy or delete operation.
///
/// Every variant is returned before the remote state is touched, except
/// `PushFailed`, which is the last step.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("workspace `{workspace}` has no state")]
    SourceIsEmpty { workspace: String },

    #[error("destination workspace `{workspace}` already has state; refusing to overwrite it")]
    DestinationNotEmpty { workspace: String },

    #[error("unable to read state of workspace `{workspace}`")]
    ReadStateFailed {
        workspace: String,
        #[source]
        source: GatewayError,
    },

    #[error("state of workspace `{workspace}` is at the highest possible serial")]
    SerialExhausted { workspace: String },

    #[error("unable to filter resources from state")]
    FilterFailed(#[from] FilterConfigError),

    #[error("unable to create new state version in workspace `{workspace}`")]
    PushFailed {
        workspace: String,
        #[source]
        source: GatewayError,
    },
}
