//! In-process [`StateGateway`] that records the calls made to it.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
};

use super::{GatewayError, StateGateway, StateUpload, Workspace};
use crate::state::StateDocument;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Lock(String),
    /// Workspace name and serial of the upload
    Create(String, u64),
    Unlock(String),
}

#[derive(Default)]
pub(crate) struct MemoryGateway {
    workspaces: RefCell<BTreeMap<String, Option<StateDocument>>>,
    calls: RefCell<Vec<Call>>,
    fail_lock: Cell<bool>,
    fail_create: Cell<bool>,
    fail_unlock: Cell<bool>,
}

impl MemoryGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_workspace(&self, name: &str, state: Option<StateDocument>) {
        self.workspaces.borrow_mut().insert(name.to_string(), state);
    }

    pub(crate) fn state_of(&self, name: &str) -> Option<StateDocument> {
        self.workspaces.borrow().get(name).cloned().flatten()
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub(crate) fn fail_lock(&self) {
        self.fail_lock.set(true);
    }

    pub(crate) fn fail_create(&self) {
        self.fail_create.set(true);
    }

    pub(crate) fn fail_unlock(&self) {
        self.fail_unlock.set(true);
    }

    fn refuse(operation: &'static str) -> GatewayError {
        GatewayError::UnexpectedStatus {
            operation,
            status: 409,
            body: "refused by test".to_string(),
        }
    }
}

impl StateGateway for MemoryGateway {
    fn workspace(&self, name: &str) -> Result<Workspace, GatewayError> {
        if self.workspaces.borrow().contains_key(name) {
            Ok(Workspace {
                id: format!("ws-{}", name),
                name: name.to_string(),
            })
        } else {
            Err(GatewayError::WorkspaceNotFound {
                workspace: name.to_string(),
            })
        }
    }

    fn current_state(&self, workspace: &Workspace) -> Result<Option<StateDocument>, GatewayError> {
        Ok(self.state_of(&workspace.name))
    }

    fn lock(&self, workspace: &Workspace, _reason: &str) -> Result<(), GatewayError> {
        self.calls.borrow_mut().push(Call::Lock(workspace.name.clone()));
        if self.fail_lock.get() {
            return Err(Self::refuse("lock workspace"));
        }
        Ok(())
    }

    fn unlock(&self, workspace: &Workspace) -> Result<(), GatewayError> {
        self.calls
            .borrow_mut()
            .push(Call::Unlock(workspace.name.clone()));
        if self.fail_unlock.get() {
            return Err(Self::refuse("unlock workspace"));
        }
        Ok(())
    }

    fn create_state_version(
        &self,
        workspace: &Workspace,
        upload: &StateUpload,
    ) -> Result<(), GatewayError> {
        self.calls
            .borrow_mut()
            .push(Call::Create(workspace.name.clone(), upload.serial));
        if self.fail_create.get() {
            return Err(Self::refuse("create state version"));
        }
        let document =
            StateDocument::from_json_slice(&upload.state).map_err(GatewayError::MalformedState)?;
        self.add_workspace(&workspace.name, Some(document));
        Ok(())
    }
}
