//! [`StateGateway`] for the Terraform Cloud / Terraform Enterprise v2 API.

mod api;

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header, StatusCode,
};
use serde::de::DeserializeOwned;
use tfdr_core::{
    gateway::{GatewayError, StateGateway, StateUpload, Workspace},
    state::StateDocument,
};
use tracing::debug;

use api::{
    CreateStateVersion, CreateStateVersionAttributes, CreateStateVersionData, Document,
    LockRequest, StateVersionAttributes, WorkspaceAttributes,
};

pub const DEFAULT_HOSTNAME: &str = "app.terraform.io";

/// Longest response body excerpt carried in errors.
const BODY_EXCERPT_LEN: usize = 512;

#[derive(Debug, Clone)]
pub struct TfeSettings {
    /// Hostname such as `app.terraform.io`, or a full base URL such as
    /// `http://localhost:8080`.
    pub address: String,
    pub token: String,
    pub organization: String,
}

pub struct TfeGateway {
    client: Client,
    api_url: String,
    token: String,
    organization: String,
}

impl TfeGateway {
    pub fn new(settings: TfeSettings) -> Result<TfeGateway, GatewayError> {
        let client = Client::builder()
            .user_agent(format!("tfdr/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| transport("build HTTP client", e))?;
        Ok(TfeGateway {
            client,
            api_url: api_url(&settings.address),
            token: settings.token,
            organization: settings.organization,
        })
    }

    fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response, GatewayError> {
        request
            .bearer_auth(&self.token)
            .header(header::CONTENT_TYPE, api::CONTENT_TYPE)
            .send()
            .map_err(|e| transport(operation, e))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: &str,
    ) -> Result<Option<T>, GatewayError> {
        debug!(url, "GET");
        let response = self.send(operation, self.client.get(url))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success(operation, response)?;
        response.json().map(Some).map_err(|e| transport(operation, e))
    }

    fn post<B: serde::Serialize + ?Sized>(
        &self,
        operation: &'static str,
        url: &str,
        body: &B,
    ) -> Result<Response, GatewayError> {
        debug!(url, "POST");
        let body = serde_json::to_vec(body).map_err(GatewayError::Serialize)?;
        let response = self.send(operation, self.client.post(url).body(body))?;
        expect_success(operation, response)
    }
}

impl StateGateway for TfeGateway {
    fn workspace(&self, name: &str) -> Result<Workspace, GatewayError> {
        let url = format!(
            "{}/organizations/{}/workspaces/{}",
            self.api_url, self.organization, name
        );
        let document: Document<WorkspaceAttributes> = self
            .get_json("read workspace", &url)?
            .ok_or_else(|| GatewayError::WorkspaceNotFound {
                workspace: format!("{}/{}", self.organization, name),
            })?;
        debug!(
            workspace = name,
            id = %document.data.id,
            locked = document.data.attributes.locked,
            "resolved workspace"
        );
        Ok(Workspace {
            id: document.data.id,
            name: document.data.attributes.name,
        })
    }

    fn current_state(&self, workspace: &Workspace) -> Result<Option<StateDocument>, GatewayError> {
        let url = format!(
            "{}/workspaces/{}/current-state-version",
            self.api_url, workspace.id
        );
        let Some(version) =
            self.get_json::<Document<StateVersionAttributes>>("read current state version", &url)?
        else {
            return Ok(None);
        };
        debug!(
            id = %version.data.id,
            serial = ?version.data.attributes.serial,
            "current state version"
        );

        let download_url = version.data.attributes.hosted_state_download_url.ok_or(
            GatewayError::UnexpectedStatus {
                operation: "read current state version",
                status: StatusCode::OK.as_u16(),
                body: "state version has no download URL".to_string(),
            },
        )?;
        let response = self.send("download state", self.client.get(&download_url))?;
        let bytes = expect_success("download state", response)?
            .bytes()
            .map_err(|e| transport("download state", e))?;
        StateDocument::from_json_slice(&bytes)
            .map(Some)
            .map_err(GatewayError::MalformedState)
    }

    fn lock(&self, workspace: &Workspace, reason: &str) -> Result<(), GatewayError> {
        let url = format!("{}/workspaces/{}/actions/lock", self.api_url, workspace.id);
        self.post("lock workspace", &url, &LockRequest { reason })?;
        Ok(())
    }

    fn unlock(&self, workspace: &Workspace) -> Result<(), GatewayError> {
        let url = format!("{}/workspaces/{}/actions/unlock", self.api_url, workspace.id);
        self.post("unlock workspace", &url, &serde_json::json!({}))?;
        Ok(())
    }

    fn create_state_version(
        &self,
        workspace: &Workspace,
        upload: &StateUpload,
    ) -> Result<(), GatewayError> {
        let url = format!("{}/workspaces/{}/state-versions", self.api_url, workspace.id);
        let body = CreateStateVersion {
            data: CreateStateVersionData {
                type_: "state-versions",
                attributes: CreateStateVersionAttributes {
                    serial: upload.serial,
                    md5: &upload.md5,
                    lineage: &upload.lineage,
                    state: BASE64.encode(&upload.state),
                },
            },
        };
        self.post("create state version", &url, &body)?;
        Ok(())
    }
}

fn api_url(address: &str) -> String {
    let base = if address.contains("://") {
        address.to_string()
    } else {
        format!("https://{}", address)
    };
    format!("{}/api/v2", base.trim_end_matches('/'))
}

fn transport(operation: &'static str, e: reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        operation,
        source: Box::new(e),
    }
}

fn expect_success(operation: &'static str, response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut body = response.text().unwrap_or_default();
    if body.len() > BODY_EXCERPT_LEN {
        let mut end = BODY_EXCERPT_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    Err(GatewayError::UnexpectedStatus {
        operation,
        status: status.as_u16(),
        body,
    })
}
