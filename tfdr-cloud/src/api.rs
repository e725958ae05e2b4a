//! The subset of the Terraform Cloud v2 (JSON:API) documents that tfdr uses.

use serde::{Deserialize, Serialize};

pub(crate) const CONTENT_TYPE: &str = "application/vnd.api+json";

#[derive(Debug, Deserialize)]
pub(crate) struct Document<A> {
    pub data: Data<A>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Data<A> {
    pub id: String,
    pub attributes: A,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WorkspaceAttributes {
    pub name: String,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct StateVersionAttributes {
    #[serde(default)]
    pub serial: Option<u64>,
    #[serde(default)]
    pub hosted_state_download_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateStateVersion<'a> {
    pub data: CreateStateVersionData<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateStateVersionData<'a> {
    #[serde(rename = "type")]
    pub type_: &'static str,
    pub attributes: CreateStateVersionAttributes<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateStateVersionAttributes<'a> {
    pub serial: u64,
    pub md5: &'a str,
    /// A new lineage is left for the store to assign.
    #[serde(skip_serializing_if = "str::is_empty")]
    pub lineage: &'a str,
    /// Base64 of the serialized state document.
    pub state: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct LockRequest<'a> {
    pub reason: &'a str,
}
