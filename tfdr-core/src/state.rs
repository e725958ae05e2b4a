use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// The `mode` of resources that are subject to named filter rules.
pub const MANAGED_MODE: &str = "managed";

/// The root of a Terraform state snapshot.
///
/// Only the fields needed for filtering and version bookkeeping are modeled.
/// Everything else is carried in `other_fields`, so that a pulled document
/// serializes back without losing data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StateDocument {
    /// Version of the snapshot format. Opaque; copied through.
    pub version: u32,
    /// Version of the tool that produced the snapshot.
    #[serde(default)]
    pub terraform_version: String,
    /// Increases with every new state version in a lineage.
    #[serde(default)]
    pub serial: u64,
    /// Identifies the history this snapshot belongs to.
    #[serde(default)]
    pub lineage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Value>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

/// Deserializes a field that is present, even when its value is `null`, as
/// `Some`. Absent fields fall back to `#[serde(default)]`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl StateDocument {
    /// A document for a workspace that has never been written to. Starts a
    /// new lineage at serial 1.
    pub fn fresh(version: u32, terraform_version: String, resources: Vec<Resource>) -> Self {
        StateDocument {
            version,
            terraform_version,
            serial: 1,
            lineage: String::new(),
            outputs: Some(Value::Object(Map::new())),
            resources,
            other_fields: Map::new(),
        }
    }

    pub fn from_json_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    pub fn to_json_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// True for a document that exists but carries nothing: no serial, no
    /// lineage, no tool version and no resources. Some stores hand these out
    /// instead of reporting that no state exists.
    pub fn is_blank(&self) -> bool {
        self.serial == 0
            && self.lineage.is_empty()
            && self.terraform_version.is_empty()
            && self.resources.is_empty()
    }
}

/// A resource block in the state: one `resource` or `data` declaration and
/// its instances.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Resource {
    /// Module path, e.g. `module.network`. Terraform omits the key for the
    /// root module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub mode: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

impl Resource {
    /// The module path, with the root module as `""`.
    pub fn module_path(&self) -> &str {
        self.module.as_deref().unwrap_or_default()
    }

    pub fn is_managed(&self) -> bool {
        self.mode == MANAGED_MODE
    }

    /// The Terraform address of the resource, for messages.
    pub fn address(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(4);
        if !self.module_path().is_empty() {
            parts.push(self.module_path());
        }
        if !self.is_managed() {
            parts.push("data");
        }
        parts.push(&self.type_);
        parts.push(&self.name);
        parts.join(".")
    }
}

/// One instance of a resource (one per `count`/`for_each` key).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Instance {
    /// `None` when the key is absent; an explicit `null` is kept as
    /// `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub attributes: Option<Value>,
    /// `schema_version`, `private`, `dependencies`, `index_key` and friends.
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

impl Instance {
    pub fn attribute_map(&self) -> Option<&Map<String, Value>> {
        self.attributes.as_ref().and_then(Value::as_object)
    }

    /// Overwrite the given keys of the attributes. Missing, `null` or
    /// non-object attributes are replaced by an object first.
    pub fn merge_attributes(&mut self, overrides: &Map<String, Value>) {
        let mut map = match self.attributes.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        for (key, value) in overrides {
            map.insert(key.clone(), value.clone());
        }
        self.attributes = Some(Value::Object(map));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EXAMPLE: &str = r#"
    {
        "version": 4,
        "terraform_version": "0.14.7",
        "serial": 12,
        "lineage": "0b5d2b0e-2a5c-7d2a-8e9f-2f6b3c0d1e2f",
        "outputs": { "bucket": { "value": "logs", "type": "string" } },
        "resources": [
            {
                "mode": "managed",
                "type": "aws_s3_bucket",
                "name": "logs",
                "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
                "instances": [
                    {
                        "schema_version": 0,
                        "attributes": { "bucket": "logs", "acl": "private" },
                        "sensitive_attributes": [],
                        "private": "bnVsbA=="
                    }
                ]
            },
            {
                "module": "module.network",
                "mode": "data",
                "type": "aws_availability_zones",
                "name": "available",
                "provider": "provider[\"registry.terraform.io/hashicorp/aws\"]",
                "each": "list",
                "instances": [
                    {
                        "index_key": 0,
                        "schema_version": 0,
                        "attributes": { "names": ["a", "b"] },
                        "dependencies": ["module.network.aws_vpc.main"]
                    }
                ]
            }
        ],
        "check_results": null
    }
    "#;

    #[test]
    fn test_parse_state() {
        let state = StateDocument::from_json_slice(EXAMPLE.as_bytes()).unwrap();
        assert_eq!(state.version, 4);
        assert_eq!(state.terraform_version, "0.14.7");
        assert_eq!(state.serial, 12);
        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.resources[0].module, None);
        assert_eq!(state.resources[0].module_path(), "");
        assert_eq!(state.resources[1].module_path(), "module.network");
        assert_eq!(state.resources[0].type_, "aws_s3_bucket");
        assert!(state.resources[0].is_managed());
        assert!(!state.resources[1].is_managed());
        assert_eq!(
            state.resources[0].instances[0]
                .attribute_map()
                .unwrap()
                .get("acl"),
            Some(&json!("private"))
        );
    }

    #[test]
    fn test_round_trip_keeps_unmodeled_fields() {
        let original: Value = serde_json::from_str(EXAMPLE).unwrap();
        let state: StateDocument = serde_json::from_value(original.clone()).unwrap();
        let reserialized = serde_json::to_value(&state).unwrap();
        assert_eq!(original, reserialized);
    }

    #[test]
    fn test_round_trip_keeps_optional_keys_as_given() {
        let original = json!({
            "version": 4,
            "serial": 3,
            "lineage": "l",
            "terraform_version": "1.5.7",
            "resources": [
                { "mode": "managed", "type": "t", "name": "no_provider", "instances": [] },
                {
                    "module": "",
                    "mode": "managed",
                    "type": "t",
                    "name": "empty_module",
                    "provider": "",
                    "instances": []
                },
                {
                    "mode": "managed",
                    "type": "t",
                    "name": "null_attributes",
                    "instances": [
                        { "schema_version": 0, "attributes": null },
                        { "schema_version": 0 }
                    ]
                }
            ]
        });
        let state: StateDocument = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(state.outputs, None);
        assert_eq!(state.resources[0].provider, None);
        assert_eq!(state.resources[1].module.as_deref(), Some(""));
        assert_eq!(state.resources[2].instances[0].attributes, Some(Value::Null));
        assert_eq!(state.resources[2].instances[1].attributes, None);
        assert_eq!(serde_json::to_value(&state).unwrap(), original);
    }

    #[test]
    fn test_merge_attributes_replaces_null() {
        let mut instance: Instance =
            serde_json::from_value(json!({ "attributes": null, "schema_version": 0 })).unwrap();
        assert_eq!(instance.attribute_map(), None);
        instance.merge_attributes(json!({ "id": "x" }).as_object().unwrap());
        assert_eq!(
            serde_json::to_value(&instance).unwrap(),
            json!({ "attributes": { "id": "x" }, "schema_version": 0 })
        );
    }

    #[test]
    fn test_address() {
        let state = StateDocument::from_json_slice(EXAMPLE.as_bytes()).unwrap();
        assert_eq!(state.resources[0].address(), "aws_s3_bucket.logs");
        assert_eq!(
            state.resources[1].address(),
            "module.network.data.aws_availability_zones.available"
        );
    }

    #[test]
    fn test_minimal_document() {
        let state = StateDocument::from_json_slice(br#"{"version": 4}"#).unwrap();
        assert!(state.is_blank());
        assert_eq!(state.outputs, None);
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_fresh_is_not_blank() {
        let state = StateDocument::fresh(4, "1.5.7".to_string(), vec![]);
        assert_eq!(state.serial, 1);
        assert_eq!(state.lineage, "");
        assert!(!state.is_blank());
    }

    #[test]
    fn test_invalid_json() {
        assert!(StateDocument::from_json_slice(br#"{"version": 4"#).is_err());
        assert!(StateDocument::from_json_slice(br#"[]"#).is_err());
        assert!(StateDocument::from_json_slice(br#"{"serial": 1}"#).is_err());
    }
}
