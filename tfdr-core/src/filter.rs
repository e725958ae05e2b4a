//! Selection of resources for copy and delete operations.
//!
//! A [`FilterRuleSet`] is read from a JSON file:
//!
//! ```json
//! {
//!   "globalResourceTypes": ["aws_iam_role"],
//!   "filters": [
//!     {
//!       "filterProperties": { "module": "module.a", "type": "aws_s3_bucket", "name": "logs" },
//!       "newProperties": { "name": "logs_dr", "attributes": { "bucket": "logs-dr" } }
//!     }
//!   ]
//! }
//! ```
//!
//! Copy keeps global types unchanged and listed resources (renamed), and drops
//! everything else. Delete drops global types and listed resources, and keeps
//! everything else. Global types are checked first in both cases, so a rule
//! naming a global-typed resource is never consulted.
//!
//! Unknown keys anywhere in the file are rejected rather than ignored, so a
//! misspelled key such as `filterProperty` fails the load instead of silently
//! matching nothing. Rule files carrying extra keys of their own must have
//! those keys removed.

use std::{collections::BTreeSet, path::Path};

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{error::FilterConfigError, state::Resource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterRuleSet {
    /// Resource types that bypass the named rules.
    #[serde(default)]
    pub global_resource_types: BTreeSet<String>,
    #[serde(default)]
    pub filters: Vec<FilterRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterRule {
    #[serde(rename = "filterProperties")]
    pub matches: ResourceMatch,
    /// Only used when copying.
    #[serde(default)]
    pub new_properties: NewProperties,
}

/// Exact (module, type, name) match against managed resources.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceMatch {
    #[serde(default)]
    pub module: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewProperties {
    #[serde(default)]
    pub name: Option<String>,
    /// Overwrites these keys of the first instance's attributes.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPolicy {
    /// Allow-list: keep global types and listed resources.
    Copy,
    /// Block-list: drop global types and listed resources.
    Delete,
}

impl FilterRuleSet {
    pub fn load(path: &Path) -> Result<FilterRuleSet, FilterConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| FilterConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents).map_err(|source| FilterConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json_str(s: &str) -> serde_json::Result<FilterRuleSet> {
        serde_json::from_str(s)
    }

    pub fn is_global(&self, resource: &Resource) -> bool {
        self.global_resource_types.contains(&resource.type_)
    }

    /// The first rule matching the resource, if any.
    pub fn find_rule(&self, resource: &Resource) -> Option<&FilterRule> {
        self.filters.iter().find(|rule| rule.matches.matches(resource))
    }
}

impl ResourceMatch {
    pub fn matches(&self, resource: &Resource) -> bool {
        resource.is_managed()
            && resource.module_path() == self.module
            && resource.type_ == self.type_
            && resource.name == self.name
    }
}

impl NewProperties {
    /// Returns a renamed copy of `resource`.
    pub fn apply_to(&self, resource: &Resource) -> Resource {
        let mut renamed = resource.clone();
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            renamed.name = name.to_string();
        }
        if !self.attributes.is_empty() {
            match renamed.instances.first_mut() {
                Some(instance) => instance.merge_attributes(&self.attributes),
                None => warn!(
                    resource = %resource.address(),
                    "resource has no instances; attribute overrides not applied"
                ),
            }
        }
        renamed
    }
}

/// Applies `policy` to each resource and returns the survivors, in input order.
///
/// The input is not modified.
pub fn apply_filter(
    resources: &[Resource],
    policy: FilterPolicy,
    rules: &FilterRuleSet,
) -> Vec<Resource> {
    resources
        .iter()
        .filter_map(|resource| filter_resource(resource, policy, rules))
        .collect()
}

fn filter_resource(
    resource: &Resource,
    policy: FilterPolicy,
    rules: &FilterRuleSet,
) -> Option<Resource> {
    let global = rules.is_global(resource);
    match policy {
        FilterPolicy::Copy => {
            if global {
                debug!(resource = %resource.address(), "keeping global resource");
                return Some(resource.clone());
            }
            match rules.find_rule(resource) {
                Some(rule) => {
                    let kept = rule.new_properties.apply_to(resource);
                    debug!(resource = %resource.address(), to = %kept.address(), "copying listed resource");
                    Some(kept)
                }
                None => {
                    debug!(resource = %resource.address(), "dropping unlisted resource");
                    None
                }
            }
        }
        FilterPolicy::Delete => {
            if global || rules.find_rule(resource).is_some() {
                debug!(resource = %resource.address(), global, "deleting resource");
                None
            } else {
                Some(resource.clone())
            }
        }
    }
}
