//! # Heat Template Post-Processing
//!
//! Finishes the template produced by the structural translator: management
//! address outputs, relocation of properties the engine does not accept, and
//! the flavor/image resources that have no node of their own in the graph.

mod outputs;
mod resources;

pub use outputs::add_mgmt_outputs;
pub use resources::{add_resources_tpl, convert_unsupported_res_prop, UnsupportedProperties};

use crate::error::{Result, TranslateError};
use crate::extract::MgmtPorts;
use crate::graph::Properties;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Resource synthesized after structural translation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Flavor,
    Image,
}

impl ResourceKind {
    /// Property of the compute resource that references this kind
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Flavor => "flavor",
            ResourceKind::Image => "image",
        }
    }

    pub fn heat_type(self) -> &'static str {
        match self {
            ResourceKind::Flavor => "OS::Nova::Flavor",
            ResourceKind::Image => "OS::Glance::Image",
        }
    }

    /// Resource name for a VDU, e.g. `VDU1_flavor`
    pub fn resource_name(self, vdu: &str) -> String {
        format!("{}_{}", vdu, self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// kind -> VDU -> resource properties
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTable(BTreeMap<ResourceKind, BTreeMap<String, Properties>>);

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the properties of one resource. `properties` must be a mapping.
    pub fn insert(&mut self, kind: ResourceKind, vdu: impl Into<String>, properties: Value) -> Result<()> {
        let vdu = vdu.into();
        let Value::Mapping(properties) = properties else {
            return Err(TranslateError::MalformedTemplate(format!(
                "{} properties of '{}' are not a mapping",
                kind, vdu
            )));
        };
        self.0.entry(kind).or_default().insert(vdu, properties);
        Ok(())
    }

    pub fn get(&self, kind: ResourceKind, vdu: &str) -> Option<&Properties> {
        self.0.get(&kind).and_then(|per_vdu| per_vdu.get(vdu))
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }

    /// Every `(kind, vdu, properties)` entry
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, &str, &Properties)> + '_ {
        self.0.iter().flat_map(|(kind, per_vdu)| {
            per_vdu
                .iter()
                .map(move |(vdu, props)| (*kind, vdu.as_str(), props))
        })
    }
}

/// Finish a serialized Heat template.
///
/// Adds one output per management port, relocates unsupported resource
/// properties when a table is given, injects the synthesized resources and
/// returns the re-serialized template.
pub fn post_process_heat_template(
    heat_tpl: &str,
    mgmt_ports: &MgmtPorts,
    res_tpl: &ResourceTable,
    unsupported: Option<&UnsupportedProperties>,
) -> Result<String> {
    let mut heat: Value = serde_yaml::from_str(heat_tpl)?;
    if !heat.is_mapping() {
        return Err(TranslateError::MalformedTemplate(
            "template is not a mapping".to_string(),
        ));
    }

    add_mgmt_outputs(&mut heat, mgmt_ports)?;

    if let Some(unsupported) = unsupported {
        convert_unsupported_res_prop(&mut heat, unsupported)?;
    }

    add_resources_tpl(&mut heat, res_tpl)?;

    tracing::info!(
        "[HEAT] Post-processed template ({} outputs added)",
        mgmt_ports.len()
    );
    Ok(serde_yaml::to_string(&heat)?)
}

/// Mutable `resources` section of a template
pub(crate) fn resources_mut(heat: &mut Value) -> Result<&mut serde_yaml::Mapping> {
    heat.get_mut("resources")
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| TranslateError::MalformedTemplate("missing 'resources' section".to_string()))
}
