//! # Type Lineage
//!
//! Single-inheritance type table used to classify nodes, policies,
//! relationships and artifacts. Every classification in the compiler goes
//! through [`TypeLineage::is_derived_from`].

use crate::error::{Result, TranslateError};
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;

/// Well-known type identifiers of the base type library
pub mod types {
    pub const NODE_ROOT: &str = "tosca.nodes.Root";
    pub const COMPUTE: &str = "tosca.nodes.Compute";
    pub const VNF: &str = "tosca.nodes.nfv.VNF";
    pub const VDU: &str = "tosca.nodes.nfv.VDU";
    pub const TACKER_VDU: &str = "tosca.nodes.nfv.VDU.Tacker";
    pub const CP: &str = "tosca.nodes.nfv.CP";
    pub const TACKER_CP: &str = "tosca.nodes.nfv.CP.Tacker";
    pub const VL: &str = "tosca.nodes.nfv.VL";

    pub const POLICY_ROOT: &str = "tosca.policies.Root";
    pub const POLICY_MONITORING: &str = "tosca.policies.Monitoring";
    pub const POLICY_PLACEMENT: &str = "tosca.policies.Placement";
    pub const MONITORING: &str = "tosca.policies.tacker.Monitoring";
    pub const FAILURE: &str = "tosca.policies.tacker.Failure";
    pub const PLACEMENT: &str = "tosca.policies.tacker.Placement";

    pub const RELATIONSHIP_ROOT: &str = "tosca.relationships.Root";
    pub const DEPENDS_ON: &str = "tosca.relationships.DependsOn";
    pub const HOSTED_ON: &str = "tosca.relationships.HostedOn";
    pub const BINDS_TO: &str = "tosca.relationships.network.BindsTo";
    pub const LINKS_TO: &str = "tosca.relationships.network.LinksTo";

    pub const ARTIFACT_ROOT: &str = "tosca.artifacts.Root";
    pub const DEPLOYMENT: &str = "tosca.artifacts.Deployment";
    pub const DEPLOYMENT_IMAGE: &str = "tosca.artifacts.Deployment.Image";
    pub const IMAGE_VM: &str = "tosca.artifacts.Deployment.Image.VM";
}

/// Explicit `type -> parent` table
#[derive(Debug, Clone, Default)]
pub struct TypeLineage {
    parents: HashMap<String, Option<String>>,
}

impl TypeLineage {
    /// Create an empty lineage table
    pub fn new() -> Self {
        Self::default()
    }

    /// Lineage table pre-loaded with the Tacker base type library
    pub fn tacker() -> Self {
        use types::*;

        let mut lineage = Self::new();
        let hierarchy: &[(&str, Option<&str>)] = &[
            (NODE_ROOT, None),
            (COMPUTE, Some(NODE_ROOT)),
            (VNF, Some(NODE_ROOT)),
            (VDU, Some(NODE_ROOT)),
            (TACKER_VDU, Some(VDU)),
            (CP, Some(NODE_ROOT)),
            (TACKER_CP, Some(CP)),
            (VL, Some(NODE_ROOT)),
            (POLICY_ROOT, None),
            (POLICY_MONITORING, Some(POLICY_ROOT)),
            (POLICY_PLACEMENT, Some(POLICY_ROOT)),
            (MONITORING, Some(POLICY_MONITORING)),
            (FAILURE, Some(POLICY_ROOT)),
            (PLACEMENT, Some(POLICY_PLACEMENT)),
            (RELATIONSHIP_ROOT, None),
            (DEPENDS_ON, Some(RELATIONSHIP_ROOT)),
            (HOSTED_ON, Some(RELATIONSHIP_ROOT)),
            (BINDS_TO, Some(DEPENDS_ON)),
            (LINKS_TO, Some(DEPENDS_ON)),
            (ARTIFACT_ROOT, None),
            (DEPLOYMENT, Some(ARTIFACT_ROOT)),
            (DEPLOYMENT_IMAGE, Some(DEPLOYMENT)),
            (IMAGE_VM, Some(DEPLOYMENT_IMAGE)),
        ];

        for (name, parent) in hierarchy {
            lineage
                .parents
                .insert(name.to_string(), parent.map(str::to_string));
        }

        lineage
    }

    /// Define a type. The parent, if any, must already be known.
    pub fn define(&mut self, type_name: &str, parent: Option<&str>) -> Result<()> {
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(TranslateError::UnknownType {
                    node: type_name.to_string(),
                    type_name: parent.to_string(),
                });
            }
        }

        if let Some(existing) = self.parents.get(type_name) {
            if existing.as_deref() == parent {
                return Ok(());
            }
            return Err(TranslateError::TypeRedefined {
                type_name: type_name.to_string(),
                existing: existing.clone().unwrap_or_else(|| "<root>".to_string()),
                requested: parent.unwrap_or("<root>").to_string(),
            });
        }

        self.parents
            .insert(type_name.to_string(), parent.map(str::to_string));
        Ok(())
    }

    /// Register a `*_types` section of a descriptor.
    ///
    /// Entries may reference each other in any order; a pass that makes no
    /// progress means some chain never reaches a known type.
    pub fn register_definitions(&mut self, definitions: &Mapping) -> Result<()> {
        let mut pending: Vec<(String, Option<String>)> = Vec::new();
        for (name, definition) in definitions {
            let name = name.as_str().ok_or_else(|| {
                TranslateError::MalformedDescriptor("type names must be strings".to_string())
            })?;
            let parent = definition
                .get("derived_from")
                .and_then(Value::as_str)
                .map(str::to_string);
            pending.push((name.to_string(), parent));
        }

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();

            for (name, parent) in pending {
                match parent.as_deref() {
                    Some(p) if !self.contains(p) => deferred.push((name, parent)),
                    _ => self.define(&name, parent.as_deref())?,
                }
            }

            if deferred.len() == before {
                let (name, parent) = &deferred[0];
                return Err(TranslateError::UnknownType {
                    node: name.clone(),
                    type_name: parent.clone().unwrap_or_default(),
                });
            }
            pending = deferred;
        }

        Ok(())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.parents.contains_key(type_name)
    }

    pub fn parent(&self, type_name: &str) -> Option<&str> {
        self.parents.get(type_name).and_then(|p| p.as_deref())
    }

    /// The type itself followed by each ancestor up to the root
    pub fn ancestors<'a>(&'a self, type_name: &'a str) -> Ancestors<'a> {
        Ancestors {
            lineage: self,
            next: Some(type_name),
        }
    }

    /// True when `type_name` is `ancestor` or derives from it
    pub fn is_derived_from(&self, type_name: &str, ancestor: &str) -> bool {
        self.ancestors(type_name).any(|t| t == ancestor)
    }
}

/// Iterator over a type's lineage, nearest first
pub struct Ancestors<'a> {
    lineage: &'a TypeLineage,
    next: Option<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.lineage.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::types::*;
    use super::*;

    #[test]
    fn test_reflexive() {
        let lineage = TypeLineage::tacker();
        assert!(lineage.is_derived_from(TACKER_VDU, TACKER_VDU));
        assert!(lineage.is_derived_from(NODE_ROOT, NODE_ROOT));
    }

    #[test]
    fn test_transitive() {
        let lineage = TypeLineage::tacker();
        assert!(lineage.is_derived_from(TACKER_VDU, VDU));
        assert!(lineage.is_derived_from(TACKER_VDU, NODE_ROOT));
        assert!(lineage.is_derived_from(MONITORING, POLICY_ROOT));
        assert!(lineage.is_derived_from(BINDS_TO, DEPENDS_ON));
    }

    #[test]
    fn test_unrelated_types() {
        let lineage = TypeLineage::tacker();
        assert!(!lineage.is_derived_from(TACKER_CP, VDU));
        assert!(!lineage.is_derived_from(VDU, TACKER_VDU));
        assert!(!lineage.is_derived_from(FAILURE, POLICY_MONITORING));
    }

    #[test]
    fn test_ancestors_order() {
        let lineage = TypeLineage::tacker();
        let chain: Vec<_> = lineage.ancestors(TACKER_VDU).collect();
        assert_eq!(chain, vec![TACKER_VDU, VDU, NODE_ROOT]);
    }

    #[test]
    fn test_define_requires_known_parent() {
        let mut lineage = TypeLineage::tacker();
        let err = lineage.define("acme.nodes.Firewall", Some("acme.nodes.Base"));
        assert!(matches!(err, Err(TranslateError::UnknownType { .. })));
    }

    #[test]
    fn test_redefinition_with_other_parent_rejected() {
        let mut lineage = TypeLineage::tacker();
        lineage.define(TACKER_VDU, Some(VDU)).unwrap();
        let err = lineage.define(TACKER_VDU, Some(NODE_ROOT));
        assert!(matches!(err, Err(TranslateError::TypeRedefined { .. })));
    }

    #[test]
    fn test_register_definitions_out_of_order() {
        let defs: Mapping = serde_yaml::from_str(
            r#"
acme.nodes.FirewallVDU:
  derived_from: acme.nodes.BaseVDU
acme.nodes.BaseVDU:
  derived_from: tosca.nodes.nfv.VDU.Tacker
"#,
        )
        .unwrap();

        let mut lineage = TypeLineage::tacker();
        lineage.register_definitions(&defs).unwrap();

        assert!(lineage.is_derived_from("acme.nodes.FirewallVDU", VDU));
        assert_eq!(lineage.parent("acme.nodes.BaseVDU"), Some(TACKER_VDU));
    }

    #[test]
    fn test_register_definitions_dangling_chain() {
        let defs: Mapping = serde_yaml::from_str(
            r#"
acme.nodes.A:
  derived_from: acme.nodes.Missing
"#,
        )
        .unwrap();

        let mut lineage = TypeLineage::tacker();
        let err = lineage.register_definitions(&defs).unwrap_err();
        assert!(err.to_string().contains("acme.nodes.Missing"));
    }
}
