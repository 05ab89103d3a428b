//! # Graph Sanitizer
//!
//! Strips everything the structural translator cannot turn into Heat
//! resources: policy nodes, orchestration-only properties, and properties
//! whose name or value differs in the Heat schema.
//!
//! Rules are keyed by type and apply to every node whose lineage includes
//! that type. Running the sanitizer again on its own output changes nothing.

use crate::error::{Result, TranslateError};
use crate::graph::NodeGraph;
use crate::lineage::types;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Per-type rewrite tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeRules {
    /// Nodes derived from any of these types are removed
    pub removed_types: Vec<String>,
    /// type -> properties deleted outright
    pub deleted_properties: BTreeMap<String, Vec<String>>,
    /// type -> property -> old value -> new value
    pub converted_values: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>,
    /// type -> old property name -> new property name
    pub renamed_properties: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for SanitizeRules {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            removed_types: strings(&[types::POLICY_MONITORING, types::FAILURE, types::POLICY_PLACEMENT]),
            deleted_properties: BTreeMap::from([
                (
                    types::TACKER_VDU.to_string(),
                    strings(&[
                        "mgmt_driver",
                        "config",
                        "service_type",
                        "placement_policy",
                        "monitoring_policy",
                        "metadata",
                        "failure_policy",
                    ]),
                ),
                (types::TACKER_CP.to_string(), strings(&["management"])),
            ]),
            converted_values: BTreeMap::from([(
                types::TACKER_CP.to_string(),
                BTreeMap::from([(
                    "type".to_string(),
                    BTreeMap::from([
                        ("sriov".to_string(), "direct".to_string()),
                        ("vnic".to_string(), "normal".to_string()),
                    ]),
                )]),
            )]),
            renamed_properties: BTreeMap::from([(
                types::TACKER_CP.to_string(),
                BTreeMap::from([
                    (
                        "anti_spoofing_protection".to_string(),
                        "port_security_enabled".to_string(),
                    ),
                    ("type".to_string(), "binding:vnic_type".to_string()),
                ]),
            )]),
        }
    }
}

/// What a sanitizer pass changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub removed_nodes: Vec<String>,
    pub deleted_properties: usize,
    pub converted_values: usize,
    pub renamed_properties: usize,
}

impl SanitizeReport {
    pub fn is_noop(&self) -> bool {
        self.removed_nodes.is_empty()
            && self.deleted_properties == 0
            && self.converted_values == 0
            && self.renamed_properties == 0
    }
}

/// Rewrite the graph in place so only Heat-representable content remains
pub fn post_process_template(graph: &mut NodeGraph, rules: &SanitizeRules) -> Result<SanitizeReport> {
    let mut report = SanitizeReport::default();
    let (lineage, nodes) = graph.parts_mut();

    nodes.retain(|node| {
        let removed = rules
            .removed_types
            .iter()
            .any(|t| lineage.is_derived_from(&node.type_name, t));
        if removed {
            tracing::debug!("[SANITIZE] Removing {} ({})", node.name, node.type_name);
            report.removed_nodes.push(node.name.clone());
        }
        !removed
    });

    for node in nodes.iter_mut() {
        let lineage_types: Vec<&str> = lineage.ancestors(&node.type_name).collect();

        for type_name in &lineage_types {
            for property in rules.deleted_properties.get(*type_name).into_iter().flatten() {
                if node.properties.shift_remove(property.as_str()).is_some() {
                    report.deleted_properties += 1;
                }
            }
        }

        // values first: conversion tables are keyed by the old property name
        for type_name in &lineage_types {
            for (property, mapping) in rules.converted_values.get(*type_name).into_iter().flatten() {
                let Some(Value::String(current)) = node.properties.get_mut(property.as_str()) else {
                    continue;
                };
                if let Some(converted) = mapping.get(current.as_str()) {
                    *current = converted.clone();
                    report.converted_values += 1;
                }
            }
        }

        for type_name in &lineage_types {
            for (from, to) in rules.renamed_properties.get(*type_name).into_iter().flatten() {
                let Some(value) = node.properties.shift_remove(from.as_str()) else {
                    continue;
                };
                if node.properties.contains_key(to.as_str()) {
                    return Err(TranslateError::PropertyConflict {
                        node: node.name.clone(),
                        property: from.clone(),
                        target: to.clone(),
                    });
                }
                node.properties.insert(Value::from(to.as_str()), value);
                report.renamed_properties += 1;
            }
        }
    }

    tracing::info!(
        "[SANITIZE] Removed {} nodes, deleted {} properties, converted {} values, renamed {} properties",
        report.removed_nodes.len(),
        report.deleted_properties,
        report.converted_values,
        report.renamed_properties
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::get_vdu_monitoring;
    use crate::graph::NodeTemplate;
    use crate::lineage::TypeLineage;

    fn openwrt() -> NodeGraph {
        let doc: Value = serde_yaml::from_str(include_str!("../tests/data/tosca_openwrt.yaml")).unwrap();
        NodeGraph::from_descriptor(&doc, TypeLineage::tacker()).unwrap()
    }

    #[test]
    fn test_removes_policy_nodes_and_keeps_vdus() {
        let mut graph = openwrt();
        let vdus_before = graph.nodes_derived_from(types::VDU).count();

        let report = post_process_template(&mut graph, &SanitizeRules::default()).unwrap();

        assert_eq!(
            report.removed_nodes,
            vec!["vdu1_monitoring", "vdu1_failure", "vdu1_placement"]
        );
        for node in graph.nodes() {
            assert!(!graph.is_derived_from(node, types::MONITORING));
            assert!(!graph.is_derived_from(node, types::FAILURE));
            assert!(!graph.is_derived_from(node, types::PLACEMENT));
        }
        assert_eq!(graph.nodes_derived_from(types::VDU).count(), vdus_before);
    }

    #[test]
    fn test_no_deleted_or_converted_property_remains() {
        let mut graph = openwrt();
        let rules = SanitizeRules::default();
        post_process_template(&mut graph, &rules).unwrap();

        for node in graph.nodes() {
            for (type_name, props) in &rules.deleted_properties {
                if graph.is_derived_from(node, type_name) {
                    for prop in props {
                        assert!(!node.has_property(prop), "{} kept {}", node.name, prop);
                    }
                }
            }
            for (type_name, renames) in &rules.renamed_properties {
                if graph.is_derived_from(node, type_name) {
                    for prop in renames.keys() {
                        assert!(!node.has_property(prop), "{} kept {}", node.name, prop);
                    }
                }
            }
        }
    }

    #[test]
    fn test_connection_point_rewrites() {
        let mut graph = openwrt();
        post_process_template(&mut graph, &SanitizeRules::default()).unwrap();

        let cp2 = graph.node("CP2").unwrap();
        assert_eq!(cp2.property("binding:vnic_type"), Some(&Value::from("direct")));
        assert_eq!(cp2.property("port_security_enabled"), Some(&Value::from(false)));

        let vdu = graph.node("VDU1").unwrap();
        assert_eq!(vdu.property("image"), Some(&Value::from("OpenWRT")));
        assert_eq!(vdu.property("flavor"), Some(&Value::from("m1.tiny")));
    }

    #[test]
    fn test_idempotent() {
        let mut graph = openwrt();
        let rules = SanitizeRules::default();

        post_process_template(&mut graph, &rules).unwrap();
        let once: Vec<NodeTemplate> = graph.nodes().to_vec();

        let report = post_process_template(&mut graph, &rules).unwrap();
        assert!(report.is_noop());
        assert_eq!(graph.nodes(), once.as_slice());
    }

    #[test]
    fn test_rules_follow_lineage() {
        let doc: Value = serde_yaml::from_str(
            r#"
node_types:
  acme.nodes.FirewallVDU:
    derived_from: tosca.nodes.nfv.VDU.Tacker
topology_template:
  node_templates:
    FW1:
      type: acme.nodes.FirewallVDU
      properties:
        image: fw
        mgmt_driver: noop
"#,
        )
        .unwrap();
        let mut graph = NodeGraph::from_descriptor(&doc, TypeLineage::tacker()).unwrap();

        post_process_template(&mut graph, &SanitizeRules::default()).unwrap();

        let fw = graph.node("FW1").unwrap();
        assert!(!fw.has_property("mgmt_driver"));
        assert!(fw.has_property("image"));
    }

    #[test]
    fn test_rename_conflict() {
        let mut graph = NodeGraph::new(TypeLineage::tacker());
        graph
            .add_node(
                NodeTemplate::new("CP1", types::TACKER_CP)
                    .with_property("anti_spoofing_protection", true)
                    .with_property("port_security_enabled", false),
            )
            .unwrap();

        let err = post_process_template(&mut graph, &SanitizeRules::default()).unwrap_err();
        assert!(matches!(err, TranslateError::PropertyConflict { .. }));
    }

    #[test]
    fn test_injected_rules() {
        let mut graph = NodeGraph::new(TypeLineage::tacker());
        graph
            .add_node(NodeTemplate::new("VL1", types::VL).with_property("vendor", "Tacker"))
            .unwrap();
        let rules = SanitizeRules {
            removed_types: Vec::new(),
            deleted_properties: BTreeMap::from([(types::VL.to_string(), vec!["vendor".to_string()])]),
            converted_values: BTreeMap::new(),
            renamed_properties: BTreeMap::new(),
        };

        let report = post_process_template(&mut graph, &rules).unwrap();

        assert_eq!(report.deleted_properties, 1);
        assert!(!graph.node("VL1").unwrap().has_property("vendor"));
    }

    #[test]
    fn test_extracted_monitoring_policies_are_removed() {
        let doc: Value = serde_yaml::from_str(
            r#"
topology_template:
  node_templates:
    VDU1:
      type: tosca.nodes.nfv.VDU.Tacker
  policies:
    - mon:
        type: tosca.policies.Monitoring
        targets: [VDU1]
        properties:
          name: ping
"#,
        )
        .unwrap();
        let mut graph = NodeGraph::from_descriptor(&doc, TypeLineage::tacker()).unwrap();

        let monitoring = get_vdu_monitoring(&graph).unwrap();
        assert!(monitoring.vdus.contains_key("VDU1"));

        let report = post_process_template(&mut graph, &SanitizeRules::default()).unwrap();

        assert_eq!(report.removed_nodes, vec!["mon"]);
        assert_eq!(graph.nodes_derived_from(types::POLICY_MONITORING).count(), 0);
    }

    #[test]
    fn test_custom_policy_types_are_removed() {
        let doc: Value = serde_yaml::from_str(
            r#"
policy_types:
  acme.policies.Heal:
    derived_from: tosca.policies.tacker.Failure
  acme.policies.Spread:
    derived_from: tosca.policies.tacker.Placement
topology_template:
  node_templates:
    VDU1:
      type: tosca.nodes.nfv.VDU.Tacker
  policies:
    - heal:
        type: acme.policies.Heal
        targets: [VDU1]
    - spread:
        type: acme.policies.Spread
        targets: [VDU1]
"#,
        )
        .unwrap();
        let mut graph = NodeGraph::from_descriptor(&doc, TypeLineage::tacker()).unwrap();

        let report = post_process_template(&mut graph, &SanitizeRules::default()).unwrap();

        assert_eq!(report.removed_nodes, vec!["heal", "spread"]);
        assert_eq!(graph.len(), 1);
    }
}
