//! # Metadata Extraction
//!
//! Read-only queries over a loaded node graph. Each extractor answers one
//! question the deployment needs besides the Heat template itself.

mod flavor;
mod image;
mod mgmt;
mod monitoring;
mod units;

pub use flavor::{get_flavor_dict, ExtraSpecs, FlavorSpec};
pub use image::{get_image_dict, ImageSpec};
pub use mgmt::{get_mgmt_driver, get_mgmt_ports, MgmtPorts};
pub use monitoring::{get_vdu_monitoring, FailureAction, MonitoringPolicy, MonitoringSpec};

use crate::error::Result;
use crate::graph::{NodeGraph, NodeTemplate};
use crate::heat::{ResourceKind, ResourceTable};
use crate::lineage::types;

/// Every VDU-derived node, in graph order
pub fn find_vdus(graph: &NodeGraph) -> Vec<&NodeTemplate> {
    graph.nodes_derived_from(types::VDU).collect()
}

/// Flavor and image resources to synthesize into the Heat template
pub fn get_resources_dict(
    graph: &NodeGraph,
    flavor_extra_specs: Option<&ExtraSpecs>,
) -> Result<ResourceTable> {
    let mut table = ResourceTable::new();

    for (vdu, flavor) in get_flavor_dict(graph, flavor_extra_specs)? {
        table.insert(ResourceKind::Flavor, vdu, serde_yaml::to_value(flavor)?)?;
    }
    for (vdu, image) in get_image_dict(graph)? {
        table.insert(ResourceKind::Image, vdu, serde_yaml::to_value(image)?)?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::TypeLineage;
    use serde_yaml::Value;

    pub(crate) fn load(descriptor: &str) -> NodeGraph {
        let doc: Value = serde_yaml::from_str(descriptor).unwrap();
        NodeGraph::from_descriptor(&doc, TypeLineage::tacker()).unwrap()
    }

    #[test]
    fn test_find_vdus() {
        let graph = load(include_str!("../../tests/data/tosca_openwrt.yaml"));
        let vdus = find_vdus(&graph);

        assert_eq!(vdus.len(), 1);
        for vdu in vdus {
            assert!(graph.is_derived_from(vdu, types::TACKER_VDU));
        }
    }

    #[test]
    fn test_resources_dict_combines_flavor_and_image() {
        let graph = load(include_str!("../../tests/data/tosca_image.yaml"));
        let table = get_resources_dict(&graph, None).unwrap();

        let flavor = table.get(ResourceKind::Flavor, "VDU1").unwrap();
        assert_eq!(flavor.get("vcpus"), Some(&Value::from(1)));
        assert_eq!(flavor.get("ram"), Some(&Value::from(512)));
        assert!(flavor.get("extra_specs").is_none());

        let image = table.get(ResourceKind::Image, "VDU1").unwrap();
        assert_eq!(
            image.get("location"),
            Some(&Value::from("http://URL/v1/openwrt.qcow2"))
        );
    }

    #[test]
    fn test_resources_dict_empty_for_named_flavor() {
        let graph = load(include_str!("../../tests/data/tosca_openwrt.yaml"));
        let table = get_resources_dict(&graph, None).unwrap();
        assert!(table.is_empty());
    }
}
