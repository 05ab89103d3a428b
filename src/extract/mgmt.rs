use crate::error::{Result, TranslateError};
use crate::graph::NodeGraph;
use crate::lineage::types;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// `mgmt_ip-<VDU>` -> management connection point
pub type MgmtPorts = BTreeMap<String, String>;

const MGMT_IP_PREFIX: &str = "mgmt_ip-";

/// The management driver shared by the VNF's VDUs, if any declares one
pub fn get_mgmt_driver(graph: &NodeGraph) -> Result<Option<String>> {
    let mut driver: Option<String> = None;

    for vdu in graph.nodes_derived_from(types::VDU) {
        let declared = match vdu.property("mgmt_driver") {
            None | Some(Value::Null) => continue,
            Some(Value::String(d)) => d,
            Some(_) => return Err(TranslateError::invalid(&vdu.name, "mgmt_driver", "expected a string")),
        };

        match &driver {
            Some(existing) if existing != declared => {
                return Err(TranslateError::MultipleMgmtDrivers {
                    first: existing.clone(),
                    second: declared.clone(),
                })
            }
            Some(_) => {}
            None => driver = Some(declared.clone()),
        }
    }

    Ok(driver)
}

/// Management connection point of every VDU that has one
pub fn get_mgmt_ports(graph: &NodeGraph) -> Result<MgmtPorts> {
    let mut ports = MgmtPorts::new();

    for cp in graph.nodes_derived_from(types::CP) {
        let management = cp
            .property("management")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !management {
            continue;
        }

        let vdu = cp.requirements.iter().find(|req| {
            graph.lineage().is_derived_from(&req.relationship, types::BINDS_TO)
                && graph
                    .node(&req.node)
                    .map(|n| graph.is_derived_from(n, types::VDU))
                    .unwrap_or(false)
        });
        let Some(binding) = vdu else {
            tracing::warn!("[VNFD] Management port {} is not bound to any VDU", cp.name);
            continue;
        };

        let key = format!("{}{}", MGMT_IP_PREFIX, binding.node);
        if let Some(first) = ports.get(&key) {
            return Err(TranslateError::DuplicateManagementPort {
                vdu: binding.node.clone(),
                first: first.clone(),
                second: cp.name.clone(),
            });
        }
        ports.insert(key, cp.name.clone());
    }

    Ok(ports)
}
