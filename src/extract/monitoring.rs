use crate::error::{Result, TranslateError};
use crate::graph::{NodeGraph, Properties};
use crate::lineage::types;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// One `trigger -> action` pair of a monitoring policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureAction {
    pub trigger: String,
    pub action: String,
}

/// Monitoring bound to a single VDU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringPolicy {
    pub name: String,
    pub parameters: BTreeMap<String, String>,
    pub actions: Vec<FailureAction>,
}

/// Monitoring of every VDU, keyed by VDU name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSpec {
    pub vdus: BTreeMap<String, MonitoringPolicy>,
}

impl MonitoringSpec {
    pub fn is_empty(&self) -> bool {
        self.vdus.is_empty()
    }

    fn bind(&mut self, vdu: &str, policy: MonitoringPolicy) -> Result<()> {
        if self.vdus.contains_key(vdu) {
            return Err(TranslateError::DuplicateMonitoringPolicy(vdu.to_string()));
        }
        self.vdus.insert(vdu.to_string(), policy);
        Ok(())
    }
}

/// Collect the monitoring policies of all VDUs.
///
/// Policies come from Monitoring-derived policy nodes (bound through their
/// targets) and from a VDU's own `monitoring_policy` property.
pub fn get_vdu_monitoring(graph: &NodeGraph) -> Result<MonitoringSpec> {
    let mut spec = MonitoringSpec::default();

    for vdu in graph.nodes_derived_from(types::VDU) {
        match vdu.property("monitoring_policy") {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s == "noop" => {}
            Some(Value::Mapping(props)) => {
                let policy = parse_policy(&vdu.name, props)?;
                tracing::debug!("[VNFD] {} monitored by inline policy '{}'", vdu.name, policy.name);
                spec.bind(&vdu.name, policy)?;
            }
            Some(_) => {
                return Err(TranslateError::invalid(
                    &vdu.name,
                    "monitoring_policy",
                    "expected a mapping",
                ))
            }
        }
    }

    for node in graph.nodes_derived_from(types::POLICY_MONITORING) {
        let policy = parse_policy(&node.name, &node.properties)?;

        for target in &node.targets {
            let is_vdu = graph
                .node(target)
                .map(|t| graph.is_derived_from(t, types::VDU))
                .unwrap_or(false);
            if !is_vdu {
                return Err(TranslateError::InvalidPolicyTarget {
                    policy: node.name.clone(),
                    target: target.clone(),
                });
            }

            tracing::debug!("[VNFD] {} monitored by policy '{}'", target, node.name);
            spec.bind(target, policy.clone())?;
        }
    }

    Ok(spec)
}

fn parse_policy(owner: &str, props: &Properties) -> Result<MonitoringPolicy> {
    let name = props
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslateError::missing(owner, "name"))?
        .to_string();

    let mut parameters = BTreeMap::new();
    match props.get("parameters") {
        None | Some(Value::Null) => {}
        Some(Value::Mapping(params)) => {
            for (key, value) in params {
                let key = scalar_string(key)
                    .ok_or_else(|| TranslateError::invalid(owner, "parameters", "non-scalar key"))?;
                let value = scalar_string(value).ok_or_else(|| {
                    TranslateError::invalid(owner, "parameters", format!("'{}' is not a scalar", key))
                })?;
                parameters.insert(key, value);
            }
        }
        Some(_) => return Err(TranslateError::invalid(owner, "parameters", "expected a mapping")),
    }

    let actions = match props.get("actions") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Mapping(actions)) => actions
            .iter()
            .map(|(trigger, action)| {
                match (scalar_string(trigger), scalar_string(action)) {
                    (Some(trigger), Some(action)) => Ok(FailureAction { trigger, action }),
                    _ => Err(TranslateError::invalid(owner, "actions", "expected trigger: action pairs")),
                }
            })
            .collect::<Result<Vec<_>>>()?,
        Some(Value::Sequence(actions)) => actions
            .iter()
            .map(|entry| {
                serde_yaml::from_value::<FailureAction>(entry.clone())
                    .map_err(|e| TranslateError::invalid(owner, "actions", e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?,
        Some(_) => return Err(TranslateError::invalid(owner, "actions", "expected a mapping or a list")),
    };

    Ok(MonitoringPolicy {
        name,
        parameters,
        actions,
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
