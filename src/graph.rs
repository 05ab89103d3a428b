//! # Node Graph
//!
//! Typed node graph consumed by the extractors and rewritten in place by the
//! sanitizer. [`NodeGraph::from_descriptor`] lifts an already-validated
//! descriptor document into this shape; it does not check TOSCA grammar.

use crate::error::{Result, TranslateError};
use crate::lineage::{types, TypeLineage};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// Property mapping of a node or capability, in document order
pub type Properties = Mapping;

/// Outgoing requirement of a node
#[derive(Debug, Clone, PartialEq)]
pub struct Requirement {
    pub name: String,
    pub node: String,
    pub relationship: String,
}

impl Requirement {
    /// Requirement whose relationship is implied by its name
    pub fn new(name: impl Into<String>, node: impl Into<String>) -> Self {
        let name = name.into();
        let relationship = default_relationship(&name).to_string();
        Self {
            name,
            node: node.into(),
            relationship,
        }
    }
}

fn default_relationship(requirement: &str) -> &'static str {
    match requirement {
        "virtualBinding" => types::BINDS_TO,
        "virtualLink" => types::LINKS_TO,
        "host" => types::HOSTED_ON,
        _ => types::DEPENDS_ON,
    }
}

/// Artifact attached to a node (e.g. a VM image)
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub name: String,
    pub type_name: Option<String>,
    pub file: Option<String>,
}

/// A node (or policy) template of the graph
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    pub name: String,
    pub type_name: String,
    pub properties: Properties,
    pub capabilities: BTreeMap<String, Properties>,
    pub requirements: Vec<Requirement>,
    pub artifacts: Vec<Artifact>,
    /// Nodes a policy applies to; empty for ordinary nodes
    pub targets: Vec<String>,
}

impl NodeTemplate {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            properties: Properties::new(),
            capabilities: BTreeMap::new(),
            requirements: Vec::new(),
            artifacts: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(Value::from(name), value.into());
        self
    }

    pub fn with_capability(mut self, name: &str, properties: Properties) -> Self {
        self.capabilities.insert(name.to_string(), properties);
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.extend(targets.into_iter().map(Into::into));
        self
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn capability(&self, name: &str) -> Option<&Properties> {
        self.capabilities.get(name)
    }
}

/// Graph of node templates sharing one type lineage
#[derive(Debug, Clone)]
pub struct NodeGraph {
    lineage: TypeLineage,
    nodes: Vec<NodeTemplate>,
}

impl NodeGraph {
    pub fn new(lineage: TypeLineage) -> Self {
        Self {
            lineage,
            nodes: Vec::new(),
        }
    }

    /// Add a node. Its type must be known to the lineage table.
    pub fn add_node(&mut self, node: NodeTemplate) -> Result<()> {
        if !self.lineage.contains(&node.type_name) {
            return Err(TranslateError::UnknownType {
                node: node.name.clone(),
                type_name: node.type_name.clone(),
            });
        }
        if self.node(&node.name).is_some() {
            return Err(TranslateError::DuplicateNode(node.name));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Build a graph from a descriptor document
    pub fn from_descriptor(descriptor: &Value, mut lineage: TypeLineage) -> Result<Self> {
        let doc = descriptor.as_mapping().ok_or_else(|| {
            TranslateError::MalformedDescriptor("descriptor is not a mapping".to_string())
        })?;

        for section in [
            "node_types",
            "relationship_types",
            "policy_types",
            "artifact_types",
        ] {
            if let Some(definitions) = doc.get(section) {
                let definitions = definitions.as_mapping().ok_or_else(|| {
                    TranslateError::MalformedDescriptor(format!("'{}' is not a mapping", section))
                })?;
                lineage.register_definitions(definitions)?;
            }
        }

        let topology = doc
            .get("topology_template")
            .and_then(Value::as_mapping)
            .ok_or_else(|| {
                TranslateError::MalformedDescriptor("missing 'topology_template'".to_string())
            })?;
        let templates = topology
            .get("node_templates")
            .and_then(Value::as_mapping)
            .ok_or_else(|| {
                TranslateError::MalformedDescriptor("missing 'node_templates'".to_string())
            })?;

        let mut graph = Self::new(lineage);

        for (name, template) in templates {
            let name = key_str(name)?;
            graph.add_node(parse_node_template(name, template)?)?;
        }

        if let Some(policies) = topology.get("policies") {
            for (name, policy) in policy_entries(policies)? {
                graph.add_node(parse_policy(name, policy)?)?;
            }
        }

        tracing::debug!("[VNFD] Loaded graph with {} nodes", graph.nodes.len());
        Ok(graph)
    }

    pub fn lineage(&self) -> &TypeLineage {
        &self.lineage
    }

    pub fn nodes(&self) -> &[NodeTemplate] {
        &self.nodes
    }

    pub fn node(&self, name: &str) -> Option<&NodeTemplate> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// True when the node's type is `ancestor` or derives from it
    pub fn is_derived_from(&self, node: &NodeTemplate, ancestor: &str) -> bool {
        self.lineage.is_derived_from(&node.type_name, ancestor)
    }

    /// Nodes derived from `ancestor`, in graph order
    pub fn nodes_derived_from<'a>(
        &'a self,
        ancestor: &'a str,
    ) -> impl Iterator<Item = &'a NodeTemplate> + 'a {
        self.nodes
            .iter()
            .filter(move |n| self.lineage.is_derived_from(&n.type_name, ancestor))
    }

    pub(crate) fn parts_mut(&mut self) -> (&TypeLineage, &mut Vec<NodeTemplate>) {
        (&self.lineage, &mut self.nodes)
    }
}

fn key_str(key: &Value) -> Result<&str> {
    key.as_str().ok_or_else(|| {
        TranslateError::MalformedDescriptor(format!("expected a string key, found {:?}", key))
    })
}

fn sub_mapping(owner: &str, template: &Mapping, key: &str) -> Result<Properties> {
    match template.get(key) {
        None | Some(Value::Null) => Ok(Properties::new()),
        Some(Value::Mapping(m)) => Ok(m.clone()),
        Some(_) => Err(TranslateError::MalformedDescriptor(format!(
            "'{}' of '{}' is not a mapping",
            key, owner
        ))),
    }
}

fn template_type(owner: &str, template: &Mapping) -> Result<String> {
    template
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TranslateError::missing(owner, "type"))
}

fn parse_node_template(name: &str, template: &Value) -> Result<NodeTemplate> {
    let template = template.as_mapping().ok_or_else(|| {
        TranslateError::MalformedDescriptor(format!("node template '{}' is not a mapping", name))
    })?;

    let mut node = NodeTemplate::new(name, template_type(name, template)?);
    node.properties = sub_mapping(name, template, "properties")?;

    for (cap_name, capability) in &sub_mapping(name, template, "capabilities")? {
        let cap_name = key_str(cap_name)?;
        let properties = match capability.get("properties") {
            None | Some(Value::Null) => Properties::new(),
            Some(Value::Mapping(m)) => m.clone(),
            Some(_) => {
                return Err(TranslateError::MalformedDescriptor(format!(
                    "properties of capability '{}' on '{}' are not a mapping",
                    cap_name, name
                )))
            }
        };
        node.capabilities.insert(cap_name.to_string(), properties);
    }

    if let Some(requirements) = template.get("requirements") {
        let requirements = requirements.as_sequence().ok_or_else(|| {
            TranslateError::MalformedDescriptor(format!("requirements of '{}' are not a list", name))
        })?;
        for entry in requirements {
            node.requirements.extend(parse_requirement(name, entry)?);
        }
    }

    for (art_name, artifact) in &sub_mapping(name, template, "artifacts")? {
        let art_name = key_str(art_name)?.to_string();
        let artifact = match artifact {
            Value::String(file) => Artifact {
                name: art_name,
                type_name: None,
                file: Some(file.clone()),
            },
            Value::Mapping(m) => Artifact {
                name: art_name,
                type_name: m.get("type").and_then(Value::as_str).map(str::to_string),
                file: m.get("file").and_then(Value::as_str).map(str::to_string),
            },
            _ => {
                return Err(TranslateError::MalformedDescriptor(format!(
                    "artifact '{}' on '{}' is neither a file nor a mapping",
                    art_name, name
                )))
            }
        };
        node.artifacts.push(artifact);
    }

    Ok(node)
}

fn parse_requirement(owner: &str, entry: &Value) -> Result<Vec<Requirement>> {
    let entry = entry.as_mapping().ok_or_else(|| {
        TranslateError::MalformedDescriptor(format!("requirement of '{}' is not a mapping", owner))
    })?;

    let mut requirements = Vec::new();
    for (req_name, target) in entry {
        let req_name = key_str(req_name)?;
        let requirement = match target {
            Value::String(node) => Requirement::new(req_name, node.as_str()),
            Value::Mapping(m) => {
                let node = m.get("node").and_then(Value::as_str).ok_or_else(|| {
                    TranslateError::MalformedDescriptor(format!(
                        "requirement '{}' of '{}' has no target node",
                        req_name, owner
                    ))
                })?;
                let mut requirement = Requirement::new(req_name, node);
                match m.get("relationship") {
                    Some(Value::String(rel)) => requirement.relationship = rel.clone(),
                    Some(Value::Mapping(rel)) => {
                        if let Some(rel) = rel.get("type").and_then(Value::as_str) {
                            requirement.relationship = rel.to_string();
                        }
                    }
                    _ => {}
                }
                requirement
            }
            _ => {
                return Err(TranslateError::MalformedDescriptor(format!(
                    "requirement '{}' of '{}' is malformed",
                    req_name, owner
                )))
            }
        };
        requirements.push(requirement);
    }
    Ok(requirements)
}

/// Policies appear either as a list of single-key mappings or as one mapping
fn policy_entries(policies: &Value) -> Result<Vec<(&str, &Value)>> {
    let mut entries = Vec::new();
    match policies {
        Value::Null => {}
        Value::Mapping(m) => {
            for (name, policy) in m {
                entries.push((key_str(name)?, policy));
            }
        }
        Value::Sequence(list) => {
            for item in list {
                let item = item.as_mapping().ok_or_else(|| {
                    TranslateError::MalformedDescriptor("policy entry is not a mapping".to_string())
                })?;
                for (name, policy) in item {
                    entries.push((key_str(name)?, policy));
                }
            }
        }
        _ => {
            return Err(TranslateError::MalformedDescriptor(
                "'policies' is neither a list nor a mapping".to_string(),
            ))
        }
    }
    Ok(entries)
}

fn parse_policy(name: &str, policy: &Value) -> Result<NodeTemplate> {
    let policy = policy.as_mapping().ok_or_else(|| {
        TranslateError::MalformedDescriptor(format!("policy '{}' is not a mapping", name))
    })?;

    let mut node = NodeTemplate::new(name, template_type(name, policy)?);
    node.properties = sub_mapping(name, policy, "properties")?;

    if let Some(targets) = policy.get("targets") {
        let targets = targets.as_sequence().ok_or_else(|| {
            TranslateError::MalformedDescriptor(format!("targets of '{}' are not a list", name))
        })?;
        for target in targets {
            node.targets.push(key_str(target)?.to_string());
        }
    }

    Ok(node)
}
