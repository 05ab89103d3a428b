//! # VNFD Compiler
//!
//! Main entry points for compiling a VNF descriptor into a Heat template.

use crate::config::TranslatorConfig;
use crate::error::{Result, TranslateError};
use crate::extract::{self, MgmtPorts, MonitoringSpec};
use crate::graph::NodeGraph;
use crate::heat::{self, ResourceTable};
use crate::imports::update_imports;
use crate::lineage::TypeLineage;
use crate::sanitize::{post_process_template, SanitizeReport};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Turns a sanitized node graph into a serialized Heat template.
///
/// Implemented outside this crate; the compiler only prepares its input and
/// finishes its output.
pub trait StructuralTranslator {
    fn translate(&self, graph: &NodeGraph) -> Result<String>;
}

/// Everything a deployment needs from one descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledVnfd {
    pub heat_template: String,
    pub mgmt_driver: Option<String>,
    pub monitoring: MonitoringSpec,
    pub mgmt_ports: MgmtPorts,
    pub resources: ResourceTable,
    pub sanitized: SanitizeReport,
}

impl CompiledVnfd {
    /// Attribute map stored alongside the VNF, values JSON-encoded
    /// except the template itself
    pub fn attributes(&self) -> Result<BTreeMap<String, String>> {
        let mut attributes = BTreeMap::new();
        attributes.insert("heat_template".to_string(), self.heat_template.clone());
        if !self.monitoring.is_empty() {
            attributes.insert(
                "monitoring_policy".to_string(),
                serde_json::to_string(&self.monitoring)?,
            );
        }
        if !self.mgmt_ports.is_empty() {
            attributes.insert("mgmt_ports".to_string(), serde_json::to_string(&self.mgmt_ports)?);
        }
        Ok(attributes)
    }
}

/// Compile a descriptor document
///
/// # Arguments
///
/// * `descriptor` - VNFD text (YAML)
/// * `translator` - Structural graph-to-Heat translator
/// * `config` - Library location, flavor overlay and rewrite tables
///
/// # Returns
///
/// * `Ok(CompiledVnfd)` - Heat template plus deployment metadata
/// * `Err(TranslateError)` - The first fatal condition encountered
pub fn compile_descriptor(
    descriptor: &str,
    translator: &dyn StructuralTranslator,
    config: &TranslatorConfig,
) -> Result<CompiledVnfd> {
    let mut doc: Value = serde_yaml::from_str(descriptor)?;

    tracing::info!("[VNFD] Phase 0: Resolving base library imports...");
    update_imports(&mut doc, &config.base_library_dir)?;

    let graph = NodeGraph::from_descriptor(&doc, TypeLineage::tacker())?;
    compile_graph(graph, translator, config)
}

/// Compile an already loaded node graph
///
/// The graph is consumed: the sanitizer rewrites it before it reaches the
/// structural translator.
pub fn compile_graph(
    mut graph: NodeGraph,
    translator: &dyn StructuralTranslator,
    config: &TranslatorConfig,
) -> Result<CompiledVnfd> {
    tracing::info!("[VNFD] Starting VNFD compilation ({} nodes)", graph.len());

    tracing::info!("[VNFD] Phase 1: Extracting deployment metadata...");
    let mgmt_driver = extract::get_mgmt_driver(&graph)?;
    let monitoring = extract::get_vdu_monitoring(&graph)?;
    let mgmt_ports = extract::get_mgmt_ports(&graph)?;
    let resources = extract::get_resources_dict(&graph, config.extra_specs_overlay())?;
    tracing::info!(
        "[VNFD]   - mgmt driver: {}",
        mgmt_driver.as_deref().unwrap_or("<none>")
    );
    tracing::info!(
        "[VNFD]   - {} monitored VDUs, {} management ports",
        monitoring.vdus.len(),
        mgmt_ports.len()
    );

    tracing::info!("[VNFD] Phase 2: Sanitizing node graph...");
    let sanitized = post_process_template(&mut graph, &config.sanitize)?;

    tracing::info!("[VNFD] Phase 3: Structural translation...");
    let raw_template = translator
        .translate(&graph)
        .map_err(|e| match e {
            TranslateError::Structural(_) => e,
            other => TranslateError::Structural(other.to_string()),
        })?;

    tracing::info!("[VNFD] Phase 4: Post-processing Heat template...");
    let heat_template = heat::post_process_heat_template(
        &raw_template,
        &mgmt_ports,
        &resources,
        config.unsupported_properties(),
    )?;

    tracing::info!(
        "[VNFD] Compilation successful ({} bytes)",
        heat_template.len()
    );

    Ok(CompiledVnfd {
        heat_template,
        mgmt_driver,
        monitoring,
        mgmt_ports,
        resources,
        sanitized,
    })
}
