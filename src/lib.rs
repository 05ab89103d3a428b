//! # VNF Descriptor Compiler (VNFDC)
//!
//! Compiles TOSCA Virtual Network Function Descriptors into Heat
//! orchestration templates plus the deployment metadata a VNF manager needs
//! (management driver, monitoring policies, management addresses).
//!
//! The TOSCA-to-Heat structural translation itself is supplied by the caller
//! through [`StructuralTranslator`]; VNFDC prepares the graph it consumes and
//! finishes the template it produces.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vnfdc::{compile_descriptor, NodeGraph, StructuralTranslator, TranslatorConfig};
//!
//! struct HeatTranslator;
//!
//! impl StructuralTranslator for HeatTranslator {
//!     fn translate(&self, graph: &NodeGraph) -> vnfdc::Result<String> {
//!         // ... emit one Heat resource per node
//!         # let _ = graph;
//!         Ok("resources: {}".to_string())
//!     }
//! }
//!
//! let descriptor = std::fs::read_to_string("vnfd.yaml")?;
//! let compiled = compile_descriptor(&descriptor, &HeatTranslator, &TranslatorConfig::from_env()?)?;
//! std::fs::write("stack.yaml", &compiled.heat_template)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! 1. **Import Resolution** - Point the descriptor at the base type library
//! 2. **Graph Loading** - Lift node templates and policies into a typed graph
//! 3. **Metadata Extraction** - Management driver, monitoring, management
//!    ports, flavors (with NUMA topology) and images
//! 4. **Sanitizing** - Drop policy nodes and rewrite properties for Heat
//! 5. **Structural Translation** - Caller-supplied graph-to-Heat step
//! 6. **Post-Processing** - Outputs and synthesized flavor/image resources

pub mod compiler;
pub mod config;
pub mod error;
pub mod extract;
pub mod graph;
pub mod heat;
pub mod imports;
pub mod lineage;
pub mod sanitize;

// Re-export the main compilation API
pub use compiler::{compile_descriptor, compile_graph, CompiledVnfd, StructuralTranslator};

pub use config::TranslatorConfig;
pub use error::{Result, TranslateError};
pub use graph::{Artifact, NodeGraph, NodeTemplate, Properties, Requirement};
pub use lineage::{types, TypeLineage};

pub use extract::{
    find_vdus, get_flavor_dict, get_image_dict, get_mgmt_driver, get_mgmt_ports,
    get_resources_dict, get_vdu_monitoring, ExtraSpecs, FlavorSpec, ImageSpec, MgmtPorts,
    MonitoringPolicy, MonitoringSpec,
};
pub use heat::{add_resources_tpl, post_process_heat_template, ResourceKind, ResourceTable};
pub use imports::update_imports;
pub use sanitize::{post_process_template, SanitizeReport, SanitizeRules};
