//! # Translation Errors
//!
//! Every fatal condition raised while compiling a descriptor.

use thiserror::Error;

/// Error raised by any stage of the descriptor compiler
#[derive(Debug, Error)]
pub enum TranslateError {
    /// A node or definition refers to a type the lineage table does not know
    #[error("Unknown type '{type_name}' on '{node}'")]
    UnknownType { node: String, type_name: String },

    /// A type was defined twice with different parents
    #[error("Type '{type_name}' is already derived from '{existing}', cannot derive it from '{requested}'")]
    TypeRedefined {
        type_name: String,
        existing: String,
        requested: String,
    },

    /// The descriptor document does not have the expected shape
    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// Two nodes share a name
    #[error("Duplicate node '{0}' in descriptor")]
    DuplicateNode(String),

    /// A property the computation depends on is absent
    #[error("Missing required property '{property}' on node '{node}'")]
    MissingProperty { node: String, property: String },

    /// A property is present but unusable
    #[error("Invalid value for property '{property}' on node '{node}': {reason}")]
    InvalidProperty {
        node: String,
        property: String,
        reason: String,
    },

    /// vCPUs cannot be split across the requested CPU topology
    #[error("{vcpus} vCPUs on '{node}' cannot be split evenly across {sockets} sockets x {threads} threads")]
    UnevenCpuTopology {
        node: String,
        vcpus: u64,
        sockets: u64,
        threads: u64,
    },

    /// Two VDUs ask for different management drivers
    #[error("Multiple management drivers specified: '{first}' and '{second}'")]
    MultipleMgmtDrivers { first: String, second: String },

    /// A VDU is bound to more than one monitoring policy
    #[error("VDU '{0}' has more than one monitoring policy")]
    DuplicateMonitoringPolicy(String),

    /// A VDU is bound to more than one management connection point
    #[error("VDU '{vdu}' has more than one management port ('{first}', '{second}')")]
    DuplicateManagementPort {
        vdu: String,
        first: String,
        second: String,
    },

    /// A policy points at something that is not a VDU of the graph
    #[error("Policy '{policy}' targets '{target}', which is not a VDU in this descriptor")]
    InvalidPolicyTarget { policy: String, target: String },

    /// A VM image artifact has no file to upload
    #[error("Image artifact '{artifact}' on '{vdu}' has no file path")]
    ImageFileMissing { vdu: String, artifact: String },

    /// A VDU ships more than one VM image artifact
    #[error("VDU '{vdu}' has more than one image artifact ('{first}', '{second}')")]
    DuplicateImage {
        vdu: String,
        first: String,
        second: String,
    },

    /// A sanitizer rename would clobber an existing property
    #[error("Property '{property}' on '{node}' cannot be renamed to '{target}': target is already set")]
    PropertyConflict {
        node: String,
        property: String,
        target: String,
    },

    /// The Heat template does not have the expected shape
    #[error("Malformed Heat template: {0}")]
    MalformedTemplate(String),

    /// Synthesized resources reference a compute resource that is not there
    #[error("Heat template has no resource '{0}' to attach synthesized resources to")]
    MissingResource(String),

    /// The external structural translator failed
    #[error("Structural translation failed: {0}")]
    Structural(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used across the compiler
pub type Result<T> = std::result::Result<T, TranslateError>;

impl TranslateError {
    pub(crate) fn missing(node: &str, property: &str) -> Self {
        Self::MissingProperty {
            node: node.to_string(),
            property: property.to_string(),
        }
    }

    pub(crate) fn invalid(node: &str, property: &str, reason: impl Into<String>) -> Self {
        Self::InvalidProperty {
            node: node.to_string(),
            property: property.to_string(),
            reason: reason.into(),
        }
    }
}
