//! # Import Resolution
//!
//! Makes sure a descriptor imports the base type library before it is
//! handed to the parser.

use crate::error::{Result, TranslateError};
use serde_yaml::Value;
use std::path::Path;

/// Base node, policy and relationship types
pub const TACKER_DEFS: &str = "tacker_defs.yaml";
/// NFV profile types (VDU, CP, VL)
pub const TACKER_NFV_DEFS: &str = "tacker_nfv_defs.yaml";

/// Append the absolute paths of both base library files to `imports`.
///
/// Existing entries keep their order and nothing is appended twice, so
/// calling this repeatedly is harmless.
pub fn update_imports(descriptor: &mut Value, library_dir: &Path) -> Result<()> {
    let library_dir = std::path::absolute(library_dir)?;
    let required: Vec<String> = [TACKER_DEFS, TACKER_NFV_DEFS]
        .iter()
        .map(|file| library_dir.join(file).to_string_lossy().into_owned())
        .collect();

    let doc = descriptor.as_mapping_mut().ok_or_else(|| {
        TranslateError::MalformedDescriptor("descriptor is not a mapping".to_string())
    })?;

    let imports = doc
        .entry(Value::from("imports"))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if imports.is_null() {
        *imports = Value::Sequence(Vec::new());
    }
    let imports = imports.as_sequence_mut().ok_or_else(|| {
        TranslateError::MalformedDescriptor("'imports' is not a list".to_string())
    })?;

    for path in required {
        if imports.iter().any(|i| i.as_str() == Some(path.as_str())) {
            continue;
        }
        tracing::debug!("[VNFD] Adding import {}", path);
        imports.push(Value::String(path));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> std::path::PathBuf {
        std::path::absolute("./lib").unwrap()
    }

    fn expected() -> Vec<Value> {
        let lib = library();
        vec![
            Value::from(lib.join(TACKER_DEFS).to_string_lossy().into_owned()),
            Value::from(lib.join(TACKER_NFV_DEFS).to_string_lossy().into_owned()),
        ]
    }

    #[test]
    fn test_adds_both_imports() {
        let mut doc: Value =
            serde_yaml::from_str("tosca_definitions_version: tosca_simple_profile_for_nfv_1_0_0")
                .unwrap();

        update_imports(&mut doc, Path::new("./lib")).unwrap();

        assert_eq!(doc["imports"], Value::Sequence(expected()));
    }

    #[test]
    fn test_idempotent() {
        let mut doc: Value = serde_yaml::from_str("imports: []").unwrap();

        update_imports(&mut doc, Path::new("./lib")).unwrap();
        update_imports(&mut doc, Path::new("./lib")).unwrap();

        assert_eq!(doc["imports"].as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn test_preserves_existing_imports() {
        let mut doc: Value = serde_yaml::from_str("imports: [custom_types.yaml]").unwrap();

        update_imports(&mut doc, &library()).unwrap();

        let mut want = vec![Value::from("custom_types.yaml")];
        want.extend(expected());
        assert_eq!(doc["imports"], Value::Sequence(want));
    }

    #[test]
    fn test_null_imports_initialized() {
        let mut doc: Value = serde_yaml::from_str("imports:").unwrap();
        update_imports(&mut doc, &library()).unwrap();
        assert_eq!(doc["imports"], Value::Sequence(expected()));
    }

    #[test]
    fn test_rejects_non_list_imports() {
        let mut doc: Value = serde_yaml::from_str("imports: not-a-list").unwrap();
        let err = update_imports(&mut doc, &library()).unwrap_err();
        assert!(matches!(err, TranslateError::MalformedDescriptor(_)));
    }
}
