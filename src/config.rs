//! # Translator Configuration
//!
//! Deployment-wide settings: where the base type library lives, scheduler
//! hints merged into every derived flavor, the sanitizer tables and the
//! Heat properties the target cloud does not support.

use crate::error::Result;
use crate::extract::ExtraSpecs;
use crate::heat::UnsupportedProperties;
use crate::sanitize::SanitizeRules;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a YAML configuration file
pub const CONFIG_ENV: &str = "VNFDC_CONFIG";

const DEFAULT_LIBRARY_DIR: &str = "lib";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Directory holding `tacker_defs.yaml` and `tacker_nfv_defs.yaml`
    pub base_library_dir: PathBuf,
    /// Merged into derived flavor extra specs, e.g. aggregate hints
    pub flavor_extra_specs: ExtraSpecs,
    pub sanitize: SanitizeRules,
    pub unsupported_resource_properties: UnsupportedProperties,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_library_dir: PathBuf::from(DEFAULT_LIBRARY_DIR),
            flavor_extra_specs: ExtraSpecs::new(),
            sanitize: SanitizeRules::default(),
            unsupported_resource_properties: UnsupportedProperties::new(),
        }
    }
}

impl TranslatorConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        tracing::info!("[VNFD] Loaded configuration from {}", path.display());
        Self::from_yaml(&text)
    }

    /// Configuration named by `VNFDC_CONFIG`, or the defaults when unset
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                tracing::debug!("[VNFD] {} not set, using default configuration", CONFIG_ENV);
                Ok(Self::default())
            }
        }
    }

    /// Overlay to hand to flavor extraction, `None` when empty
    pub fn extra_specs_overlay(&self) -> Option<&ExtraSpecs> {
        if self.flavor_extra_specs.is_empty() {
            None
        } else {
            Some(&self.flavor_extra_specs)
        }
    }

    pub fn unsupported_properties(&self) -> Option<&UnsupportedProperties> {
        if self.unsupported_resource_properties.is_empty() {
            None
        } else {
            Some(&self.unsupported_resource_properties)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::types;
    use serde_yaml::Value;

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(TranslatorConfig::from_yaml("").unwrap(), TranslatorConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_default_rules() {
        let config = TranslatorConfig::from_yaml(
            r#"
base_library_dir: /opt/tacker/lib
flavor_extra_specs:
  aggregate_instance_extra_specs:nfv: "true"
unsupported_resource_properties:
  OS::Neutron::Port:
    port_security_enabled: value_specs
"#,
        )
        .unwrap();

        assert_eq!(config.base_library_dir, PathBuf::from("/opt/tacker/lib"));
        assert_eq!(
            config.extra_specs_overlay().unwrap()["aggregate_instance_extra_specs:nfv"],
            Value::from("true")
        );
        assert!(config.unsupported_properties().is_some());
        assert!(config.sanitize.removed_types.contains(&types::POLICY_MONITORING.to_string()));
    }

    #[test]
    fn test_empty_overlay_is_none() {
        let config = TranslatorConfig::default();
        assert!(config.extra_specs_overlay().is_none());
        assert!(config.unsupported_properties().is_none());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(TranslatorConfig::from_yaml("base_library_dir: [1, 2").is_err());
    }
}
