use super::{resources_mut, ResourceTable};
use crate::error::{Result, TranslateError};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// resource type -> property -> replacement property
///
/// A replacement of `value_specs` nests the property under `value_specs`
/// instead of renaming it.
pub type UnsupportedProperties = BTreeMap<String, BTreeMap<String, String>>;

const VALUE_SPECS: &str = "value_specs";

/// Create the synthesized resources and point each VDU's server at them.
///
/// A resource that already exists under the derived name is left alone;
/// the server is still rewired to it.
pub fn add_resources_tpl(heat: &mut Value, table: &ResourceTable) -> Result<()> {
    if table.is_empty() {
        return Ok(());
    }
    let resources = resources_mut(heat)?;

    for (kind, vdu, properties) in table.iter() {
        let name = kind.resource_name(vdu);

        if resources.contains_key(name.as_str()) {
            tracing::warn!("[HEAT] Resource {} already defined, not overwriting it", name);
        } else {
            let mut resource = Mapping::new();
            resource.insert(Value::from("type"), Value::from(kind.heat_type()));
            resource.insert(Value::from("properties"), Value::Mapping(properties.clone()));
            resources.insert(Value::from(name.as_str()), Value::Mapping(resource));
            tracing::debug!("[HEAT] Added {} resource {}", kind, name);
        }

        let server = resources
            .get_mut(vdu)
            .and_then(Value::as_mapping_mut)
            .ok_or_else(|| TranslateError::MissingResource(vdu.to_string()))?;
        let server_props = server
            .entry(Value::from("properties"))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if server_props.is_null() {
            *server_props = Value::Mapping(Mapping::new());
        }
        let server_props = server_props.as_mapping_mut().ok_or_else(|| {
            TranslateError::MalformedTemplate(format!("properties of '{}' are not a mapping", vdu))
        })?;

        let mut reference = Mapping::new();
        reference.insert(Value::from("get_resource"), Value::from(name.as_str()));
        server_props.insert(Value::from(kind.as_str()), Value::Mapping(reference));
    }

    Ok(())
}

/// Move properties the orchestration engine rejects to their replacement
pub fn convert_unsupported_res_prop(heat: &mut Value, unsupported: &UnsupportedProperties) -> Result<()> {
    let resources = resources_mut(heat)?;

    for (name, resource) in resources.iter_mut() {
        let name = name.as_str().unwrap_or_default();
        let Some(res_type) = resource.get("type").and_then(Value::as_str) else {
            continue;
        };
        let Some(replacements) = unsupported.get(res_type) else {
            continue;
        };
        let Some(props) = resource.get_mut("properties").and_then(Value::as_mapping_mut) else {
            continue;
        };

        for (prop, replacement) in replacements {
            let Some(value) = props.shift_remove(prop.as_str()) else {
                continue;
            };
            tracing::debug!("[HEAT] {}: moving {} to {}", name, prop, replacement);

            if replacement == VALUE_SPECS {
                let specs = props
                    .entry(Value::from(VALUE_SPECS))
                    .or_insert_with(|| Value::Mapping(Mapping::new()));
                if specs.is_null() {
                    *specs = Value::Mapping(Mapping::new());
                }
                let specs = specs.as_mapping_mut().ok_or_else(|| {
                    TranslateError::MalformedTemplate(format!("value_specs of '{}' is not a mapping", name))
                })?;
                specs.insert(Value::from(prop.as_str()), value);
            } else {
                props.insert(Value::from(replacement.as_str()), value);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heat::ResourceKind;
    use pretty_assertions::assert_eq;

    fn template(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    fn flavor_table() -> ResourceTable {
        let mut table = ResourceTable::new();
        table
            .insert(
                ResourceKind::Flavor,
                "VDU1",
                template("{vcpus: 2, ram: 512, disk: 10}"),
            )
            .unwrap();
        table
    }

    #[test]
    fn test_add_resources_tpl_for_flavor() {
        let mut heat = template(include_str!("../../tests/data/hot_flavor_and_capabilities.yaml"));
        let before = heat["resources"].as_mapping().unwrap().len();

        add_resources_tpl(&mut heat, &flavor_table()).unwrap();

        assert_eq!(heat["resources"].as_mapping().unwrap().len(), before + 1);
        assert_eq!(heat, template(include_str!("../../tests/data/hot_flavor.yaml")));
    }

    #[test]
    fn test_add_resources_tpl_for_image() {
        let mut heat = template(include_str!("../../tests/data/hot_image_before_processed_image.yaml"));
        let mut table = ResourceTable::new();
        table
            .insert(
                ResourceKind::Image,
                "VDU1",
                template(
                    "{location: 'http://URL/v1/openwrt.qcow2', container_format: bare, disk_format: raw}",
                ),
            )
            .unwrap();

        add_resources_tpl(&mut heat, &table).unwrap();

        assert_eq!(
            heat,
            template(include_str!("../../tests/data/hot_image_after_processed_image.yaml"))
        );
    }

    #[test]
    fn test_existing_resource_not_overwritten() {
        let mut heat = template(
            r#"
resources:
  VDU1:
    type: OS::Nova::Server
    properties:
      flavor: m1.tiny
  VDU1_flavor:
    type: OS::Nova::Flavor
    properties: {vcpus: 16, ram: 65536, disk: 100}
"#,
        );
        let user_flavor = heat["resources"]["VDU1_flavor"].clone();

        add_resources_tpl(&mut heat, &flavor_table()).unwrap();

        assert_eq!(heat["resources"]["VDU1_flavor"], user_flavor);
        assert_eq!(heat["resources"].as_mapping().unwrap().len(), 2);
        assert_eq!(
            heat["resources"]["VDU1"]["properties"]["flavor"],
            template("{get_resource: VDU1_flavor}")
        );
    }

    #[test]
    fn test_missing_server_resource() {
        let mut heat = template("resources:\n  CP1: {type: OS::Neutron::Port}");
        let err = add_resources_tpl(&mut heat, &flavor_table()).unwrap_err();
        assert!(matches!(err, TranslateError::MissingResource(ref vdu) if vdu == "VDU1"));
    }

    #[test]
    fn test_convert_unsupported_res_prop() {
        let mut heat = template(
            r#"
resources:
  CP1:
    type: OS::Neutron::Port
    properties:
      network: net0
      port_security_enabled: false
      binding:vnic_type: direct
"#,
        );
        let unsupported = UnsupportedProperties::from([(
            "OS::Neutron::Port".to_string(),
            BTreeMap::from([
                ("port_security_enabled".to_string(), "value_specs".to_string()),
                ("binding:vnic_type".to_string(), "vnic_type".to_string()),
            ]),
        )]);

        convert_unsupported_res_prop(&mut heat, &unsupported).unwrap();

        assert_eq!(
            heat["resources"]["CP1"]["properties"],
            template(
                r#"
network: net0
value_specs:
  port_security_enabled: false
vnic_type: direct
"#
            )
        );
    }

    #[test]
    fn test_null_value_specs_initialized() {
        let mut heat = template(
            r#"
resources:
  CP1:
    type: OS::Neutron::Port
    properties:
      port_security_enabled: false
      value_specs: ~
"#,
        );
        let unsupported = UnsupportedProperties::from([(
            "OS::Neutron::Port".to_string(),
            BTreeMap::from([("port_security_enabled".to_string(), "value_specs".to_string())]),
        )]);

        convert_unsupported_res_prop(&mut heat, &unsupported).unwrap();

        assert_eq!(
            heat["resources"]["CP1"]["properties"],
            template("value_specs:\n  port_security_enabled: false\n")
        );
    }
}
