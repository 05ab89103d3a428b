use crate::error::{Result, TranslateError};
use crate::extract::MgmtPorts;
use serde_yaml::{Mapping, Value};

/// Publish each management port's fixed IP as a template output
pub fn add_mgmt_outputs(heat: &mut Value, mgmt_ports: &MgmtPorts) -> Result<()> {
    if mgmt_ports.is_empty() {
        return Ok(());
    }

    let doc = heat
        .as_mapping_mut()
        .ok_or_else(|| TranslateError::MalformedTemplate("template is not a mapping".to_string()))?;
    let outputs = doc
        .entry(Value::from("outputs"))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if outputs.is_null() {
        *outputs = Value::Mapping(Mapping::new());
    }
    let outputs = outputs
        .as_mapping_mut()
        .ok_or_else(|| TranslateError::MalformedTemplate("'outputs' is not a mapping".to_string()))?;

    for (output, port) in mgmt_ports {
        outputs.insert(Value::from(output.as_str()), fixed_ip_output(port));
        tracing::debug!("[HEAT] Added output for {}", output);
    }

    Ok(())
}

/// `{value: {get_attr: [<port>, fixed_ips, 0, ip_address]}}`
fn fixed_ip_output(port: &str) -> Value {
    let get_attr = Value::Sequence(vec![
        Value::from(port),
        Value::from("fixed_ips"),
        Value::from(0),
        Value::from("ip_address"),
    ]);

    let mut value = Mapping::new();
    value.insert(Value::from("get_attr"), get_attr);

    let mut output = Mapping::new();
    output.insert(Value::from("value"), Value::Mapping(value));
    Value::Mapping(output)
}
