//! TOSCA scalar-unit sizes (`512 MB`, `4 GiB`) converted to whole units.

use crate::error::{Result, TranslateError};
use serde_yaml::Value;

/// Size unit of a flavor field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeUnit {
    Megabytes,
    Gigabytes,
}

impl SizeUnit {
    fn bytes(self) -> f64 {
        match self {
            SizeUnit::Megabytes => 1024.0 * 1024.0,
            SizeUnit::Gigabytes => 1024.0 * 1024.0 * 1024.0,
        }
    }
}

fn unit_bytes(unit: &str) -> Option<f64> {
    let factor = match unit.to_ascii_uppercase().as_str() {
        "B" => 1.0,
        "KB" | "KIB" => 1024.0,
        "MB" | "MIB" => 1024.0 * 1024.0,
        "GB" | "GIB" => 1024.0 * 1024.0 * 1024.0,
        "TB" | "TIB" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(factor)
}

/// Convert a size property to `target`, rounding up.
///
/// Bare numbers are taken to be in `target` already.
pub fn size_in(node: &str, property: &str, value: &Value, target: SizeUnit) -> Result<u64> {
    let invalid = |reason: &str| TranslateError::invalid(node, property, reason);

    let text = match value {
        Value::Number(n) => {
            return n
                .as_u64()
                .ok_or_else(|| invalid("expected a non-negative integer"))
        }
        Value::String(s) => s.trim(),
        _ => return Err(invalid("expected a size such as '512 MB'")),
    };

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number
        .parse()
        .map_err(|_| invalid(&format!("'{}' does not start with a number", text)))?;
    let unit = unit.trim();

    if unit.is_empty() {
        return Ok(number.ceil() as u64);
    }

    let factor = unit_bytes(unit).ok_or_else(|| invalid(&format!("unknown unit '{}'", unit)))?;
    Ok((number * factor / target.bytes()).ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mb(v: &str) -> u64 {
        size_in("VDU1", "mem_size", &Value::from(v), SizeUnit::Megabytes).unwrap()
    }

    #[test]
    fn test_megabytes() {
        assert_eq!(mb("512 MB"), 512);
        assert_eq!(mb("4 GB"), 4096);
        assert_eq!(mb("2GiB"), 2048);
        assert_eq!(mb("1024 kB"), 1);
    }

    #[test]
    fn test_gigabytes_round_up() {
        let gb = size_in("VDU1", "disk_size", &Value::from("1536 MB"), SizeUnit::Gigabytes).unwrap();
        assert_eq!(gb, 2);
    }

    #[test]
    fn test_bare_number_in_target_unit() {
        assert_eq!(size_in("VDU1", "disk_size", &Value::from(10), SizeUnit::Gigabytes).unwrap(), 10);
        assert_eq!(mb("256"), 256);
    }

    #[test]
    fn test_unknown_unit() {
        let err = size_in("VDU1", "mem_size", &Value::from("3 parsecs"), SizeUnit::Megabytes);
        assert!(matches!(err, Err(TranslateError::InvalidProperty { .. })));
    }
}
