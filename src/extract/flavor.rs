//! # Flavor Extraction
//!
//! Derives a Nova flavor for every VDU that describes its compute needs
//! inline (`nfv_compute` capability) instead of naming an existing flavor.
//!
//! When a NUMA node count is declared the CPU topology is derived from it:
//! one socket per NUMA node, two threads per core, and the cores per socket
//! that make up the requested vCPUs. The vCPUs must divide evenly.

use super::units::{size_in, SizeUnit};
use crate::error::{Result, TranslateError};
use crate::graph::{NodeGraph, NodeTemplate, Properties};
use crate::lineage::types;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Scheduler hints attached to a flavor
pub type ExtraSpecs = BTreeMap<String, Value>;

/// Flavor of one VDU. `ram` is in MB, `disk` in GB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorSpec {
    pub vcpus: u64,
    pub ram: u64,
    pub disk: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_specs: Option<ExtraSpecs>,
}

const COMPUTE_CAPABILITY: &str = "nfv_compute";

const DEFAULT_RAM_MB: u64 = 512;
const DEFAULT_DISK_GB: u64 = 1;

/// Hyper-threading is assumed on every host
const THREADS_PER_CORE: u64 = 2;
const DEFAULT_MEM_PAGE_SIZE: &str = "any";
const DEFAULT_THREADS_POLICY: &str = "avoid";
const PINNED_CPU_POLICY: &str = "dedicated";

const NUMA_NODE_KEYS: [&str; 3] = ["id", "vcpus", "mem_size"];

/// `cpu_allocation` key -> extra spec it sets
const CPU_ALLOCATION_MAP: [(&str, &str); 5] = [
    ("cpu_affinity", "hw:cpu_policy"),
    ("thread_allocation", "hw:cpu_threads_policy"),
    ("socket_count", "hw:cpu_sockets"),
    ("thread_count", "hw:cpu_threads"),
    ("core_count", "hw:cpu_cores"),
];

/// Properties whose presence asks for extra specs
const EXTRA_SPEC_PROPERTIES: [&str; 5] = [
    "numa_nodes",
    "numa_node_count",
    "mem_page_size",
    "cpu_threads_policy",
    "cpu_allocation",
];

/// Flavor of every VDU that describes one, keyed by VDU name.
///
/// `overlay` is merged into each derived extra-specs mapping last and wins
/// on conflicts. It never creates extra specs on its own.
pub fn get_flavor_dict(
    graph: &NodeGraph,
    overlay: Option<&ExtraSpecs>,
) -> Result<BTreeMap<String, FlavorSpec>> {
    let mut flavors = BTreeMap::new();

    for vdu in graph.nodes_derived_from(types::VDU) {
        if vdu.has_property("flavor") {
            tracing::debug!("[VNFD] {} uses a named flavor, nothing to synthesize", vdu.name);
            continue;
        }

        let empty = Properties::new();
        let compute = vdu.capability(COMPUTE_CAPABILITY).unwrap_or(&empty);
        let flavor = flavor_for(vdu, compute, overlay)?;
        tracing::debug!(
            "[VNFD] {} flavor: {} vCPUs, {} MB, {} GB",
            vdu.name,
            flavor.vcpus,
            flavor.ram,
            flavor.disk
        );
        flavors.insert(vdu.name.clone(), flavor);
    }

    Ok(flavors)
}

fn flavor_for(vdu: &NodeTemplate, compute: &Properties, overlay: Option<&ExtraSpecs>) -> Result<FlavorSpec> {
    let vcpus = compute
        .get("num_cpus")
        .ok_or_else(|| TranslateError::missing(&vdu.name, "num_cpus"))?;
    let vcpus = positive(&vdu.name, "num_cpus", vcpus)?;

    let ram = match compute.get("mem_size") {
        Some(v) => size_in(&vdu.name, "mem_size", v, SizeUnit::Megabytes)?,
        None => DEFAULT_RAM_MB,
    };
    let disk = match compute.get("disk_size") {
        Some(v) => size_in(&vdu.name, "disk_size", v, SizeUnit::Gigabytes)?,
        None => DEFAULT_DISK_GB,
    };

    let extra_specs = if EXTRA_SPEC_PROPERTIES.iter().any(|p| compute.contains_key(*p)) {
        let mut specs = extra_specs_for(&vdu.name, compute, vcpus)?;
        if let Some(overlay) = overlay {
            specs.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Some(specs)
    } else {
        None
    };

    Ok(FlavorSpec {
        vcpus,
        ram,
        disk,
        extra_specs,
    })
}

fn extra_specs_for(vdu: &str, compute: &Properties, vcpus: u64) -> Result<ExtraSpecs> {
    let mut specs = ExtraSpecs::new();
    let allocation = cpu_allocation(vdu, compute)?;

    let mem_page_size = compute
        .get("mem_page_size")
        .map(|v| parse_mem_page_size(vdu, v))
        .transpose()?;
    let threads_policy = compute.get("cpu_threads_policy").cloned();

    match numa_node_count(vdu, compute, &mut specs)? {
        Some(numa) => {
            let sockets = allocation_count(vdu, &allocation, "hw:cpu_sockets")?.unwrap_or(numa);
            let threads =
                allocation_count(vdu, &allocation, "hw:cpu_threads")?.unwrap_or(THREADS_PER_CORE);
            let cores = match allocation_count(vdu, &allocation, "hw:cpu_cores")? {
                Some(cores) => cores,
                None => {
                    let per_core = sockets.checked_mul(threads).ok_or_else(|| {
                        TranslateError::invalid(vdu, "cpu_allocation", "socket and thread counts overflow")
                    })?;
                    if vcpus % per_core != 0 {
                        return Err(TranslateError::UnevenCpuTopology {
                            node: vdu.to_string(),
                            vcpus,
                            sockets,
                            threads,
                        });
                    }
                    vcpus / per_core
                }
            };

            specs.insert("hw:numa_nodes".to_string(), Value::from(numa));
            specs.insert("hw:cpu_sockets".to_string(), Value::from(sockets));
            specs.insert("hw:cpu_threads".to_string(), Value::from(threads));
            specs.insert("hw:cpu_cores".to_string(), Value::from(cores));
            specs.insert("hw:cpu_policy".to_string(), Value::from(PINNED_CPU_POLICY));
            specs.insert(
                "hw:mem_page_size".to_string(),
                mem_page_size.unwrap_or_else(|| Value::from(DEFAULT_MEM_PAGE_SIZE)),
            );
            specs.insert(
                "hw:cpu_threads_policy".to_string(),
                threads_policy.unwrap_or_else(|| Value::from(DEFAULT_THREADS_POLICY)),
            );
        }
        None => {
            if let Some(size) = mem_page_size {
                specs.insert("hw:mem_page_size".to_string(), size);
            }
            if let Some(policy) = threads_policy {
                specs.insert("hw:cpu_threads_policy".to_string(), policy);
            }
        }
    }

    // explicit allocation beats derived topology
    specs.extend(allocation);
    Ok(specs)
}

/// Declared NUMA node count; per-node definitions also emit their pinning
fn numa_node_count(vdu: &str, compute: &Properties, specs: &mut ExtraSpecs) -> Result<Option<u64>> {
    let count = compute.get("numa_node_count");
    let nodes = compute.get("numa_nodes");

    if let Some(count) = count {
        if nodes.is_some() {
            tracing::warn!(
                "[VNFD] {} declares both numa_nodes and numa_node_count; numa_node_count wins",
                vdu
            );
        }
        return positive(vdu, "numa_node_count", count).map(Some);
    }

    match nodes {
        None => Ok(None),
        Some(n @ Value::Number(_)) => positive(vdu, "numa_nodes", n).map(Some),
        Some(Value::Mapping(definitions)) => {
            let mut count = 0;
            for definition in definitions.values() {
                numa_node_definition(vdu, definition, specs)?;
                count += 1;
            }
            if count == 0 {
                return Err(TranslateError::invalid(vdu, "numa_nodes", "no NUMA nodes defined"));
            }
            Ok(Some(count))
        }
        Some(_) => Err(TranslateError::invalid(
            vdu,
            "numa_nodes",
            "expected a count or a mapping of node definitions",
        )),
    }
}

fn numa_node_definition(vdu: &str, definition: &Value, specs: &mut ExtraSpecs) -> Result<()> {
    let definition = definition
        .as_mapping()
        .ok_or_else(|| TranslateError::invalid(vdu, "numa_nodes", "node definition is not a mapping"))?;

    let unknown: Vec<String> = definition
        .keys()
        .filter_map(|k| k.as_str())
        .filter(|k| !NUMA_NODE_KEYS.contains(k))
        .map(str::to_string)
        .collect();
    if !unknown.is_empty() {
        return Err(TranslateError::invalid(
            vdu,
            "numa_nodes",
            format!("invalid keys {}; valid keys are {}", unknown.join(", "), NUMA_NODE_KEYS.join(", ")),
        ));
    }

    let Some(id) = definition.get("id") else {
        tracing::warn!("[VNFD] {} has a NUMA node definition without id; its pinning is ignored", vdu);
        return Ok(());
    };
    let id = id
        .as_u64()
        .ok_or_else(|| TranslateError::invalid(vdu, "numa_nodes", "node id must be an integer"))?;

    if let Some(cpus) = definition.get("vcpus") {
        let cpus = cpus
            .as_sequence()
            .ok_or_else(|| TranslateError::invalid(vdu, "numa_nodes", "vcpus must be a list"))?;
        let cpus = cpus
            .iter()
            .map(|c| {
                c.as_u64()
                    .map(|c| c.to_string())
                    .ok_or_else(|| TranslateError::invalid(vdu, "numa_nodes", "vcpu ids must be integers"))
            })
            .collect::<Result<Vec<_>>>()?;
        specs.insert(format!("hw:numa_cpus.{}", id), Value::from(cpus.join(",")));
    }

    if let Some(mem) = definition.get("mem_size") {
        let mem = size_in(vdu, "numa_nodes", mem, SizeUnit::Megabytes)?;
        specs.insert(format!("hw:numa_mem.{}", id), Value::from(mem));
    }

    Ok(())
}

/// Named page sizes pass through unchanged; a bare number is MB, emitted as KB
fn parse_mem_page_size(vdu: &str, value: &Value) -> Result<Value> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => n
            .as_u64()
            .and_then(|mb| mb.checked_mul(1024))
            .map(Value::from)
            .ok_or_else(|| {
                TranslateError::invalid(vdu, "mem_page_size", "size must be a non-negative number of MB")
            }),
        _ => Err(TranslateError::invalid(
            vdu,
            "mem_page_size",
            "expected a page size name or a size in MB",
        )),
    }
}

/// `cpu_allocation` translated to extra-spec keys
fn cpu_allocation(vdu: &str, compute: &Properties) -> Result<ExtraSpecs> {
    let mut allocation = ExtraSpecs::new();
    let Some(declared) = compute.get("cpu_allocation") else {
        return Ok(allocation);
    };
    let declared = declared
        .as_mapping()
        .ok_or_else(|| TranslateError::invalid(vdu, "cpu_allocation", "expected a mapping"))?;

    for (key, value) in declared {
        let key = key.as_str().unwrap_or_default();
        let spec = CPU_ALLOCATION_MAP
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, spec)| *spec)
            .ok_or_else(|| {
                let valid: Vec<_> = CPU_ALLOCATION_MAP.iter().map(|(k, _)| *k).collect();
                TranslateError::invalid(
                    vdu,
                    "cpu_allocation",
                    format!("invalid key '{}'; valid keys are {}", key, valid.join(", ")),
                )
            })?;
        allocation.insert(spec.to_string(), value.clone());
    }

    Ok(allocation)
}

fn allocation_count(vdu: &str, allocation: &ExtraSpecs, spec: &str) -> Result<Option<u64>> {
    allocation
        .get(spec)
        .map(|v| positive(vdu, "cpu_allocation", v))
        .transpose()
}

fn positive(vdu: &str, property: &str, value: &Value) -> Result<u64> {
    match value.as_u64() {
        Some(n) if n > 0 => Ok(n),
        _ => Err(TranslateError::invalid(vdu, property, "expected a positive integer")),
    }
}
