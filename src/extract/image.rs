use crate::error::{Result, TranslateError};
use crate::graph::NodeGraph;
use crate::lineage::types;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Glance image to create for a VDU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    pub location: String,
    pub container_format: String,
    pub disk_format: String,
}

const CONTAINER_FORMAT: &str = "bare";
const DISK_FORMAT: &str = "raw";

/// Image of every VDU that ships a VM image artifact, keyed by VDU name
pub fn get_image_dict(graph: &NodeGraph) -> Result<BTreeMap<String, ImageSpec>> {
    let mut images = BTreeMap::new();

    for vdu in graph.nodes_derived_from(types::VDU) {
        for artifact in &vdu.artifacts {
            let is_image = artifact
                .type_name
                .as_deref()
                .map(|t| graph.lineage().is_derived_from(t, types::IMAGE_VM))
                .unwrap_or(false);
            if !is_image {
                continue;
            }

            let location = artifact.file.clone().ok_or_else(|| TranslateError::ImageFileMissing {
                vdu: vdu.name.clone(),
                artifact: artifact.name.clone(),
            })?;

            if let Some(first) = images.get(&vdu.name).map(|i: &ImageSpec| i.name.clone()) {
                return Err(TranslateError::DuplicateImage {
                    vdu: vdu.name.clone(),
                    first,
                    second: artifact.name.clone(),
                });
            }

            tracing::debug!("[VNFD] {} boots from image {}", vdu.name, location);
            images.insert(
                vdu.name.clone(),
                ImageSpec {
                    name: artifact.name.clone(),
                    location,
                    container_format: CONTAINER_FORMAT.to_string(),
                    disk_format: DISK_FORMAT.to_string(),
                },
            );
        }
    }

    Ok(images)
}
