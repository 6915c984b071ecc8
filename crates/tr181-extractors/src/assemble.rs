//! Node assembly from raw transport data

use serde_json::Value;
use std::collections::HashMap;
use tr181_core::{AccessLevel, DataType, Node, ParameterPath, ValidationReport};
use tr181_hooks::ParameterAttributes;
use tr181_validation::coerce;
use tracing::warn;

/// Nodes built from one retrieval pass, with the findings gathered on the way
pub struct AssembledNodes {
    pub nodes: Vec<Node>,
    pub report: ValidationReport,
}

/// Build nodes from discovered paths and their retrieved attributes/values.
///
/// Object paths (trailing dot) become object nodes. Raw types and access
/// strings are normalized through the wire tables; unknown spellings map to
/// defaults with a warning. Values are coerced to their normalized type; on
/// coercion failure the raw value is kept and a warning recorded, the node is
/// never dropped.
pub fn assemble_nodes(
    paths: &[String],
    attributes: &HashMap<String, ParameterAttributes>,
    values: &HashMap<String, Value>,
) -> AssembledNodes {
    let mut report = ValidationReport::new();
    let mut nodes: Vec<Node> = Vec::with_capacity(paths.len());
    let mut position: HashMap<String, usize> = HashMap::with_capacity(paths.len());

    for raw_path in paths {
        let path = match ParameterPath::parse(raw_path) {
            Ok(path) => path,
            Err(err) => {
                warn!(path = %raw_path, error = %err, "Skipping unparseable path");
                report.add_warning(format!("skipped unparseable path '{raw_path}': {err}"));
                continue;
            }
        };
        if position.contains_key(path.as_str()) {
            report.add_warning(format!("duplicate discovered path '{raw_path}' ignored"));
            continue;
        }

        let node = if path.is_object() {
            Node::new(path, DataType::String, AccessLevel::ReadOnly)
        } else {
            let attrs = attributes.get(raw_path);

            let data_type = match attrs {
                Some(attrs) => {
                    let (data_type, known) = DataType::from_wire(&attrs.param_type);
                    if !known {
                        report.add_warning(format!(
                            "{raw_path}: unknown type '{}' mapped to string",
                            attrs.param_type
                        ));
                    }
                    data_type
                }
                None => DataType::String,
            };

            let access = match attrs {
                Some(attrs) => match AccessLevel::from_wire(&attrs.access) {
                    Some(access) => access,
                    None => {
                        report.add_warning(format!(
                            "{raw_path}: unknown access '{}' treated as read-only",
                            attrs.access
                        ));
                        AccessLevel::ReadOnly
                    }
                },
                None => AccessLevel::ReadOnly,
            };

            let mut node = Node::new(path, data_type, access);
            if let Some(raw_value) = values.get(raw_path) {
                match coerce(data_type, raw_value) {
                    Ok(canonical) => node.value = Some(canonical),
                    Err(err) => {
                        report.add_warning(format!("{raw_path}: {err}, keeping raw value"));
                        node.value = Some(raw_value.clone());
                    }
                }
            }
            node
        };

        position.insert(node.path.as_str().to_string(), nodes.len());
        nodes.push(node);
    }

    link_hierarchy(&mut nodes, &position);

    AssembledNodes { nodes, report }
}

/// Register each node with its nearest present ancestor.
fn link_hierarchy(nodes: &mut [Node], position: &HashMap<String, usize>) {
    let mut links: Vec<(usize, usize)> = Vec::new();

    for (child_index, node) in nodes.iter().enumerate() {
        let mut ancestor = node.path.parent();
        while let Some(candidate) = ancestor {
            if let Some(&parent_index) = position.get(candidate.as_str()) {
                links.push((child_index, parent_index));
                break;
            }
            ancestor = candidate.parent();
        }
    }

    for (child_index, parent_index) in links {
        let parent_path = nodes[parent_index].path.as_str().to_string();
        let child_path = nodes[child_index].path.as_str().to_string();
        nodes[child_index].parent = Some(parent_path);
        nodes[parent_index].children.push(child_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(entries: &[(&str, &str, &str)]) -> HashMap<String, ParameterAttributes> {
        entries
            .iter()
            .map(|(path, ty, access)| (path.to_string(), ParameterAttributes::new(*ty, *access)))
            .collect()
    }

    #[test]
    fn test_assembles_objects_and_leaves() {
        let paths = vec![
            "Device.WiFi.".to_string(),
            "Device.WiFi.Radio.1.".to_string(),
            "Device.WiFi.Radio.1.Channel".to_string(),
        ];
        let attributes = attrs(&[("Device.WiFi.Radio.1.Channel", "xsd:unsignedInt", "readwrite")]);
        let mut values = HashMap::new();
        values.insert("Device.WiFi.Radio.1.Channel".to_string(), json!("6"));

        let assembled = assemble_nodes(&paths, &attributes, &values);
        assert!(assembled.report.is_clean());
        assert_eq!(assembled.nodes.len(), 3);

        let channel = &assembled.nodes[2];
        assert_eq!(channel.data_type, DataType::UnsignedInt);
        assert_eq!(channel.access, AccessLevel::ReadWrite);
        // Coerced through the wire type: the string "6" becomes a number.
        assert_eq!(channel.value, Some(json!(6)));
        assert_eq!(channel.parent.as_deref(), Some("Device.WiFi.Radio.1."));

        let radio = &assembled.nodes[1];
        assert!(radio.is_object);
        assert_eq!(radio.children, vec!["Device.WiFi.Radio.1.Channel"]);
        assert_eq!(radio.parent.as_deref(), Some("Device.WiFi."));
    }

    #[test]
    fn test_unknown_type_warns_and_keeps_node() {
        let paths = vec!["Device.DeviceInfo.UpTime".to_string()];
        let attributes = attrs(&[("Device.DeviceInfo.UpTime", "opaque", "ro")]);
        let assembled = assemble_nodes(&paths, &attributes, &HashMap::new());

        assert_eq!(assembled.nodes.len(), 1);
        assert_eq!(assembled.nodes[0].data_type, DataType::String);
        assert_eq!(assembled.report.warnings.len(), 1);
    }

    #[test]
    fn test_coercion_failure_keeps_raw_value() {
        let paths = vec!["Device.WiFi.Radio.1.Channel".to_string()];
        let attributes = attrs(&[("Device.WiFi.Radio.1.Channel", "int", "rw")]);
        let mut values = HashMap::new();
        values.insert("Device.WiFi.Radio.1.Channel".to_string(), json!("auto"));

        let assembled = assemble_nodes(&paths, &attributes, &values);
        assert_eq!(assembled.nodes[0].value, Some(json!("auto")));
        assert!(assembled
            .report
            .warnings
            .iter()
            .any(|w| w.contains("keeping raw value")));
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        // "Device.WiFi.Radio.1." is absent; the nearest present ancestor is
        // "Device.WiFi." and linking must not assume every prefix exists.
        let paths = vec![
            "Device.WiFi.".to_string(),
            "Device.WiFi.Radio.1.Channel".to_string(),
        ];
        let assembled = assemble_nodes(&paths, &HashMap::new(), &HashMap::new());
        assert_eq!(assembled.nodes[1].parent.as_deref(), Some("Device.WiFi."));
    }

    #[test]
    fn test_bad_paths_skipped_with_warning() {
        let paths = vec![
            "Device.WiFi.Radio.1.Channel".to_string(),
            "Device..Broken".to_string(),
            "Device.WiFi.Radio.1.Channel".to_string(),
        ];
        let assembled = assemble_nodes(&paths, &HashMap::new(), &HashMap::new());
        assert_eq!(assembled.nodes.len(), 1);
        assert_eq!(assembled.report.warnings.len(), 2);
    }
}
