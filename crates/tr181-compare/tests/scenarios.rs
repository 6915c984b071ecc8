//! End-to-end comparison scenarios from requirement documents to reports

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tr181_compare::{
    ComparisonEngine, DifferenceKind, EnhancedComparisonEngine, ProbeStatus,
};
use tr181_core::{AccessLevel, DataType, Node, ParameterPath, Severity, SourceInfo};
use tr181_extractors::{DeviceExtractor, Extractor};
use tr181_hooks::testing::StaticHook;
use tr181_hooks::{Authentication, DeviceConfig};
use tr181_requirements::RequirementExtractor;

const WIFI_REQUIREMENT: &str = r#"{
    "nodes": [
        {
            "path": "Device.WiFi.Radio.1.Channel",
            "data_type": "unsignedInt",
            "access": "read-write",
            "value_range": {"min": 1, "max": 11}
        },
        {
            "path": "Device.WiFi.Radio.1.Enable",
            "data_type": "boolean",
            "access": "read-write",
            "value": true
        },
        {
            "path": "Device.WiFi.Radio.1.Status",
            "data_type": "string",
            "access": "read-only",
            "value": "Up"
        },
        {
            "path": "Device.WiFi.SSID.1.SSID",
            "data_type": "string",
            "access": "read-write",
            "value": "lab",
            "value_range": {"max_length": 32}
        },
        {
            "path": "Device.WiFi.Radio.1.TransmitPower",
            "data_type": "int",
            "access": "read-write",
            "value": 100
        }
    ]
}"#;

async fn requirement_nodes(dir: &TempDir) -> (SourceInfo, Vec<Node>) {
    let file = dir.path().join("wifi.json");
    std::fs::write(&file, WIFI_REQUIREMENT).unwrap();
    let extractor = RequirementExtractor::new(&file);
    let nodes = extractor.extract().await.unwrap();
    (extractor.source_info(), nodes)
}

fn device_config() -> DeviceConfig {
    DeviceConfig::new(
        "lab-cpe",
        "rest",
        "http://device.example/api",
        Authentication::Bearer {
            token: "token".to_string(),
        },
    )
}

fn matching_device_hook() -> StaticHook {
    StaticHook::new()
        .with_transitive_names()
        .with_flat_parameter(
            "Device.WiFi.Radio.1.Channel",
            "unsignedInt",
            "read-write",
            Some(json!(6)),
        )
        .with_flat_parameter(
            "Device.WiFi.Radio.1.Enable",
            "boolean",
            "read-write",
            Some(json!(true)),
        )
        .with_flat_parameter(
            "Device.WiFi.Radio.1.Status",
            "string",
            "read-only",
            Some(json!("Up")),
        )
        .with_flat_parameter(
            "Device.WiFi.SSID.1.SSID",
            "string",
            "read-write",
            Some(json!("lab")),
        )
        .with_flat_parameter(
            "Device.WiFi.Radio.1.TransmitPower",
            "int",
            "read-write",
            Some(json!(100)),
        )
}

#[tokio::test]
async fn test_s1_matching_device_yields_clean_report() {
    let dir = TempDir::new().unwrap();
    let (source1, requirement) = requirement_nodes(&dir).await;

    let extractor = DeviceExtractor::new(Arc::new(matching_device_hook()), device_config());
    let device = extractor.extract().await.unwrap();
    let source2 = extractor.source_info();

    let report = EnhancedComparisonEngine::new()
        .compare_with_validation(source1, &requirement, source2, &device, None)
        .await
        .unwrap();

    assert!(report.comparison.outcome.is_identical());
    assert_eq!(report.comparison.outcome.summary.common, 5);
    assert_eq!(report.validation_results.len(), 5);
    assert!(report.validation_results.values().all(|r| r.is_valid()));
    assert_eq!(report.compliance.failed_checks, 0);
}

#[tokio::test]
async fn test_s2_channel_out_of_range() {
    let dir = TempDir::new().unwrap();
    let (source1, requirement) = requirement_nodes(&dir).await;

    let hook = matching_device_hook().with_flat_parameter(
        "Device.WiFi.Radio.1.Channel",
        "unsignedInt",
        "read-write",
        Some(json!(13)),
    );
    let extractor = DeviceExtractor::new(Arc::new(hook), device_config());
    let device = extractor.extract().await.unwrap();
    let source2 = extractor.source_info();

    let report = EnhancedComparisonEngine::new()
        .compare_with_validation(source1, &requirement, source2, &device, None)
        .await
        .unwrap();

    let range_mismatches: Vec<_> = report
        .comparison
        .outcome
        .differences
        .iter()
        .filter(|d| d.kind == DifferenceKind::RangeMismatch)
        .collect();
    assert_eq!(range_mismatches.len(), 1);
    assert_eq!(range_mismatches[0].path, "Device.WiFi.Radio.1.Channel");
    assert_eq!(range_mismatches[0].severity, Severity::Error);
    assert_eq!(report.comparison.outcome.summary.errors, 1);

    // The other four nodes are unaffected.
    let channel_report = &report.validation_results["Device.WiFi.Radio.1.Channel"];
    assert!(!channel_report.is_valid());
    let other_valid = report
        .validation_results
        .iter()
        .filter(|(path, _)| path.as_str() != "Device.WiFi.Radio.1.Channel")
        .all(|(_, r)| r.is_valid());
    assert!(other_valid);
}

#[tokio::test]
async fn test_s3_cwmp_string_value_warns_but_compares_equal() {
    let requirement = vec![Node::new(
        ParameterPath::parse("Device.WiFi.Radio.1.TransmitPower").unwrap(),
        DataType::Int,
        AccessLevel::ReadWrite,
    )
    .with_value(20)];

    // CWMP devices report typed values as raw strings.
    let device = vec![Node::new(
        ParameterPath::parse("Device.WiFi.Radio.1.TransmitPower").unwrap(),
        DataType::Int,
        AccessLevel::ReadWrite,
    )
    .with_value("20")];

    let report = EnhancedComparisonEngine::for_cwmp_device()
        .compare_with_validation(
            SourceInfo::new("requirement", "wifi.json"),
            &requirement,
            SourceInfo::new("cwmp", "http://acs.example/cwmp"),
            &device,
            None,
        )
        .await
        .unwrap();

    // The coerced value compares equal, so no difference is reported.
    assert!(report.comparison.outcome.differences.is_empty());

    let findings = &report.validation_results["Device.WiFi.Radio.1.TransmitPower"];
    assert!(findings.is_valid());
    assert_eq!(findings.warnings.len(), 1);
}

#[tokio::test]
async fn test_s4_missing_and_extra_nodes() {
    fn leaf(path: &str) -> Node {
        Node::new(
            ParameterPath::parse(path).unwrap(),
            DataType::String,
            AccessLevel::ReadOnly,
        )
    }

    let a = vec![
        leaf("Device.DeviceInfo.Manufacturer"),
        leaf("Device.DeviceInfo.ModelName"),
        leaf("Device.DeviceInfo.SerialNumber"),
    ];
    let b = vec![
        leaf("Device.DeviceInfo.ModelName"),
        leaf("Device.DeviceInfo.SerialNumber"),
        leaf("Device.DeviceInfo.SoftwareVersion"),
    ];

    let outcome = ComparisonEngine::new().compare(&a, &b).unwrap();
    assert_eq!(outcome.only_in_source1.len(), 1);
    assert_eq!(
        outcome.only_in_source1[0].path.as_str(),
        "Device.DeviceInfo.Manufacturer"
    );
    assert_eq!(outcome.only_in_source2.len(), 1);
    assert_eq!(
        outcome.only_in_source2[0].path.as_str(),
        "Device.DeviceInfo.SoftwareVersion"
    );
    assert!(outcome.differences.is_empty());
    assert_eq!(outcome.summary.common, 2);
}

#[tokio::test]
async fn test_symmetry() {
    fn typed(path: &str, value: serde_json::Value) -> Node {
        Node::new(
            ParameterPath::parse(path).unwrap(),
            DataType::Int,
            AccessLevel::ReadWrite,
        )
        .with_value(value)
    }

    let a = vec![
        typed("Device.WiFi.Radio.1.Channel", json!(6)),
        Node::new(
            ParameterPath::parse("Device.WiFi.Radio.1.Extra").unwrap(),
            DataType::String,
            AccessLevel::ReadOnly,
        ),
    ];
    let b = vec![typed("Device.WiFi.Radio.1.Channel", json!(11))];

    let engine = ComparisonEngine::new();
    let forward = engine.compare(&a, &b).unwrap();
    let backward = engine.compare(&b, &a).unwrap();

    assert_eq!(forward.only_in_source1, backward.only_in_source2);
    assert_eq!(forward.only_in_source2, backward.only_in_source1);

    let forward_value = forward
        .differences
        .iter()
        .find(|d| d.kind == DifferenceKind::ValueMismatch)
        .unwrap();
    let backward_value = backward
        .differences
        .iter()
        .find(|d| d.kind == DifferenceKind::ValueMismatch)
        .unwrap();
    assert_eq!(forward_value.source1_value, backward_value.source2_value);
    assert_eq!(forward_value.source2_value, backward_value.source1_value);
}

#[tokio::test]
async fn test_idempotent_comparison_of_extracted_source() {
    let dir = TempDir::new().unwrap();
    let (source, nodes) = requirement_nodes(&dir).await;

    let report = EnhancedComparisonEngine::new()
        .compare_with_validation(source.clone(), &nodes, source, &nodes, None)
        .await
        .unwrap();

    assert!(report.comparison.outcome.is_identical());
    assert!(report.validation_results.values().all(|r| r.is_valid()));
}

#[tokio::test]
async fn test_event_and_function_probing() {
    let mut scan_outputs = serde_json::Map::new();
    scan_outputs.insert("Device.WiFi.NeighboringWiFiDiagnostic.Result.1.SSID".to_string(), json!("neighbor"));

    let hook = StaticHook::new()
        .with_transitive_names()
        .with_flat_parameter(
            "Device.WiFi.Radio.1.Channel",
            "unsignedInt",
            "read-write",
            Some(json!(6)),
        )
        .with_function("Device.WiFi.NeighboringWiFiDiagnostic", scan_outputs)
        .with_refused_event("Device.WiFi.Radio.1.RefusedEvent");
    let extractor = DeviceExtractor::new(Arc::new(hook), device_config());
    let device = extractor.extract().await.unwrap();

    let requirement_raw = json!({
        "nodes": [{
            "path": "Device.WiFi.Radio.1.Channel",
            "data_type": "unsignedInt",
            "access": "read-write",
            "events": [
                {
                    "name": "ChannelChange",
                    "path": "Device.WiFi.Radio.1.ChannelChange",
                    "parameters": ["Device.WiFi.Radio.1.Channel", "Device.WiFi.Radio.1.Missing"]
                },
                {
                    "name": "Refused",
                    "path": "Device.WiFi.Radio.1.RefusedEvent",
                    "parameters": []
                }
            ],
            "functions": [
                {
                    "name": "NeighborScan",
                    "path": "Device.WiFi.NeighboringWiFiDiagnostic",
                    "input_parameters": ["Device.WiFi.Radio.1.Channel"],
                    "output_parameters": ["Device.WiFi.NeighboringWiFiDiagnostic.Result.1.SSID"]
                },
                {
                    "name": "Unknown",
                    "path": "Device.WiFi.UnknownFunction",
                    "input_parameters": [],
                    "output_parameters": []
                }
            ]
        }]
    });
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("probes.json");
    std::fs::write(&file, serde_json::to_string(&requirement_raw).unwrap()).unwrap();
    let requirement_extractor = RequirementExtractor::new(&file);
    let requirement = requirement_extractor.extract().await.unwrap();

    let report = EnhancedComparisonEngine::new()
        .compare_with_validation(
            requirement_extractor.source_info(),
            &requirement,
            extractor.source_info(),
            &device,
            Some(&extractor),
        )
        .await
        .unwrap();

    assert_eq!(report.event_test_results.len(), 2);
    let channel_change = &report.event_test_results[0];
    assert_eq!(channel_change.status, ProbeStatus::Passed);
    assert!(channel_change.subscribed);
    // The absent parameter reference is a warning, not an error.
    assert!(channel_change.parameter_findings.is_valid());
    assert_eq!(channel_change.parameter_findings.warnings.len(), 1);

    let refused = &report.event_test_results[1];
    assert_eq!(refused.status, ProbeStatus::Failed);
    assert!(!refused.subscribed);

    assert_eq!(report.function_test_results.len(), 2);
    let scan = &report.function_test_results[0];
    assert_eq!(scan.status, ProbeStatus::Passed);
    assert!(scan.invoked);
    // The declared output is not a device parameter: a warning, not an error.
    assert!(scan.output_findings.is_valid());
    assert_eq!(scan.output_findings.warnings.len(), 1);
    assert_eq!(
        scan.outputs.as_ref().unwrap()["Device.WiFi.NeighboringWiFiDiagnostic.Result.1.SSID"],
        json!("neighbor")
    );

    // An unknown function surfaces as a probe error but never aborts the run.
    let unknown = &report.function_test_results[1];
    assert_eq!(unknown.status, ProbeStatus::Error);
    assert!(!unknown.invoked);
}

#[tokio::test]
async fn test_report_serializes_for_renderers() {
    let dir = TempDir::new().unwrap();
    let (source1, requirement) = requirement_nodes(&dir).await;

    let extractor = DeviceExtractor::new(Arc::new(matching_device_hook()), device_config());
    let device = extractor.extract().await.unwrap();

    let report = EnhancedComparisonEngine::new()
        .compare_with_validation(source1, &requirement, extractor.source_info(), &device, None)
        .await
        .unwrap();

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["source1"]["type"], "requirement");
    assert_eq!(value["source2"]["type"], "device");
    assert!(value["summary"]["common"].is_number());
    assert!(value["validation_results"].is_object());
}
