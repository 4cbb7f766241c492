//! Snapshot translation tests
//!
//! Covers gauge naming, health polarity, unit conversion and section independence.

use eaton_ups_exporter::translate::{kelvin_to_celsius, load_ratio, translate, GaugeRecord};
use eaton_ups_exporter::ups::types::*;
use proptest::prelude::*;
use serde_json::json;

fn port(health: &str, measures: serde_json::Value) -> PowerPort {
    serde_json::from_value(json!({
        "measures": measures,
        "status": {"health": health},
        "specifications": {
            "voltage": {"minReading": 184.0, "maxReading": 276.0, "nominal": 230.0}
        }
    }))
    .expect("valid port")
}

fn measures(input_health: &str, output_health: &str, battery_health: &str) -> MeasureInfo {
    MeasureInfo {
        ups_id: "ups1".to_string(),
        inputs: port(
            input_health,
            json!({"voltage": 231.0, "frequency": 50.0}),
        ),
        outputs: port(
            output_health,
            json!({
                "voltage": 230.0,
                "frequency": 50.0,
                "current": 1.5,
                "apparentPower": 345.0,
                "activePower": 300.0,
                "powerFactor": 0.87,
                "percentLoad": "45",
                "averageEnergy": 10.0,
                "cumulatedEnergy": 1000.0,
                "efficiency": 95.0
            }),
        ),
        powerbank: serde_json::from_value(json!({
            "measures": {"voltage": 27.0, "stateOfCharge": 98.0, "remainingTime": 1800.0},
            "status": {"health": battery_health}
        }))
        .unwrap(),
    }
}

fn system() -> SystemInfo {
    SystemInfo {
        name: "Eaton 9PX".to_string(),
        bootloader_version: "1.0.0".to_string(),
        firmware_version: "3.0.1".to_string(),
        ..Default::default()
    }
}

fn temperature(kelvin: f64) -> TemperatureInfo {
    TemperatureInfo {
        name: "Internal".to_string(),
        position: "inlet".to_string(),
        measure: kelvin,
    }
}

fn snapshot(measures: Section<MeasureInfo>) -> DeviceSnapshot {
    DeviceSnapshot {
        ups_id: "ups1".to_string(),
        system: Section::Present(system()),
        temperature: Section::Present(temperature(300.0)),
        measures,
    }
}

fn find<'a>(records: &'a [GaugeRecord], name: &str) -> Vec<&'a GaugeRecord> {
    records.iter().filter(|r| r.name == name).collect()
}

fn value(records: &[GaugeRecord], name: &str) -> f64 {
    let found = find(records, name);
    assert_eq!(found.len(), 1, "expected exactly one {}", name);
    found[0].value
}

#[test]
fn test_full_snapshot_gauge_names() {
    let records = translate(&snapshot(Section::Present(measures("ok", "ok", "ok"))));

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "eaton_ups_input_volts",
            "eaton_ups_input_hertz",
            "eaton_ups_input_amperes",
            "eaton_ups_input_volts_max",
            "eaton_ups_input_volts_min",
            "eaton_ups_input_volts_nominal",
            "eaton_ups_input_health",
            "eaton_ups_output_volts",
            "eaton_ups_output_hertz",
            "eaton_ups_output_amperes",
            "eaton_ups_output_voltamperes",
            "eaton_ups_output_watts",
            "eaton_ups_output_power_factor",
            "eaton_ups_output_average_energy",
            "eaton_ups_output_cumulated_energy",
            "eaton_ups_output_efficiency",
            "eaton_ups_output_load_ratio",
            "eaton_ups_output_health",
            "eaton_ups_battery_volts",
            "eaton_ups_battery_state_of_charge",
            "eaton_ups_battery_remaining_seconds",
            "eaton_ups_battery_health",
            "eaton_ups_system",
            "eaton_ups_temperature",
        ]
    );
    assert!(records.iter().all(|r| r.label("ups_id") == Some("ups1")));
}

#[test]
fn test_health_polarity() {
    let ok = translate(&snapshot(Section::Present(measures("ok", "ok", "ok"))));
    assert_eq!(value(&ok, "eaton_ups_input_health"), 0.0);
    assert_eq!(value(&ok, "eaton_ups_output_health"), 1.0);
    assert_eq!(value(&ok, "eaton_ups_battery_health"), 1.0);

    let bad = translate(&snapshot(Section::Present(measures(
        "critical", "warning", "critical",
    ))));
    assert_eq!(value(&bad, "eaton_ups_input_health"), 1.0);
    assert_eq!(value(&bad, "eaton_ups_output_health"), 0.0);
    assert_eq!(value(&bad, "eaton_ups_battery_health"), 0.0);
}

#[test]
fn test_missing_input_current_defaults_to_zero() {
    let records = translate(&snapshot(Section::Present(measures("ok", "ok", "ok"))));

    assert_eq!(value(&records, "eaton_ups_input_amperes"), 0.0);
    assert_eq!(value(&records, "eaton_ups_input_volts_max"), 276.0);
    assert_eq!(value(&records, "eaton_ups_input_volts_min"), 184.0);
    assert_eq!(value(&records, "eaton_ups_input_volts_nominal"), 230.0);
}

#[test]
fn test_missing_output_reading_emits_no_gauge() {
    let mut info = measures("ok", "ok", "ok");
    info.outputs.measures.efficiency = None;

    let records = translate(&snapshot(Section::Present(info)));

    assert!(find(&records, "eaton_ups_output_efficiency").is_empty());
    assert_eq!(find(&records, "eaton_ups_output_health").len(), 1);
}

#[test]
fn test_absent_measures_keep_system_and_temperature() {
    let records = translate(&snapshot(Section::Absent));

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["eaton_ups_system", "eaton_ups_temperature"]);
}

#[test]
fn test_empty_snapshot_yields_nothing() {
    let records = translate(&DeviceSnapshot {
        ups_id: "ups1".to_string(),
        ..Default::default()
    });

    assert!(records.is_empty());
}

#[test]
fn test_system_gauge_labels() {
    let records = translate(&snapshot(Section::Absent));
    let system = find(&records, "eaton_ups_system")[0];

    assert_eq!(system.value, 1.0);
    assert_eq!(
        system.label_names,
        vec!["ups_id", "name", "bootloaderVersion", "firmwareVersion"]
    );
    assert_eq!(system.label_values, vec!["ups1", "Eaton 9PX", "1.0.0", "3.0.1"]);
}

#[test]
fn test_label_lookup_tolerates_mismatched_lengths() {
    let record = GaugeRecord {
        name: "eaton_ups_system".to_string(),
        help: "UPS system details".to_string(),
        label_names: vec!["ups_id".to_string(), "name".to_string()],
        label_values: vec!["ups1".to_string()],
        value: 1.0,
    };

    assert_eq!(record.label("ups_id"), Some("ups1"));
    assert_eq!(record.label("name"), None);
    assert_eq!(record.label("position"), None);
}

#[test]
fn test_temperature_is_converted_to_celsius() {
    let records = translate(&snapshot(Section::Absent));
    let gauge = find(&records, "eaton_ups_temperature")[0];

    assert_eq!(gauge.value, 26.85);
    assert_eq!(gauge.label("name"), Some("Internal"));
    assert_eq!(gauge.label("position"), Some("inlet"));
    assert_eq!(kelvin_to_celsius(273.15), 0.0);
}

#[test]
fn test_load_ratio_uses_integer_percentage() {
    assert_eq!(load_ratio(&json!("45")), Some(0.45));
    assert_eq!(load_ratio(&json!(45)), Some(0.45));
    assert_eq!(load_ratio(&json!(45.9)), Some(0.45));
    assert_eq!(load_ratio(&json!(" 7 ")), Some(0.07));
    assert_eq!(load_ratio(&json!("45.5")), None);
    assert_eq!(load_ratio(&json!(null)), None);

    let records = translate(&snapshot(Section::Present(measures("ok", "ok", "ok"))));
    assert_eq!(value(&records, "eaton_ups_output_load_ratio"), 0.45);
}

#[test]
fn test_legacy_and_current_port_shapes_translate_alike() {
    let current = port("ok", json!({"voltage": 230.0, "frequency": 50.0}));
    let legacy = port(
        "ok",
        json!({"realtime": {"voltage": 230.0, "frequency": 50.0}}),
    );

    assert_eq!(current, legacy);
}

proptest! {
    #[test]
    fn test_one_binary_health_gauge_per_section(
        input in "[a-z]{0,10}",
        output in "[a-z]{0,10}",
        battery in "[a-z]{0,10}",
    ) {
        let records = translate(&snapshot(Section::Present(measures(&input, &output, &battery))));

        for name in ["eaton_ups_input_health", "eaton_ups_output_health", "eaton_ups_battery_health"] {
            let found = find(&records, name);
            prop_assert_eq!(found.len(), 1);
            prop_assert!(found[0].value == 0.0 || found[0].value == 1.0);
        }

        let input_health = find(&records, "eaton_ups_input_health")[0].value;
        let output_health = find(&records, "eaton_ups_output_health")[0].value;
        if input == output {
            prop_assert_eq!(input_health + output_health, 1.0);
        }
    }

    #[test]
    fn test_celsius_offset(kelvin in 200.0f64..400.0) {
        let celsius = kelvin_to_celsius(kelvin);
        prop_assert!((celsius - (kelvin - 273.15)).abs() < 1e-6);
    }

    #[test]
    fn test_load_ratio_of_integer_strings(percent in 0i64..=200) {
        let ratio = load_ratio(&json!(percent.to_string()));
        prop_assert_eq!(ratio, Some(percent as f64 / 100.0));
    }
}
