//! Snapshot → gauge translation
//!
//! Flattens a [`DeviceSnapshot`] into [`GaugeRecord`]s. Pure: no I/O, no
//! shared state.
//!
//! # Metrics Produced
//!
//! All gauges carry a `ups_id` label.
//!
//! - `eaton_ups_input_*` - volts, hertz, amperes, volts_max, volts_min,
//!   volts_nominal, health (0=ok, 1=not ok)
//! - `eaton_ups_output_*` - volts, hertz, amperes, voltamperes, watts,
//!   power_factor, average_energy, cumulated_energy, efficiency, load_ratio,
//!   health (1=ok, 0=not ok)
//! - `eaton_ups_battery_*` - volts, state_of_charge, remaining_seconds,
//!   health (1=ok, 0=not ok)
//! - `eaton_ups_system` - always 1
//!   - Labels: ups_id, name, bootloaderVersion, firmwareVersion
//! - `eaton_ups_temperature` - degrees Celsius
//!   - Labels: ups_id, name, position
//!
//! A reading missing from the payload yields no gauge, except input current
//! which defaults to 0. Absent sections yield no gauges at all.

use crate::ups::types::{
    DeviceSnapshot, MeasureInfo, PowerBank, PowerPort, SystemInfo, TemperatureInfo,
};
use serde_json::Value;

pub const NAMESPACE: &str = "eaton_ups";

const KELVIN_OFFSET: f64 = 273.15;

/// One labeled gauge sample
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeRecord {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
    pub label_values: Vec<String>,
    pub value: f64,
}

impl GaugeRecord {
    /// Value of the label called `name`, if the record has one
    pub fn label(&self, name: &str) -> Option<&str> {
        self.label_names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.label_values.get(i))
            .map(String::as_str)
    }
}

struct Gauges<'a> {
    ups_id: &'a str,
    records: Vec<GaugeRecord>,
}

impl Gauges<'_> {
    fn labeled(&mut self, name: &str, help: &str, extra: &[(&str, &str)], value: f64) {
        let mut label_names = vec!["ups_id".to_string()];
        let mut label_values = vec![self.ups_id.to_string()];
        for (label, label_value) in extra {
            label_names.push(label.to_string());
            label_values.push(label_value.to_string());
        }

        self.records.push(GaugeRecord {
            name: format!("{}_{}", NAMESPACE, name),
            help: help.to_string(),
            label_names,
            label_values,
            value,
        });
    }

    fn set(&mut self, name: &str, help: &str, value: Option<f64>) {
        if let Some(value) = value {
            self.labeled(name, help, &[], value);
        }
    }
}

/// Translate one snapshot into gauge records, sections in the order
/// measures, system, temperature.
pub fn translate(snapshot: &DeviceSnapshot) -> Vec<GaugeRecord> {
    let mut gauges = Gauges {
        ups_id: &snapshot.ups_id,
        records: Vec::new(),
    };

    if let Some(measures) = snapshot.measures.present() {
        measure_records(&mut gauges, measures);
    }
    if let Some(system) = snapshot.system.present() {
        system_records(&mut gauges, system);
    }
    if let Some(temperature) = snapshot.temperature.present() {
        temperature_records(&mut gauges, temperature);
    }

    gauges.records
}

fn measure_records(gauges: &mut Gauges<'_>, measures: &MeasureInfo) {
    input_records(gauges, &measures.inputs);
    output_records(gauges, &measures.outputs);
    battery_records(gauges, &measures.powerbank);
}

fn input_records(gauges: &mut Gauges<'_>, inputs: &PowerPort) {
    let m = &inputs.measures;
    gauges.set("input_volts", "UPS input voltage (V)", m.voltage);
    gauges.set("input_hertz", "UPS input frequency (Hz)", m.frequency);
    gauges.set(
        "input_amperes",
        "UPS input current (A)",
        Some(m.current.unwrap_or(0.0)),
    );

    let rating = inputs.specifications.voltage.clone().unwrap_or_default();
    gauges.set("input_volts_max", "UPS input voltage (V)", rating.max_reading);
    gauges.set("input_volts_min", "UPS input voltage (V)", rating.min_reading);
    gauges.set("input_volts_nominal", "UPS input voltage (V)", rating.nominal);

    // Inverted polarity compared to output and battery health
    let health = if inputs.status.is_ok() { 0.0 } else { 1.0 };
    gauges.set("input_health", "UPS input health status", Some(health));
}

fn output_records(gauges: &mut Gauges<'_>, outputs: &PowerPort) {
    let m = &outputs.measures;
    gauges.set("output_volts", "UPS output voltage (V)", m.voltage);
    gauges.set("output_hertz", "UPS output frequency (Hz)", m.frequency);
    gauges.set("output_amperes", "UPS output current (A)", m.current);
    gauges.set(
        "output_voltamperes",
        "UPS output apparent power (VA)",
        m.apparent_power,
    );
    gauges.set("output_watts", "UPS output active power (W)", m.active_power);
    gauges.set("output_power_factor", "UPS output power factor", m.power_factor);
    gauges.set(
        "output_average_energy",
        "UPS output average energy",
        m.average_energy,
    );
    gauges.set(
        "output_cumulated_energy",
        "UPS output cumulated energy",
        m.cumulated_energy,
    );
    gauges.set("output_efficiency", "UPS output efficiency", m.efficiency);
    gauges.set(
        "output_load_ratio",
        "Ratio of the output apparent power vs. the UPS's capacity in VA.",
        m.percent_load.as_ref().and_then(load_ratio),
    );

    let health = if outputs.status.is_ok() { 1.0 } else { 0.0 };
    gauges.set("output_health", "UPS output health status", Some(health));
}

fn battery_records(gauges: &mut Gauges<'_>, powerbank: &PowerBank) {
    let m = &powerbank.measures;
    gauges.set("battery_volts", "UPS battery voltage (V)", m.voltage);
    gauges.set(
        "battery_state_of_charge",
        "UPS battery state of charge (%)",
        m.state_of_charge,
    );
    gauges.set(
        "battery_remaining_seconds",
        "UPS remaining battery time (s)",
        m.remaining_time,
    );

    let health = if powerbank.status.is_ok() { 1.0 } else { 0.0 };
    gauges.set("battery_health", "UPS health status", Some(health));
}

fn system_records(gauges: &mut Gauges<'_>, system: &SystemInfo) {
    gauges.labeled(
        "system",
        "UPS system details",
        &[
            ("name", system.name.as_str()),
            ("bootloaderVersion", system.bootloader_version.as_str()),
            ("firmwareVersion", system.firmware_version.as_str()),
        ],
        1.0,
    );
}

fn temperature_records(gauges: &mut Gauges<'_>, temperature: &TemperatureInfo) {
    gauges.labeled(
        "temperature",
        "UPS temperature (C)",
        &[
            ("name", temperature.name.as_str()),
            ("position", temperature.position.as_str()),
        ],
        kelvin_to_celsius(temperature.measure),
    );
}

/// Convert Kelvin to Celsius, rounded to micro-degrees so that the
/// subtraction does not leak floating point noise into the exported value.
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    ((kelvin - KELVIN_OFFSET) * 1e6).round() / 1e6
}

/// `percentLoad` as a ratio: the integer percentage divided by 100.
///
/// Accepts a JSON integer, a float (truncated) or a string holding an integer.
pub fn load_ratio(percent_load: &Value) -> Option<f64> {
    let percent = match percent_load {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    Some(percent as f64 / 100.0)
}
