//! UPS API Type Definitions
//!
//! Typed shapes for every hop of the mbdetnrs resource graph and the telemetry
//! assembled from it.
//!
//! # Resource Graph
//!
//! ```text
//! managers/1                      → ManagerOverview → SystemInfo
//! environmentService/temperatures → TemperatureCollection → @id → TemperatureInfo
//! powerDistributions/1            → PowerDistribution
//!     inputs/@id  + "/1"          → PowerPort
//!     outputs/@id + "/1"          → PowerPort
//!     backupSystem/@id            → BackupSystem → powerBank/@id → PowerBank
//! ```
//!
//! # Design Notes
//!
//! - **Links**: every hop deserializes into a struct whose link fields are
//!   required, so a missing `@id` fails at the hop that needed it.
//! - **Firmware drift**: measurement fields are `Option` because their presence
//!   varies by model and firmware. Older firmware wraps port measures in an extra
//!   `realtime` object; that shape is normalized while deserializing, so the rest
//!   of the crate only ever sees [`Measures`].

#![allow(dead_code)] // Keep complete API shapes even where fields are not exported
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of the token request
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub grant_type: &'a str,
    pub scope: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

/// Hypermedia link to another resource
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Link {
    #[serde(rename = "@id")]
    pub id: String,
}

/// Response of `managers/1`
#[derive(Debug, Deserialize, Clone)]
pub struct ManagerOverview {
    pub identification: SystemInfo,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bootloader_version: String,
    #[serde(default)]
    pub firmware_version: String,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
}

/// Response of `environmentService/temperatures`
#[derive(Debug, Deserialize, Clone)]
pub struct TemperatureCollection {
    #[serde(default)]
    pub members: Vec<Link>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TemperatureInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: String,
    /// Reading in Kelvin
    pub measure: f64,
}

/// Response of `powerDistributions/1`
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PowerDistribution {
    pub id: Value,
    pub inputs: Link,
    pub outputs: Link,
    pub backup_system: Link,
}

impl PowerDistribution {
    /// The `id` field rendered as text; devices send it as a string or a number.
    pub fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BackupSystem {
    pub power_bank: Link,
}

/// One input or output port of the power distribution
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PowerPort {
    #[serde(deserialize_with = "normalize_measures")]
    pub measures: Measures,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub specifications: Specifications,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Measures {
    pub voltage: Option<f64>,
    pub frequency: Option<f64>,
    pub current: Option<f64>,
    pub apparent_power: Option<f64>,
    pub active_power: Option<f64>,
    pub power_factor: Option<f64>,
    /// Integer percentage; some firmware sends it as a string
    pub percent_load: Option<Value>,
    pub average_energy: Option<f64>,
    pub cumulated_energy: Option<f64>,
    pub efficiency: Option<f64>,
}

fn normalize_measures<'de, D>(deserializer: D) -> Result<Measures, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Versioned {
        Legacy { realtime: Measures },
        Current(Measures),
    }

    Ok(match Versioned::deserialize(deserializer)? {
        Versioned::Legacy { realtime } => realtime,
        Versioned::Current(measures) => measures,
    })
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Status {
    pub health: Option<String>,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        self.health.as_deref() == Some("ok")
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Specifications {
    pub voltage: Option<VoltageSpecification>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoltageSpecification {
    pub min_reading: Option<f64>,
    pub max_reading: Option<f64>,
    pub nominal: Option<f64>,
}

/// Battery detail behind `backupSystem` → `powerBank`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PowerBank {
    #[serde(default)]
    pub measures: BatteryMeasures,
    #[serde(default)]
    pub status: Status,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatteryMeasures {
    pub voltage: Option<f64>,
    pub state_of_charge: Option<f64>,
    /// Seconds of autonomy left
    pub remaining_time: Option<f64>,
}

/// Electrical readings of one device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureInfo {
    pub ups_id: String,
    pub inputs: PowerPort,
    pub outputs: PowerPort,
    pub powerbank: PowerBank,
}

/// Outcome of reading one snapshot section.
///
/// A section that failed in a recoverable way (login or decode failure) is
/// [`Section::Absent`]; hard failures never reach a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Section<T> {
    Present(T),
    Absent,
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Section::Absent
    }
}

impl<T> Section<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            Section::Present(value) => Some(value),
            Section::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Section::Present(_))
    }
}

impl<T> From<Option<T>> for Section<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Section::Absent, Section::Present)
    }
}

/// One full telemetry read from a single device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceSnapshot {
    /// Identifier used as the `ups_id` label of every gauge
    pub ups_id: String,
    pub system: Section<SystemInfo>,
    pub temperature: Section<TemperatureInfo>,
    pub measures: Section<MeasureInfo>,
}
