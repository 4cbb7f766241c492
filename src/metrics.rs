//! Prometheus Rendering
//!
//! Turns the [`GaugeRecord`]s of one collection into the Prometheus text
//! exposition format.
//!
//! Nothing is cached between scrapes: every call builds a fresh registry, so a
//! device that disappears from one batch also disappears from the output.
//! Records sharing a name are grouped into one `GaugeVec`, which lets several
//! devices coexist under the same metric, told apart by their `ups_id` label.

use crate::translate::GaugeRecord;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Render gauge records in Prometheus text format
pub fn render(records: &[GaugeRecord]) -> anyhow::Result<String> {
    let registry = Registry::new();
    let mut families: HashMap<&str, GaugeVec> = HashMap::new();

    for record in records {
        let family = match families.entry(record.name.as_str()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let label_names: Vec<&str> =
                    record.label_names.iter().map(String::as_str).collect();
                let family =
                    GaugeVec::new(Opts::new(record.name.as_str(), record.help.as_str()), &label_names)?;
                registry.register(Box::new(family.clone()))?;
                entry.insert(family)
            }
        };

        let label_values: Vec<&str> = record.label_values.iter().map(String::as_str).collect();
        family
            .get_metric_with_label_values(&label_values)?
            .set(record.value);
    }

    let encoder = TextEncoder::new();
    let metric_families = registry.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
