//! Turns facade [`Log`] records into buffered [`LogEntry`] values.

use crate::config::LokiConfig;
use crate::record::{sanitize_label_name, FieldValue, LabelSet, Log, LogEntry};
use std::collections::BTreeMap;

/// Label carrying the logger name, when the record has one.
pub const LOGGER_NAME_LABEL: &str = "logger_name";

/// Label carrying the record severity. Always present.
pub const LEVEL_LABEL: &str = "level";

/// Format `log` into an entry, or `None` when the adapter is disabled or the
/// record is below the minimum level.
///
/// Labels are built in this order, later steps overwriting earlier ones:
/// static labels, primitive fields, `logger_name`, `level`. Field keys are
/// sanitized into valid label names first (`http.method` becomes
/// `http_method`). Fields whose label did not end up carrying their own
/// value are appended to the line as compact JSON under their original key.
pub fn format_entry(config: &LokiConfig, log: Log) -> Option<LogEntry> {
    if !config.enabled || !config.level.is_enabled(log.level) {
        return None;
    }

    let level = log.level.to_string();
    let mut labels: LabelSet = config.labels.clone();

    for (key, value) in &log.fields {
        if let (Some(name), Some(label)) = (sanitize_label_name(key), value.as_label()) {
            labels.insert(name, label);
        }
    }

    let name = log.name.as_deref().filter(|n| !n.is_empty());
    if let Some(name) = name {
        labels.insert(LOGGER_NAME_LABEL.to_string(), name.to_string());
    }

    labels.insert(LEVEL_LABEL.to_string(), level.clone());

    let mut line = match name {
        Some(name) => format!("[{}]: {}", name, log.message),
        None => log.message,
    };

    if let Some(error) = &log.error {
        if !line.is_empty() {
            line.push_str(" - ");
        }
        line.push_str("Error: ");
        line.push_str(error);
    }

    let leftover: BTreeMap<&String, &FieldValue> = log
        .fields
        .iter()
        .filter(|(key, value)| !promoted(&labels, key, value))
        .collect();

    if !leftover.is_empty() {
        if let Ok(json) = serde_json::to_string(&leftover) {
            if !line.is_empty() {
                line.push_str(" | ");
            }
            line.push_str(&json);
        }
    }

    Some(LogEntry {
        timestamp: log.timestamp,
        line,
        level,
        labels,
    })
}

// A field counts as promoted only if the final label under its sanitized key
// is the field's own value; overwritten or non-primitive fields stay in the line.
fn promoted(labels: &LabelSet, key: &str, value: &FieldValue) -> bool {
    let label = sanitize_label_name(key).and_then(|name| labels.get(&name));
    match (label, value.as_label()) {
        (Some(label), Some(own)) => *label == own,
        _ => false,
    }
}
