//! Grouping of buffered entries into Loki streams and the push payload.

use crate::record::{LabelSet, LogEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One Loki stream: a label set and its `[timestamp, line]` pairs in arrival
/// order. Timestamps are Unix nanoseconds rendered as decimal strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub stream: LabelSet,
    pub values: Vec<[String; 2]>,
}

/// Body of a `POST /loki/api/v1/push` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    pub streams: Vec<Stream>,
}

impl PushRequest {
    /// Total number of lines across all streams.
    pub fn entry_count(&self) -> usize {
        self.streams.iter().map(|s| s.values.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Result of grouping a buffer snapshot.
#[derive(Debug, Default)]
pub struct Grouped {
    pub request: PushRequest,
    /// Entries left out because their labels or timestamp could not be encoded.
    pub skipped: usize,
}

/// Partition `entries` by label set identity.
///
/// Identity is the compact JSON of the (key-sorted) label map, so two
/// entries share a stream iff their labels are structurally equal. Streams
/// are emitted in order of first appearance; Loki treats them as a set.
pub fn group_entries(entries: Vec<LogEntry>) -> Grouped {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut grouped = Grouped::default();

    for entry in entries {
        let key = match serde_json::to_string(&entry.labels) {
            Ok(key) => key,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize loki labels, skipping entry");
                grouped.skipped += 1;
                continue;
            }
        };

        let Some(nanos) = entry.timestamp.timestamp_nanos_opt() else {
            tracing::error!(
                timestamp = %entry.timestamp,
                "timestamp outside the nanosecond range, skipping entry"
            );
            grouped.skipped += 1;
            continue;
        };

        let streams = &mut grouped.request.streams;
        let slot = *index.entry(key).or_insert_with(|| {
            streams.push(Stream {
                stream: entry.labels.clone(),
                values: Vec::new(),
            });
            streams.len() - 1
        });

        streams[slot].values.push([nanos.to_string(), entry.line]);
    }

    grouped
}
