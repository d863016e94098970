//! Test double for the Loki push endpoint.

#![allow(dead_code)]

use async_trait::async_trait;
use loki_log_sink::stream::PushRequest;
use loki_log_sink::{Transport, TransportError};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

/// Records every push attempt and answers from a script of statuses
/// (200 once the script runs out).
#[derive(Default)]
pub struct RecordingTransport {
    script: Mutex<VecDeque<u16>>,
    attempts: Mutex<Vec<(Instant, PushRequest)>>,
    delivered: Mutex<Vec<PushRequest>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            script: Mutex::new(statuses.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Payloads that were answered with 2xx.
    pub fn delivered(&self) -> Vec<PushRequest> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// All delivered lines, in delivery order.
    pub fn lines(&self) -> Vec<String> {
        self.delivered()
            .iter()
            .flat_map(|req| req.streams.iter())
            .flat_map(|s| s.values.iter().map(|v| v[1].clone()))
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn push(&self, body: Vec<u8>) -> Result<u16, TransportError> {
        let request: PushRequest =
            serde_json::from_slice(&body).map_err(|e| TransportError::Request(Box::new(e)))?;
        self.attempts.lock().unwrap().push((Instant::now(), request.clone()));

        let status = self.script.lock().unwrap().pop_front().unwrap_or(200);
        if (200..300).contains(&status) {
            self.delivered.lock().unwrap().push(request);
        }
        Ok(status)
    }
}
