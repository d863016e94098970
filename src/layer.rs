use crate::adapter::{LogAdapter, LokiAdapter};
use crate::record::{FieldValue, Level, Log};
use chrono::Utc;
use std::collections::BTreeMap;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Target prefix of this crate's own diagnostics. Events under it are never
/// shipped, so a failing backend cannot feed its own error log.
pub const INTERNAL_TARGET_PREFIX: &str = "loki_log_sink";

/// `tracing_subscriber` layer that turns events into [`Log`] records and
/// submits them to a [`LokiAdapter`].
///
/// Every event is forwarded; level filtering and formatting happen in the
/// adapter, so its counters account for everything the layer saw. Network
/// I/O never runs on the application thread.
#[derive(Clone)]
pub struct LokiLayer {
    adapter: LokiAdapter,
    name_from_target: bool,
}

impl LokiLayer {
    pub fn new(adapter: LokiAdapter) -> Self {
        Self {
            adapter,
            name_from_target: false,
        }
    }

    /// Use the event target (usually the module path) as the logger name.
    pub fn with_name_from_target(mut self, enabled: bool) -> Self {
        self.name_from_target = enabled;
        self
    }

    pub fn adapter(&self) -> &LokiAdapter {
        &self.adapter
    }
}

impl<S> Layer<S> for LokiLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target().starts_with(INTERNAL_TARGET_PREFIX) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;
        let mut error: Option<String> = None;

        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
            error: &mut error,
        };
        event.record(&mut visitor);

        let record = Log {
            timestamp: Utc::now(),
            level: Level::from(*meta.level()),
            message: message.unwrap_or_default(),
            fields,
            name: self.name_from_target.then(|| meta.target().to_string()),
            error,
        };

        self.adapter.log(record);
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, FieldValue>,
    pub message: &'a mut Option<String>,
    pub error: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn insert(&mut self, field: &Field, value: FieldValue) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.insert(field, FieldValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, FieldValue::Int(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, FieldValue::UInt(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, FieldValue::Float(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, FieldValue::Bool(value));
    }

    fn record_error(&mut self, _field: &Field, value: &(dyn std::error::Error + 'static)) {
        *self.error = Some(value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, FieldValue::Str(format!("{:?}", value)));
        }
    }
}
