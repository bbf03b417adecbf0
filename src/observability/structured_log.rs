/// JSON lines for domain events.
use serde_json::json;
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// Field prefix that marks an event as a domain event.
pub(crate) const EVENT_PREFIX: &str = "trendai.";

/// Re-emits events carrying `trendai.*` fields (for example
/// `"trendai.event" = "spike_detected"`) as one JSON object per line on stderr.
pub(crate) struct StructuredLogLayer;

#[derive(Default)]
struct JsonVisitor {
    values: serde_json::Map<String, serde_json::Value>,
    tagged: bool,
}

impl JsonVisitor {
    fn insert(&mut self, field: &tracing::field::Field, value: serde_json::Value) {
        if field.name().starts_with(EVENT_PREFIX) {
            self.tagged = true;
        }
        self.values.insert(field.name().to_string(), value);
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.insert(field, json!(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.insert(field, json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, json!(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.insert(field, json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, json!(value));
    }
}

pub(crate) fn render_event(event: &Event<'_>) -> Option<serde_json::Value> {
    let mut visitor = JsonVisitor::default();
    event.record(&mut visitor);
    if !visitor.tagged {
        return None;
    }

    Some(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "level": event.metadata().level().as_str(),
        "target": event.metadata().target(),
        "fields": visitor.values,
    }))
}

impl<S: Subscriber> Layer<S> for StructuredLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() > tracing::Level::INFO {
            return;
        }
        if let Some(entry) = render_event(event) {
            eprintln!("{}", serde_json::to_string(&entry).unwrap_or_default());
        }
    }
}
