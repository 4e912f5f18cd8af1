use tracing::{Event, Subscriber};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{layer::Context, EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "warn,prize_wheel_driver=info,prize_wheel_shared=info";

#[derive(Default)]
struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        }
    }
}

struct WheelLayer;

impl<S: Subscriber> Layer<S> for WheelLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if visitor.0.is_empty() {
            return;
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        match *metadata.level() {
            tracing::Level::ERROR => eprintln!("[{}] ❌ Error: {} - {}", timestamp, metadata.target(), visitor.0),
            tracing::Level::WARN => println!("[{}] ⚠️ Warning: {} - {}", timestamp, metadata.target(), visitor.0),
            tracing::Level::INFO => println!("[{}] 🎡 {} - {}", timestamp, metadata.target(), visitor.0),
            _ => println!("[{}] 🔄 {} - {}", timestamp, metadata.target(), visitor.0),
        }
    }
}

/// Installs the global subscriber. `log` records from the shared crate are
/// forwarded through the same filter.
pub fn setup() -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    Registry::default()
        .with(env_filter)
        .with(WheelLayer)
        .try_init()
}
