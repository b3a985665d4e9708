//! Log capture for tests that assert on emitted severities.

use std::sync::{Arc, Mutex};

use tracing::{Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

/// Records `(level, target)` of every event seen while installed.
#[derive(Clone, Default)]
pub(crate) struct CapturedEvents {
    events: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturedEvents {
    /// Events at `level` emitted by this workspace's crates.
    pub(crate) fn count(&self, level: Level) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, target)| *l == level && target.starts_with("stockline"))
            .count()
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        self.events
            .lock()
            .unwrap()
            .push((*meta.level(), meta.target().to_string()));
    }
}

/// Run `f` with a capturing subscriber as the thread's default.
pub(crate) fn capture_events<T>(f: impl FnOnce() -> T) -> (T, CapturedEvents) {
    let captured = CapturedEvents::default();
    let subscriber = Registry::default().with(captured.clone());
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, captured)
}
