//! Engine event sink for the HTTP process.

use engine::{BroadcastNotifier, EngineEvent, Notifier};
use tokio::sync::broadcast;

/// Logs every engine event and forwards it to subscribers.
///
/// Subscribers are the realtime layer (websocket push); the server itself
/// only logs.
#[derive(Clone, Debug)]
pub struct TracingNotifier {
    broadcast: BroadcastNotifier,
}

impl TracingNotifier {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            broadcast: BroadcastNotifier::new(capacity),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.broadcast.subscribe()
    }
}

impl Notifier for TracingNotifier {
    fn emit(&self, event: &EngineEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => tracing::info!(event = event.name(), %payload, "engine event"),
            Err(err) => tracing::warn!(event = event.name(), "failed to encode engine event: {err}"),
        }
        self.broadcast.emit(event);
    }
}
