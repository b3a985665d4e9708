use chrono::{DateTime, Utc};

use stockline_core::MessageId;

use crate::event::Event;

/// Content type marker for JSON bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A serialized event plus the delivery properties a sink needs.
///
/// Built once per publish call; retries reuse the same message (and therefore
/// the same identifiers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub message_id: MessageId,
    pub correlation_id: String,
    pub event_type: String,
    pub content_type: &'static str,
    /// Ask the sink to persist the message (survive broker restarts).
    pub persistent: bool,
    pub occurred_at: DateTime<Utc>,
    pub body: Vec<u8>,
}

impl OutboundMessage {
    /// Serialize an event as a persistent JSON message.
    pub fn from_event<E: Event>(event: &E) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(event)?;
        Ok(Self {
            message_id: event.message_id(),
            correlation_id: event.correlation_id().to_string(),
            event_type: event.event_type().to_string(),
            content_type: CONTENT_TYPE_JSON,
            persistent: true,
            occurred_at: event.occurred_at(),
            body,
        })
    }

    /// Body decoded as JSON (diagnostics and tests).
    pub fn json_body(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}
