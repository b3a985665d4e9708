//! In-memory message sink for tests/dev.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::message::OutboundMessage;
use crate::sink::{SinkChannel, SinkConnector, SinkError};

#[derive(Debug, Default)]
struct SinkState {
    unreachable: bool,
    connect_failures_remaining: u32,
    fail_publish: bool,
    connect_attempts: u32,
    open_channels: u32,
    declared: Vec<String>,
    published: Vec<(String, OutboundMessage)>,
}

/// In-memory sink.
///
/// - No IO
/// - Records every declared destination and published message
/// - Failure injection for connection and publish paths
///
/// Clones share state, so a test can keep a handle while the publisher owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    state: Arc<Mutex<SinkState>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that refuses every connection attempt.
    pub fn unreachable() -> Self {
        let sink = Self::new();
        sink.lock().unreachable = true;
        sink
    }

    /// Refuse the next `n` connection attempts, then accept.
    pub fn fail_first_connects(self, n: u32) -> Self {
        self.lock().connect_failures_remaining = n;
        self
    }

    /// Accept connections but fail every publish.
    pub fn failing_publishes(self) -> Self {
        self.lock().fail_publish = true;
        self
    }

    pub fn connect_attempts(&self) -> u32 {
        self.lock().connect_attempts
    }

    /// Channels opened and not yet closed.
    pub fn open_channels(&self) -> u32 {
        self.lock().open_channels
    }

    pub fn declared_destinations(&self) -> Vec<String> {
        self.lock().declared.clone()
    }

    pub fn published(&self) -> Vec<OutboundMessage> {
        self.lock().published.iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn published_to(&self, destination: &str) -> Vec<OutboundMessage> {
        self.lock()
            .published
            .iter()
            .filter(|(d, _)| d == destination)
            .map(|(_, m)| m.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        // A panicking test thread must not hide what was recorded.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SinkConnector for InMemorySink {
    fn connect(&self) -> Result<Box<dyn SinkChannel>, SinkError> {
        let mut state = self.lock();
        state.connect_attempts += 1;

        if state.unreachable {
            return Err(SinkError::Connection("in-memory sink unreachable".to_string()));
        }
        if state.connect_failures_remaining > 0 {
            state.connect_failures_remaining -= 1;
            return Err(SinkError::Connection("in-memory sink refused connection".to_string()));
        }

        state.open_channels += 1;
        Ok(Box::new(InMemoryChannel {
            sink: self.clone(),
            open: true,
        }))
    }

    fn address(&self) -> String {
        "memory://".to_string()
    }
}

struct InMemoryChannel {
    sink: InMemorySink,
    open: bool,
}

impl SinkChannel for InMemoryChannel {
    fn declare_destination(&mut self, destination: &str) -> Result<(), SinkError> {
        let mut state = self.sink.lock();
        if !state.declared.iter().any(|d| d == destination) {
            state.declared.push(destination.to_string());
        }
        Ok(())
    }

    fn publish(&mut self, destination: &str, message: &OutboundMessage) -> Result<(), SinkError> {
        let mut state = self.sink.lock();
        if state.fail_publish {
            return Err(SinkError::Publish("in-memory sink rejected message".to_string()));
        }
        if !state.declared.iter().any(|d| d == destination) {
            return Err(SinkError::Publish(format!("destination '{destination}' not declared")));
        }
        state.published.push((destination.to_string(), message.clone()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.open {
            self.open = false;
            self.sink.lock().open_channels -= 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::CONTENT_TYPE_JSON;
    use crate::sink::ScopedChannel;
    use chrono::Utc;
    use stockline_core::MessageId;

    fn message() -> OutboundMessage {
        OutboundMessage {
            message_id: MessageId::new(),
            correlation_id: "O1".to_string(),
            event_type: "inventory.updated".to_string(),
            content_type: CONTENT_TYPE_JSON,
            persistent: true,
            occurred_at: Utc::now(),
            body: b"{}".to_vec(),
        }
    }

    #[test]
    fn records_published_messages_per_destination() {
        let sink = InMemorySink::new();
        let mut channel = ScopedChannel::new(sink.connect().unwrap());
        channel.declare_destination("inventory.updated").unwrap();
        channel.publish("inventory.updated", &message()).unwrap();
        channel.close().unwrap();

        assert_eq!(sink.published_to("inventory.updated").len(), 1);
        assert!(sink.published_to("other").is_empty());
        assert_eq!(sink.open_channels(), 0);
    }

    #[test]
    fn publishing_to_undeclared_destination_fails() {
        let sink = InMemorySink::new();
        let mut channel = sink.connect().unwrap();
        let err = channel.publish("nowhere", &message()).unwrap_err();
        assert!(matches!(err, SinkError::Publish(_)));
    }

    #[test]
    fn dropped_guard_closes_channel() {
        let sink = InMemorySink::new();
        {
            let _channel = ScopedChannel::new(sink.connect().unwrap());
            assert_eq!(sink.open_channels(), 1);
        }
        assert_eq!(sink.open_channels(), 0);
    }

    #[test]
    fn refuses_first_connects_then_accepts() {
        let sink = InMemorySink::new().fail_first_connects(2);
        assert!(sink.connect().is_err());
        assert!(sink.connect().is_err());
        assert!(sink.connect().is_ok());
        assert_eq!(sink.connect_attempts(), 3);
    }
}
