//! Outcome event publishing.
//!
//! `OutcomePublisher` delivers one event per call to a message sink:
//!
//! ```text
//! publish(event)
//!   ↓
//! 1. disabled? → Delivery::Disabled (no connection attempted)
//!   ↓
//! 2. serialize once (message id / correlation id fixed for all retries)
//!   ↓
//! 3. connect (bounded retry, blocking)
//!   ↓
//! 4. declare destination (durable) → publish (persistent, application/json)
//!   ↓
//! 5. close (guard closes on every exit path)
//! ```
//!
//! Failure policy: **strict** publishers return the error to the caller;
//! **lenient** publishers log it and report `Delivery::Dropped`.

pub mod retry;

#[cfg(feature = "redis")]
pub mod redis_streams;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use stockline_events::{Delivery, Event, EventPublisher, OutboundMessage, SinkConnector, SinkError};

use crate::config::{ConfigError, PublisherConfig};

pub use retry::{connect_with_retry, RetriesExhausted, RetryPolicy};

#[cfg(feature = "redis")]
pub use redis_streams::RedisStreamsConnector;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("could not connect to sink after {attempts} attempts: {last_error}")]
    Connect { attempts: u32, last_error: SinkError },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("event serialization failed: {0}")]
    Serialize(String),
}

impl From<RetriesExhausted> for PublishError {
    fn from(value: RetriesExhausted) -> Self {
        PublishError::Connect {
            attempts: value.attempts,
            last_error: value.last_error,
        }
    }
}

/// Publishes outcome events to a sink with enable/strict policy.
#[derive(Clone)]
pub struct OutcomePublisher {
    connector: Option<Arc<dyn SinkConnector>>,
    strict: bool,
    destination: String,
    retry: RetryPolicy,
}

impl OutcomePublisher {
    /// A publisher that never connects and always succeeds.
    pub fn disabled() -> Self {
        Self {
            connector: None,
            strict: false,
            destination: String::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn new(connector: Arc<dyn SinkConnector>, strict: bool, destination: impl Into<String>) -> Self {
        Self {
            connector: Some(connector),
            strict,
            destination: destination.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.connector.is_some()
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    fn deliver(&self, connector: &dyn SinkConnector, message: &OutboundMessage) -> Result<(), PublishError> {
        let mut channel = connect_with_retry(connector, self.retry)?;
        channel.declare_destination(&self.destination)?;
        channel.publish(&self.destination, message)?;

        // The sink already accepted the message; a failed close does not undo that.
        if let Err(e) = channel.close() {
            debug!(error = %e, "sink channel close failed after publish");
        }
        Ok(())
    }
}

impl core::fmt::Debug for OutcomePublisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutcomePublisher")
            .field("enabled", &self.is_enabled())
            .field("sink", &self.connector.as_ref().map(|c| c.address()))
            .field("strict", &self.strict)
            .field("destination", &self.destination)
            .field("retry", &self.retry)
            .finish()
    }
}

impl<E: Event> EventPublisher<E> for OutcomePublisher {
    type Error = PublishError;

    fn publish(&self, event: &E) -> Result<Delivery, PublishError> {
        let Some(connector) = &self.connector else {
            debug!(
                correlation_id = event.correlation_id(),
                "publish disabled, skipping {}",
                event.event_type()
            );
            return Ok(Delivery::Disabled);
        };

        let result = OutboundMessage::from_event(event)
            .map_err(|e| PublishError::Serialize(e.to_string()))
            .and_then(|message| self.deliver(connector.as_ref(), &message));

        match result {
            Ok(()) => {
                info!(
                    correlation_id = event.correlation_id(),
                    message_id = %event.message_id(),
                    destination = %self.destination,
                    "published {}",
                    event.event_type()
                );
                Ok(Delivery::Delivered)
            }
            Err(e) => {
                error!(
                    correlation_id = event.correlation_id(),
                    message_id = %event.message_id(),
                    strict = self.strict,
                    error = %e,
                    "publish failed"
                );
                if self.strict { Err(e) } else { Ok(Delivery::Dropped) }
            }
        }
    }
}

/// Build the configured publisher. The transport capability is resolved here,
/// once: enabled-but-unavailable is a configuration error when strict and a
/// permanently disabled publisher when lenient.
pub fn build_publisher(config: &PublisherConfig) -> Result<OutcomePublisher, ConfigError> {
    if !config.enabled {
        info!("outcome publishing disabled");
        return Ok(OutcomePublisher::disabled());
    }

    match sink_transport(config) {
        Ok(connector) => {
            info!(sink = %connector.address(), destination = %config.destination, strict = config.strict, "outcome publishing enabled");
            Ok(OutcomePublisher::new(connector, config.strict, config.destination.clone()))
        }
        Err(reason) if config.strict => Err(ConfigError::TransportUnavailable(reason)),
        Err(reason) => {
            warn!(%reason, "outcome publishing requested but unavailable; publisher disabled");
            Ok(OutcomePublisher::disabled())
        }
    }
}

#[cfg(feature = "redis")]
fn sink_transport(config: &PublisherConfig) -> Result<Arc<dyn SinkConnector>, String> {
    let connector = RedisStreamsConnector::new(&config.sink_url).map_err(|e| e.to_string())?;
    Ok(Arc::new(connector))
}

#[cfg(not(feature = "redis"))]
fn sink_transport(_config: &PublisherConfig) -> Result<Arc<dyn SinkConnector>, String> {
    Err("no sink transport compiled in (enable the `redis` feature)".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use stockline_core::OrderId;
    use stockline_events::{InMemorySink, CONTENT_TYPE_JSON};
    use stockline_inventory::{LineItem, OutcomeEvent, ReservationOutcome};

    const DEST: &str = "inventory.updated";

    fn event() -> OutcomeEvent {
        OutcomeEvent::from_outcome(
            OrderId::parse("O1").unwrap(),
            vec![LineItem::new("X", 2)],
            &ReservationOutcome::updated(),
        )
    }

    fn publisher(sink: &InMemorySink, strict: bool) -> OutcomePublisher {
        OutcomePublisher::new(Arc::new(sink.clone()), strict, DEST)
            .with_retry_policy(RetryPolicy::new(5, Duration::ZERO))
    }

    #[test]
    fn disabled_publisher_never_connects() {
        let publisher = OutcomePublisher::disabled();
        assert_eq!(publisher.publish(&event()), Ok(Delivery::Disabled));
        assert!(!publisher.is_enabled());
    }

    #[test]
    fn delivers_persistent_json_with_event_identifiers() {
        let sink = InMemorySink::new();
        let event = event();

        assert_eq!(publisher(&sink, false).publish(&event), Ok(Delivery::Delivered));

        assert_eq!(sink.declared_destinations(), vec![DEST.to_string()]);
        let published = sink.published_to(DEST);
        assert_eq!(published.len(), 1);
        let message = &published[0];
        assert_eq!(message.content_type, CONTENT_TYPE_JSON);
        assert!(message.persistent);
        assert_eq!(message.message_id, event.message_id());
        assert_eq!(message.correlation_id, "O1");
        assert_eq!(
            message.json_body().unwrap(),
            serde_json::json!({"order_id": "O1", "status": "inventory.updated", "items": [{"sku": "X", "qty": 2}]})
        );
        assert_eq!(sink.open_channels(), 0);
    }

    #[test]
    fn retries_keep_the_same_message_id() {
        let sink = InMemorySink::new().fail_first_connects(4);
        let event = event();

        assert_eq!(publisher(&sink, true).publish(&event), Ok(Delivery::Delivered));
        assert_eq!(sink.connect_attempts(), 5);
        assert_eq!(sink.published()[0].message_id, event.message_id());
    }

    #[test]
    fn lenient_publisher_swallows_unreachable_sink() {
        let sink = InMemorySink::unreachable();
        assert_eq!(publisher(&sink, false).publish(&event()), Ok(Delivery::Dropped));
        assert_eq!(sink.connect_attempts(), 5);
    }

    #[test]
    fn strict_publisher_surfaces_unreachable_sink() {
        let sink = InMemorySink::unreachable();
        let err = publisher(&sink, true).publish(&event()).unwrap_err();
        assert!(matches!(err, PublishError::Connect { attempts: 5, .. }));
    }

    #[test]
    fn publish_errors_follow_policy_and_release_the_channel() {
        let sink = InMemorySink::new().failing_publishes();
        assert_eq!(publisher(&sink, false).publish(&event()), Ok(Delivery::Dropped));
        assert_eq!(sink.open_channels(), 0);

        let err = publisher(&sink, true).publish(&event()).unwrap_err();
        assert!(matches!(err, PublishError::Sink(SinkError::Publish(_))));
        assert_eq!(sink.open_channels(), 0);
        assert!(sink.published().is_empty());
    }

    #[test]
    fn build_publisher_disabled_by_default() {
        let publisher = build_publisher(&PublisherConfig::default()).unwrap();
        assert!(!publisher.is_enabled());
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn missing_transport_follows_strictness() {
        let lenient = PublisherConfig {
            enabled: true,
            ..PublisherConfig::default()
        };
        assert!(!build_publisher(&lenient).unwrap().is_enabled());

        let strict = PublisherConfig {
            enabled: true,
            strict: true,
            ..PublisherConfig::default()
        };
        assert!(matches!(build_publisher(&strict), Err(ConfigError::TransportUnavailable(_))));
    }

    #[cfg(feature = "redis")]
    #[test]
    fn invalid_sink_url_follows_strictness() {
        let lenient = PublisherConfig {
            enabled: true,
            sink_url: "not a url".to_string(),
            ..PublisherConfig::default()
        };
        assert!(!build_publisher(&lenient).unwrap().is_enabled());

        let strict = PublisherConfig { strict: true, ..lenient };
        assert!(matches!(build_publisher(&strict), Err(ConfigError::TransportUnavailable(_))));
    }
}
