//! Message sink abstraction (transport-agnostic).
//!
//! A `SinkConnector` opens private, short-lived channels to a broker. A channel
//! declares a destination and publishes messages to it. Connections are never
//! shared or pooled: each publish call owns its channel for its lifetime.

use std::sync::Arc;

use thiserror::Error;

use crate::message::OutboundMessage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("sink connection failed: {0}")]
    Connection(String),

    #[error("destination declaration failed: {0}")]
    Declare(String),

    #[error("publish failed: {0}")]
    Publish(String),
}

/// An open connection to a sink.
pub trait SinkChannel: Send {
    /// Declare a durable destination (idempotent).
    fn declare_destination(&mut self, destination: &str) -> Result<(), SinkError>;

    fn publish(&mut self, destination: &str, message: &OutboundMessage) -> Result<(), SinkError>;

    /// Release the connection. Called at most once.
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Factory for sink channels.
pub trait SinkConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn SinkChannel>, SinkError>;

    /// Address of the sink, safe for logs (no credentials).
    fn address(&self) -> String;
}

impl<C> SinkConnector for Arc<C>
where
    C: SinkConnector + ?Sized,
{
    fn connect(&self) -> Result<Box<dyn SinkChannel>, SinkError> {
        (**self).connect()
    }

    fn address(&self) -> String {
        (**self).address()
    }
}

/// Channel guard: the underlying connection is closed on every exit path.
///
/// Prefer `close()` to observe the close result; dropping an unclosed guard
/// closes the channel and discards any error.
pub struct ScopedChannel {
    inner: Box<dyn SinkChannel>,
    closed: bool,
}

impl ScopedChannel {
    pub fn new(inner: Box<dyn SinkChannel>) -> Self {
        Self { inner, closed: false }
    }

    pub fn declare_destination(&mut self, destination: &str) -> Result<(), SinkError> {
        self.inner.declare_destination(destination)
    }

    pub fn publish(&mut self, destination: &str, message: &OutboundMessage) -> Result<(), SinkError> {
        self.inner.publish(destination, message)
    }

    pub fn close(mut self) -> Result<(), SinkError> {
        self.closed = true;
        self.inner.close()
    }
}

impl Drop for ScopedChannel {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            if let Err(e) = self.inner.close() {
                tracing::debug!("sink channel close failed: {e}");
            }
        }
    }
}

impl core::fmt::Debug for ScopedChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopedChannel").field("closed", &self.closed).finish()
    }
}
