//! Integration events and the outbound message sink abstraction (mechanics only).

pub mod event;
pub mod in_memory_sink;
pub mod message;
pub mod publisher;
pub mod sink;

pub use event::Event;
pub use in_memory_sink::InMemorySink;
pub use message::{OutboundMessage, CONTENT_TYPE_JSON};
pub use publisher::{Delivery, EventPublisher};
pub use sink::{ScopedChannel, SinkChannel, SinkConnector, SinkError};
