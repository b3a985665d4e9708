use chrono::{DateTime, Utc};
use serde::Serialize;

use stockline_core::MessageId;

/// An integration event destined for external consumers.
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **identified** once at construction (`message_id`), so re-sending the same
///   event never mints a new identity
/// - **correlated** with the business request that produced them
pub trait Event: Clone + core::fmt::Debug + Serialize + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "inventory.updated").
    fn event_type(&self) -> &'static str;

    /// Identifier downstream consumers dedupe on.
    fn message_id(&self) -> MessageId;

    /// Identifier of the originating business request.
    fn correlation_id(&self) -> &str;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
