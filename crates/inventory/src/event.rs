//! Outcome event published after every decided reservation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockline_core::{MessageId, OrderId};
use stockline_events::Event;

use crate::demand::LineItem;
use crate::outcome::ReservationOutcome;

/// Externally observed status vocabulary. Stable; consumers match on it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeStatus {
    #[serde(rename = "inventory.updated")]
    Updated,
    #[serde(rename = "inventory.failed")]
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Updated => "inventory.updated",
            OutcomeStatus::Failed => "inventory.failed",
        }
    }
}

impl core::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    OutOfStock,
}

/// Event: reservation decided for an order.
///
/// The JSON body is `{order_id, status, items, reason?}`. `items` are the
/// caller's original lines, not the aggregated demand. The message id and
/// timestamp are fixed at construction and travel as message metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    #[serde(skip, default = "MessageId::new")]
    message_id: MessageId,
    #[serde(skip, default = "Utc::now")]
    occurred_at: DateTime<Utc>,

    pub order_id: OrderId,
    pub status: OutcomeStatus,
    pub items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl OutcomeEvent {
    /// Build the event for a decided business outcome.
    pub fn from_outcome(order_id: OrderId, items: Vec<LineItem>, outcome: &ReservationOutcome) -> Self {
        let (status, reason) = match outcome {
            ReservationOutcome::Updated { .. } | ReservationOutcome::NoOp => (OutcomeStatus::Updated, None),
            ReservationOutcome::OutOfStock(_) => (OutcomeStatus::Failed, Some(FailureReason::OutOfStock)),
        };

        Self {
            message_id: MessageId::new(),
            occurred_at: Utc::now(),
            order_id,
            status,
            items,
            reason,
        }
    }
}

impl Event for OutcomeEvent {
    fn event_type(&self) -> &'static str {
        self.status.as_str()
    }

    fn message_id(&self) -> MessageId {
        self.message_id
    }

    fn correlation_id(&self) -> &str {
        self.order_id.as_str()
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
