//! Reservation pipeline (application-level orchestration).
//!
//! ```text
//! reserve(order_id, items)
//!   ↓
//! 1. Validate (order id present, items non-empty)
//!   ↓
//! 2. Aggregate demand (drop non-positive, sum duplicates); empty → validation
//!   ↓
//! 3. store.apply(demand)   (all-or-nothing)
//!   ↓
//! 4. Classify: Updated/NoOp → inventory.updated
//!              OutOfStock   → inventory.failed (reason out_of_stock)
//!              StoreError   → infrastructure error, nothing published
//!   ↓
//! 5. Publish the event (policy decided by the publisher)
//! ```
//!
//! This module contains no IO itself; it composes the store and publisher
//! traits. One call is one synchronous, blocking chain.

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use stockline_core::{DomainError, OrderId};
use stockline_events::{Delivery, EventPublisher};
use stockline_inventory::{aggregate, InventoryStore, LineItem, OutcomeEvent, ReservationOutcome, StoreError};

#[derive(Debug, Error)]
pub enum ReservationError {
    /// Caller input was unusable (client error).
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// The store failed or rejected the batch (service error).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A strict publisher could not deliver the outcome event (service error).
    /// Stock was already decided when this happens.
    #[error("outcome event publish failed: {0}")]
    Publish(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ReservationError {
    /// `true` when the caller sent bad input; everything else is a service failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ReservationError::Validation(_))
    }
}

/// Health of the configured store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Reservation engine.
///
/// Constructed once at startup and shared by every request. Owns its store
/// and publisher; no process-wide state.
///
/// ## Generic Parameters
///
/// - `S`: inventory store (`InventoryStore`)
/// - `P`: outcome publisher (`EventPublisher<OutcomeEvent>`)
#[derive(Debug)]
pub struct ReservationEngine<S, P> {
    store: S,
    publisher: P,
}

impl<S, P> ReservationEngine<S, P>
where
    S: InventoryStore,
    P: EventPublisher<OutcomeEvent>,
{
    pub fn new(store: S, publisher: P) -> Self {
        Self { store, publisher }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Reserve stock for an order and publish the decided outcome.
    ///
    /// Returns the event describing the business outcome (`inventory.updated`
    /// or `inventory.failed`). Out-of-stock is a normal return, not an error.
    #[instrument(skip(self, items), fields(order_id = %order_id, lines = items.len()))]
    pub fn reserve(&self, order_id: &str, items: Vec<LineItem>) -> Result<OutcomeEvent, ReservationError> {
        let order_id = OrderId::parse(order_id)?;
        if items.is_empty() {
            return Err(DomainError::validation("items required").into());
        }

        let demand = aggregate(&items);
        if demand.is_empty() {
            return Err(DomainError::validation("items required").into());
        }

        let outcome = match self.store.apply(&demand) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    backend = self.store.backend(),
                    error = %e,
                    "inventory store failure for order {order_id}"
                );
                return Err(e.into());
            }
        };

        match &outcome {
            ReservationOutcome::Updated { consumed_capacity } => info!(
                skus = demand.len(),
                units = demand.total_units(),
                consumed_capacity = ?consumed_capacity,
                "reserved stock for {order_id}"
            ),
            ReservationOutcome::NoOp => info!("nothing to reserve for {order_id}"),
            ReservationOutcome::OutOfStock(shortfall) => {
                warn!("out of stock processing order {order_id}: {shortfall}")
            }
        }

        let event = OutcomeEvent::from_outcome(order_id, items, &outcome);

        match self.publisher.publish(&event) {
            Ok(Delivery::Dropped) => warn!("outcome event for {} was not delivered", event.order_id),
            Ok(_) => {}
            Err(e) => return Err(ReservationError::Publish(Box::new(e))),
        }

        Ok(event)
    }

    /// Ping the store.
    pub fn health(&self) -> HealthReport {
        let backend = self.store.backend();
        match self.store.ping() {
            Ok(()) => HealthReport {
                ok: true,
                backend,
                error: None,
            },
            Err(e) => {
                error!(backend, error = %e, "health check failed");
                HealthReport {
                    ok: false,
                    backend,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Release the store's connections (best effort).
    pub fn shutdown(&self) {
        self.store.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use stockline_events::{Event, InMemorySink};
    use stockline_inventory::{FailureReason, OutcomeStatus};

    use crate::publisher::{OutcomePublisher, PublishError, RetryPolicy};
    use crate::stock_store::InMemoryInventoryStore;

    const DEST: &str = "inventory.updated";

    /// Store that is always down.
    struct DownStore;

    impl InventoryStore for DownStore {
        fn backend(&self) -> &'static str {
            "down"
        }
        fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::unavailable("connection refused"))
        }
        fn apply(&self, _demand: &stockline_inventory::AggregatedDemand) -> Result<ReservationOutcome, StoreError> {
            Err(StoreError::unavailable("connection refused"))
        }
        fn close(&self) {}
    }

    fn publisher(sink: &InMemorySink, strict: bool) -> OutcomePublisher {
        OutcomePublisher::new(Arc::new(sink.clone()), strict, DEST)
            .with_retry_policy(RetryPolicy::new(5, Duration::ZERO))
    }

    fn items(lines: &[(&str, i64)]) -> Vec<LineItem> {
        lines.iter().map(|(s, q)| LineItem::new(*s, *q)).collect()
    }

    #[test]
    fn duplicate_lines_are_reserved_as_one_demand_and_echoed_per_line() {
        let store = Arc::new(InMemoryInventoryStore::with_stock([("X", 10)]));
        let sink = InMemorySink::new();
        let engine = ReservationEngine::new(store.clone(), publisher(&sink, false));

        let event = engine.reserve("O1", items(&[("X", 2), ("X", 1)])).unwrap();

        assert_eq!(event.status, OutcomeStatus::Updated);
        assert_eq!(event.reason, None);
        assert_eq!(store.available("X"), 7);

        let published = sink.published_to(DEST);
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].json_body().unwrap(),
            serde_json::json!({
                "order_id": "O1",
                "status": "inventory.updated",
                "items": [{"sku": "X", "qty": 2}, {"sku": "X", "qty": 1}],
            })
        );
        assert_eq!(published[0].message_id, event.message_id());
    }

    #[test]
    fn out_of_stock_is_a_business_outcome() {
        let store = Arc::new(InMemoryInventoryStore::with_stock([("A", 5), ("B", 5)]));
        let sink = InMemorySink::new();
        let engine = ReservationEngine::new(store.clone(), publisher(&sink, true));

        let event = engine.reserve("O2", items(&[("A", 3), ("B", 10)])).unwrap();

        assert_eq!(event.status, OutcomeStatus::Failed);
        assert_eq!(event.reason, Some(FailureReason::OutOfStock));
        assert_eq!(store.snapshot().get("A"), Some(&5));
        assert_eq!(sink.published_to(DEST)[0].json_body().unwrap()["reason"], "out_of_stock");
    }

    #[test]
    fn empty_or_degenerate_items_are_validation_errors() {
        let store = Arc::new(InMemoryInventoryStore::with_stock([("A", 5)]));
        let sink = InMemorySink::new();
        let engine = ReservationEngine::new(store, publisher(&sink, true));

        let err = engine.reserve("O3", vec![]).unwrap_err();
        assert!(err.is_client_error());

        let err = engine.reserve("O3", items(&[("A", 0), ("B", -1)])).unwrap_err();
        assert!(matches!(err, ReservationError::Validation(DomainError::Validation(ref m)) if m == "items required"));

        let err = engine.reserve(" ", items(&[("A", 1)])).unwrap_err();
        assert!(err.is_client_error());

        assert_eq!(sink.connect_attempts(), 0);
    }

    #[test]
    fn store_failure_is_a_service_error_and_publishes_nothing() {
        let sink = InMemorySink::new();
        let engine = ReservationEngine::new(DownStore, publisher(&sink, true));

        let err = engine.reserve("O4", items(&[("A", 1)])).unwrap_err();

        assert!(matches!(err, ReservationError::Store(StoreError::Unavailable { .. })));
        assert!(!err.is_client_error());
        assert_eq!(sink.connect_attempts(), 0);
    }

    #[test]
    fn lenient_publish_failure_keeps_the_outcome() {
        let store = Arc::new(InMemoryInventoryStore::with_stock([("A", 5)]));
        let sink = InMemorySink::unreachable();
        let engine = ReservationEngine::new(store.clone(), publisher(&sink, false));

        let event = engine.reserve("O5", items(&[("A", 1)])).unwrap();

        assert_eq!(event.status, OutcomeStatus::Updated);
        assert_eq!(store.available("A"), 4);
        assert_eq!(sink.connect_attempts(), 5);
    }

    #[test]
    fn strict_publish_failure_is_a_service_error_after_stock_moved() {
        let store = Arc::new(InMemoryInventoryStore::with_stock([("A", 5)]));
        let sink = InMemorySink::unreachable();
        let engine = ReservationEngine::new(store.clone(), publisher(&sink, true));

        let err = engine.reserve("O6", items(&[("A", 1)])).unwrap_err();

        assert!(matches!(err, ReservationError::Publish(_)));
        assert!(!err.is_client_error());
        // No compensation: the store already committed.
        assert_eq!(store.available("A"), 4);

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<PublishError>().is_some());
    }

    #[test]
    fn disabled_publisher_never_connects() {
        let store = Arc::new(InMemoryInventoryStore::with_stock([("A", 5)]));
        let engine = ReservationEngine::new(store, OutcomePublisher::disabled());
        assert!(engine.reserve("O7", items(&[("A", 1)])).is_ok());
    }

    #[test]
    fn health_reflects_store_ping() {
        let engine = ReservationEngine::new(Arc::new(InMemoryInventoryStore::new()), OutcomePublisher::disabled());
        assert_eq!(
            engine.health(),
            HealthReport {
                ok: true,
                backend: "memory",
                error: None
            }
        );

        let engine = ReservationEngine::new(DownStore, OutcomePublisher::disabled());
        let report = engine.health();
        assert!(!report.ok);
        assert_eq!(report.backend, "down");
        assert!(report.error.is_some());
    }
}
