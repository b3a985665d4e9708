use std::sync::Arc;

use crate::demand::AggregatedDemand;
use crate::outcome::{ReservationOutcome, StoreError};

/// Stock backend boundary.
///
/// ## `apply` contract
///
/// - empty demand → `NoOp`, no mutation
/// - otherwise **all-or-nothing**: every SKU is decremented by its quantity, or
///   none is
/// - any short SKU → `OutOfStock` naming at least one offender
/// - transport/auth failures → `Err(StoreError::Unavailable)`
///
/// Implementations are shared by concurrent callers and must keep the
/// all-or-nothing guarantee under overlapping calls.
pub trait InventoryStore: Send + Sync {
    /// Stable backend identifier reported by health checks.
    fn backend(&self) -> &'static str;

    fn ping(&self) -> Result<(), StoreError>;

    fn apply(&self, demand: &AggregatedDemand) -> Result<ReservationOutcome, StoreError>;

    /// Release held connections. Best effort; never fails.
    fn close(&self);
}

impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    fn ping(&self) -> Result<(), StoreError> {
        (**self).ping()
    }

    fn apply(&self, demand: &AggregatedDemand) -> Result<ReservationOutcome, StoreError> {
        (**self).apply(demand)
    }

    fn close(&self) {
        (**self).close()
    }
}
