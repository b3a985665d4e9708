//! Reservation outcomes and store failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend-reported resource usage of a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumedCapacity {
    pub table: String,
    pub write_units: f64,
}

/// Which SKU could not be satisfied, as far as the backend can tell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    /// Offending SKU, when the backend identifies one.
    pub sku: Option<String>,
    pub requested: Option<i64>,
    pub available: Option<i64>,
}

impl Shortfall {
    pub fn for_sku(sku: impl Into<String>, requested: i64, available: i64) -> Self {
        Self {
            sku: Some(sku.into()),
            requested: Some(requested),
            available: Some(available),
        }
    }
}

impl core::fmt::Display for Shortfall {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match (&self.sku, self.requested, self.available) {
            (Some(sku), Some(req), Some(avail)) => {
                write!(f, "insufficient stock for {sku} (requested {req}, available {avail})")
            }
            (Some(sku), _, _) => write!(f, "insufficient stock for {sku}"),
            _ => f.write_str("requested quantity exceeds available stock"),
        }
    }
}

/// Business result of applying demand to a store.
///
/// `OutOfStock` is an expected outcome, not a failure of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum ReservationOutcome {
    /// Every SKU was decremented.
    Updated { consumed_capacity: Option<ConsumedCapacity> },
    /// Nothing to do (empty demand); no mutation.
    NoOp,
    /// At least one SKU was short; nothing was decremented.
    OutOfStock(Shortfall),
}

impl ReservationOutcome {
    pub fn updated() -> Self {
        Self::Updated { consumed_capacity: None }
    }

    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Updated { .. } | Self::NoOp)
    }
}

/// Infrastructure failure while applying demand.
///
/// Callers must never confuse these with [`ReservationOutcome::OutOfStock`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Transport, auth, throttling or otherwise unexpected backend failure.
    #[error("inventory store unavailable: {reason}")]
    Unavailable { reason: String },

    /// The demand has more unique SKUs than one atomic backend write allows.
    #[error("batch limit exceeded: {requested} unique SKUs (max {limit} per order)")]
    CapacityExceeded { requested: usize, limit: usize },
}

impl StoreError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }
}
