//! Inventory reservation domain.
//!
//! This crate contains the business vocabulary for reserving stock: demand
//! aggregation, reservation outcomes, the outcome event, and the store
//! boundary. Everything here is deterministic (no IO, no HTTP, no storage).

pub mod demand;
pub mod event;
pub mod outcome;
pub mod store;

pub use demand::{aggregate, AggregatedDemand, LineItem};
pub use event::{FailureReason, OutcomeEvent, OutcomeStatus};
pub use outcome::{ConsumedCapacity, ReservationOutcome, Shortfall, StoreError};
pub use store::InventoryStore;
