use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use tracing::instrument;

use stockline_inventory::{AggregatedDemand, InventoryStore, ReservationOutcome, Shortfall, StoreError};

/// In-memory reference inventory store.
///
/// Intended for tests/dev. Unseen SKUs have zero stock.
///
/// `apply` runs check-then-decrement inside one critical section, so
/// overlapping reservations are serialized and can never oversubscribe a SKU.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    stock: Mutex<HashMap<String, i64>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock<I, S>(levels: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let stock = levels.into_iter().map(|(sku, qty)| (sku.into(), qty)).collect();
        Self {
            stock: Mutex::new(stock),
        }
    }

    /// Add stock for a SKU (negative values are ignored).
    pub fn restock(&self, sku: impl Into<String>, quantity: i64) {
        if quantity <= 0 {
            return;
        }
        let mut stock = self.lock();
        let entry = stock.entry(sku.into()).or_insert(0);
        *entry = entry.saturating_add(quantity);
    }

    pub fn available(&self, sku: &str) -> i64 {
        self.lock().get(sku).copied().unwrap_or(0)
    }

    /// Current stock levels in SKU order.
    pub fn snapshot(&self) -> BTreeMap<String, i64> {
        self.lock().iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        // Mutations below only happen after every check passed, so a poisoned
        // map is still consistent.
        self.stock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl InventoryStore for InMemoryInventoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    #[instrument(skip(self, demand), fields(backend = "memory", skus = demand.len()))]
    fn apply(&self, demand: &AggregatedDemand) -> Result<ReservationOutcome, StoreError> {
        if demand.is_empty() {
            return Ok(ReservationOutcome::NoOp);
        }

        let mut stock = self.lock();

        // Pass 1: verify every SKU before touching anything.
        for (sku, qty) in demand.iter() {
            let available = stock.get(sku).copied().unwrap_or(0);
            if available < qty {
                return Ok(ReservationOutcome::OutOfStock(Shortfall::for_sku(sku, qty, available)));
            }
        }

        // Pass 2: decrement all.
        for (sku, qty) in demand.iter() {
            *stock.entry(sku.to_string()).or_insert(0) -= qty;
        }

        Ok(ReservationOutcome::updated())
    }

    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use stockline_inventory::{aggregate, LineItem};

    fn demand(lines: &[(&str, i64)]) -> AggregatedDemand {
        let items: Vec<LineItem> = lines.iter().map(|(s, q)| LineItem::new(*s, *q)).collect();
        aggregate(&items)
    }

    #[test]
    fn successful_apply_decrements_stock() {
        let store = InMemoryInventoryStore::with_stock([("A", 5)]);
        let outcome = store.apply(&demand(&[("A", 3)])).unwrap();

        assert_eq!(outcome, ReservationOutcome::updated());
        assert_eq!(store.available("A"), 2);
    }

    #[test]
    fn apply_is_all_or_nothing() {
        let store = InMemoryInventoryStore::with_stock([("A", 5), ("B", 5)]);
        let outcome = store.apply(&demand(&[("A", 3), ("B", 10)])).unwrap();

        assert_eq!(
            outcome,
            ReservationOutcome::OutOfStock(Shortfall::for_sku("B", 10, 5))
        );
        assert_eq!(store.available("A"), 5);
        assert_eq!(store.available("B"), 5);
    }

    #[test]
    fn unseen_sku_has_zero_stock() {
        let store = InMemoryInventoryStore::new();
        let outcome = store.apply(&demand(&[("ghost", 1)])).unwrap();
        assert!(matches!(outcome, ReservationOutcome::OutOfStock(ref s) if s.sku.as_deref() == Some("ghost")));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn empty_demand_is_noop() {
        let store = InMemoryInventoryStore::with_stock([("A", 1)]);
        assert_eq!(store.apply(&demand(&[])).unwrap(), ReservationOutcome::NoOp);
        assert_eq!(store.available("A"), 1);
    }

    #[test]
    fn exact_stock_can_be_fully_reserved() {
        let store = InMemoryInventoryStore::with_stock([("A", 3)]);
        assert!(store.apply(&demand(&[("A", 3)])).unwrap().is_reserved());
        assert_eq!(store.available("A"), 0);
    }

    #[test]
    fn restock_ignores_non_positive_quantities() {
        let store = InMemoryInventoryStore::new();
        store.restock("A", 4);
        store.restock("A", -2);
        store.restock("A", 0);
        assert_eq!(store.available("A"), 4);
        assert!(store.ping().is_ok());
        assert_eq!(store.backend(), "memory");
    }

    #[test]
    fn concurrent_reservations_never_oversubscribe() {
        let store = Arc::new(InMemoryInventoryStore::with_stock([("A", 50), ("B", 50)]));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let mut reserved = 0;
                    for _ in 0..10 {
                        if store.apply(&demand(&[("A", 1), ("B", 1)])).unwrap().is_reserved() {
                            reserved += 1;
                        }
                    }
                    reserved
                })
            })
            .collect();

        let total: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(total, 50);
        assert_eq!(store.available("A"), 0);
        assert_eq!(store.available("B"), 0);
    }
}
