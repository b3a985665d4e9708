//! Requested line items and their per-SKU aggregation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// One requested line of an order.
///
/// `quantity` travels as `qty` on the wire. Any other fields the caller sent
/// are kept in `extra` so the outcome event can echo the line verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    #[serde(rename = "qty", alias = "quantity")]
    pub quantity: i64,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl LineItem {
    pub fn new(sku: impl Into<String>, quantity: i64) -> Self {
        Self {
            sku: sku.into(),
            quantity,
            extra: Map::new(),
        }
    }
}

/// Deduplicated per-SKU demand for a single reservation attempt.
///
/// Invariant: every quantity is strictly positive. The only way to build one
/// is [`aggregate`], which enforces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedDemand {
    quantities: BTreeMap<String, i64>,
}

impl AggregatedDemand {
    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    /// Number of unique SKUs.
    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn get(&self, sku: &str) -> Option<i64> {
        self.quantities.get(sku).copied()
    }

    /// `(sku, quantity)` pairs in SKU order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> + '_ {
        self.quantities.iter().map(|(sku, qty)| (sku.as_str(), *qty))
    }

    pub fn total_units(&self) -> i64 {
        self.quantities.values().fold(0i64, |acc, q| acc.saturating_add(*q))
    }
}

/// Aggregate requested line items into per-SKU demand.
///
/// - items with `quantity <= 0` are dropped silently
/// - repeated SKUs are summed (saturating, so absurd totals simply fail the
///   stock check instead of wrapping)
pub fn aggregate<'a, I>(items: I) -> AggregatedDemand
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut quantities: BTreeMap<String, i64> = BTreeMap::new();
    for item in items {
        if item.quantity <= 0 {
            continue;
        }
        let entry = quantities.entry(item.sku.clone()).or_insert(0);
        *entry = entry.saturating_add(item.quantity);
    }
    AggregatedDemand { quantities }
}
