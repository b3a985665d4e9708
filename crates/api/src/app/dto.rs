use serde::{Deserialize, Serialize};

use stockline_inventory::LineItem;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ApplyInventoryRequest {
    /// Blank/missing ids are rejected by the engine, not the extractor.
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ApplyInventoryResponse {
    pub order_id: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub backend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}
