//! Canned payloads shaped like the bundled connectors' documents.

use serde_json::json;
use strata_core::Value;

/// A customer-profile document as the CRM connector stores it.
pub fn profile_doc(id: &str, name: &str, segment: &str) -> Value {
    Value::document(json!({
        "id": id,
        "name": name,
        "segment": segment,
        "email": format!("{id}@example.test"),
        "marketing_opt_in": false,
        "tags": [],
    }))
}

/// An inventory-snapshot document as the inventory connector stores it.
pub fn inventory_doc(sku: &str, available: i64) -> Value {
    Value::document(json!({
        "sku": sku,
        "available": available,
        "reserved": 0,
        "warehouses": [{"warehouse_id": "nyc-1", "available": available, "reserved": 0}],
    }))
}
