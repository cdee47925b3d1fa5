//! Inventory-snapshot record.

use serde::{Deserialize, Serialize};

use crate::DomainRecord;

const MAX_WAREHOUSES: usize = 256;

/// Per-warehouse stock counts inside an [`InventorySnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub warehouse_id: String,
    pub available: i64,
    #[serde(default)]
    pub reserved: i64,
}

/// Point-in-time inventory state for one SKU across warehouses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub sku: String,
    pub available: i64,
    #[serde(default)]
    pub reserved: i64,
    #[serde(default)]
    pub safety_stock: Option<i64>,
    #[serde(default)]
    pub lead_time_days: Option<u32>,
    /// Fulfillment status (e.g. "in_stock", "backorder").
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub warehouses: Vec<WarehouseStock>,
}

impl InventorySnapshot {
    /// Units sellable right now.
    pub fn sellable(&self) -> i64 {
        (self.available - self.reserved).max(0)
    }
}

impl DomainRecord for InventorySnapshot {
    const KIND: &'static str = "inventory";

    fn id(&self) -> &str {
        &self.sku
    }

    fn validate(&self) -> Result<(), String> {
        if self.sku.trim().is_empty() {
            return Err("sku must not be empty".to_owned());
        }
        if self.available < 0 {
            return Err(format!("available count {} is negative", self.available));
        }
        if self.reserved < 0 {
            return Err(format!("reserved count {} is negative", self.reserved));
        }
        if self.warehouses.len() > MAX_WAREHOUSES {
            return Err(format!("more than {MAX_WAREHOUSES} warehouses"));
        }
        for stock in &self.warehouses {
            if stock.warehouse_id.trim().is_empty() {
                return Err("warehouse_id must not be empty".to_owned());
            }
            if stock.available < 0 || stock.reserved < 0 {
                return Err(format!(
                    "warehouse {} has negative counts",
                    stock.warehouse_id
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(sku: &str, available: i64) -> InventorySnapshot {
        InventorySnapshot {
            sku: sku.to_owned(),
            available,
            reserved: 0,
            safety_stock: None,
            lead_time_days: None,
            status: None,
            warehouses: Vec::new(),
        }
    }

    #[test]
    fn counts_must_be_non_negative() {
        assert_eq!(snapshot("SKU-1", 10).validate(), Ok(()));
        assert!(snapshot("SKU-1", -1).validate().is_err());

        let mut s = snapshot("SKU-1", 10);
        s.reserved = -2;
        assert!(s.validate().is_err());
    }

    #[test]
    fn warehouse_entries_are_validated_too() {
        let mut s = snapshot("SKU-1", 10);
        s.warehouses.push(WarehouseStock {
            warehouse_id: String::new(),
            available: 5,
            reserved: 0,
        });
        assert!(s.validate().is_err());
    }

    #[test]
    fn sellable_never_goes_negative() {
        let mut s = snapshot("SKU-1", 3);
        s.reserved = 5;
        assert_eq!(s.sellable(), 0);
        s.reserved = 1;
        assert_eq!(s.sellable(), 2);
    }

    #[test]
    fn stored_documents_with_only_required_fields_parse() {
        let s: InventorySnapshot =
            serde_json::from_value(serde_json::json!({"sku": "SKU-1", "available": 4})).unwrap();
        assert_eq!(s.reserved, 0);
        assert!(s.warehouses.is_empty());
    }
}
