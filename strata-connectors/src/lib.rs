//! STRATA Connectors - Typed Domain Access
//!
//! A [`Connector`] pairs the tiered gateway with one domain record type:
//! it derives namespaced keys, serializes records into warm-queryable
//! documents, and maps stored payloads back into the domain shape. Mapping
//! failures are [`ConnectorError::Malformed`], never conflated with tier
//! availability: a corrupt record found in cold storage is a data-quality
//! problem, not a miss.
//!
//! Bundled shapes: [`CustomerProfile`] and [`InventorySnapshot`].

pub mod crm;
pub mod inventory;

pub use crm::CustomerProfile;
pub use inventory::{InventorySnapshot, WarehouseStock};

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use strata_core::{ConnectorError, Key, QueryFilter, Tier, Value};
use strata_gateway::TieredGateway;

// ============================================================================
// DOMAIN RECORD CONTRACT
// ============================================================================

/// A domain shape storable through a connector.
///
/// `KIND` namespaces keys as `"<KIND>:<id>"`, keeping every record type's
/// keyspace disjoint across all tiers. `validate` holds the static rules a
/// record must satisfy before it is written and after it is read back.
pub trait DomainRecord: Serialize + DeserializeOwned + Send + Sync {
    /// Key namespace for this record type.
    const KIND: &'static str;

    /// The record's identifier within its namespace.
    fn id(&self) -> &str;

    /// Static validation rules; `Err` carries the reason.
    fn validate(&self) -> Result<(), String>;
}

// ============================================================================
// CONNECTOR
// ============================================================================

/// Typed access to one record kind through the gateway.
///
/// Reads cascade through all tiers as usual; writes land in the connector's
/// home tier (warm by default, where documents are queryable), optionally
/// written through to faster tiers.
pub struct Connector<T: DomainRecord> {
    gateway: TieredGateway,
    home_tier: Tier,
    ttl: Option<Duration>,
    write_through: bool,
    _record: PhantomData<fn() -> T>,
}

impl<T: DomainRecord> Connector<T> {
    /// Connector writing to the warm tier with no TTL.
    pub fn new(gateway: TieredGateway) -> Self {
        Self {
            gateway,
            home_tier: Tier::Warm,
            ttl: None,
            write_through: false,
            _record: PhantomData,
        }
    }

    /// Change the tier writes land in.
    pub fn with_home_tier(mut self, tier: Tier) -> Self {
        self.home_tier = tier;
        self
    }

    /// Apply a TTL to every write.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Replicate writes into tiers faster than the home tier, best-effort.
    pub fn with_write_through(mut self) -> Self {
        self.write_through = true;
        self
    }

    /// The namespaced key for an identifier.
    pub fn key_for(id: &str) -> Key {
        Key::new(format!("{}:{id}", T::KIND))
    }

    /// Read and map one record. `Ok(None)` is a clean miss.
    ///
    /// The gateway's promotion is gated on the payload mapping, so a
    /// malformed record surfaces as `Malformed` without being copied into
    /// faster tiers.
    pub async fn get_typed(&self, id: &str) -> Result<Option<T>, ConnectorError> {
        let key = Self::key_for(id);
        let found = self
            .gateway
            .get_gated(&key, |value| map_record::<T>(&key, value).is_ok())
            .await?;
        match found {
            Some(value) => Ok(Some(map_record::<T>(&key, &value)?)),
            None => Ok(None),
        }
    }

    /// Validate and write one record to the home tier.
    pub async fn put_typed(&self, record: &T) -> Result<(), ConnectorError> {
        record.validate().map_err(|reason| ConnectorError::Validation {
            kind: T::KIND,
            reason,
        })?;
        let key = Self::key_for(record.id());
        let doc = serde_json::to_value(record).map_err(|e| ConnectorError::Malformed {
            kind: T::KIND,
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.gateway
            .set(
                &key,
                &Value::document(doc),
                self.home_tier,
                self.ttl,
                self.write_through,
            )
            .await?;
        Ok(())
    }

    /// Delete one record from every tier.
    pub async fn delete_typed(&self, id: &str) -> Result<bool, ConnectorError> {
        Ok(self.gateway.delete(&Self::key_for(id)).await?)
    }

    /// Query the warm tier by field equality and map every match.
    ///
    /// A single malformed stored document fails the whole query; partial
    /// silently-shortened result sets would be worse than an error.
    pub async fn find_where(&self, filter: &QueryFilter) -> Result<Vec<T>, ConnectorError> {
        let matches = self.gateway.query_warm(filter).await?;
        let mut records = Vec::with_capacity(matches.len());
        for value in &matches {
            let record = map_record::<T>(&Key::new(format!("{}:?", T::KIND)), value)?;
            records.push(record);
        }
        Ok(records)
    }
}

/// Map a stored payload into the domain shape, revalidating it.
///
/// Any failure here is data quality (`Malformed`), even when the same rule
/// would be a `Validation` error on the write path: the record is already
/// in a store, so the caller did nothing wrong.
fn map_record<T: DomainRecord>(key: &Key, value: &Value) -> Result<T, ConnectorError> {
    let malformed = |reason: String| ConnectorError::Malformed {
        kind: T::KIND,
        key: key.to_string(),
        reason,
    };
    let doc = value
        .as_document()
        .ok_or_else(|| malformed("payload is not a document".to_owned()))?;
    let record: T = serde_json::from_value(doc.clone()).map_err(|e| malformed(e.to_string()))?;
    record.validate().map_err(malformed)?;
    Ok(record)
}
