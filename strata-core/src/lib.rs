//! STRATA Core - Shared Types for the Tiered Gateway
//!
//! Defines the vocabulary every Strata crate speaks: keys, values, tiers,
//! the error taxonomy, per-adapter resilience configuration, and the
//! telemetry record emitted by envelope-guarded calls.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod value;

pub use config::ResilienceConfig;
pub use error::{AdapterError, ConnectorError, GatewayError, UpstreamKind};
pub use telemetry::{CallRecord, NullSink, Outcome, TelemetrySink, TracingSink};
pub use value::{Key, QueryFilter, Value};

use serde::{Deserialize, Serialize};

// ============================================================================
// TIERS
// ============================================================================

/// A latency/capacity class of backing store.
///
/// Tiers are totally ordered by increasing latency and capacity and by
/// decreasing eviction aggressiveness: `Hot < Warm < Cold`. The same key is
/// reused across all tiers so a value found in a slower tier can be promoted
/// into faster ones without translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Sub-50ms key-value cache. TTL is an eviction deadline.
    Hot,
    /// ~100-500ms structured document store. TTL is a soft-delete deadline.
    Warm,
    /// Multi-second archival store. TTL is ignored.
    Cold,
}

impl Tier {
    /// All tiers in cascade order, fastest first.
    pub const ALL: [Tier; 3] = [Tier::Hot, Tier::Warm, Tier::Cold];

    /// Stable lowercase name, used in telemetry and log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Warm => "warm",
            Tier::Cold => "cold",
        }
    }

    /// Tiers strictly faster than this one, fastest first.
    ///
    /// This is the fan-out set for write-through and for promotion after a
    /// read served from this tier.
    pub fn faster_tiers(&self) -> &'static [Tier] {
        match self {
            Tier::Hot => &[],
            Tier::Warm => &[Tier::Hot],
            Tier::Cold => &[Tier::Hot, Tier::Warm],
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
