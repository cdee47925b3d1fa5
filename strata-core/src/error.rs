//! Error types for Strata operations

use crate::Tier;
use std::time::Duration;
use thiserror::Error;

/// Classification of a backing-store-reported failure.
///
/// The envelope retries `Transient` failures; `Schema` and `Permission`
/// failures are caller bugs and surface immediately, and the gateway will
/// not mask them by falling through to slower tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    /// Network flap, connection reset, 5xx-class store failure.
    Transient,
    /// Malformed key or payload rejected by the store.
    Schema,
    /// Authentication/authorization rejection.
    Permission,
}

impl UpstreamKind {
    /// Stable label used in telemetry and log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Schema => "schema",
            Self::Permission => "permission",
        }
    }
}

/// Adapter-level errors, as surfaced to the gateway.
///
/// This is the complete failure vocabulary of a single tier access after the
/// resilience envelope has had its say: retries are already exhausted by the
/// time one of these reaches the gateway.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    /// Explicit absence signal. Used by `query`/`list`, never by a `fetch`
    /// miss (which is a successful `None`).
    #[error("Not found: {key}")]
    NotFound { key: String },

    /// The per-attempt deadline elapsed.
    #[error("Operation timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// The backing store reported throttling.
    #[error("Rate limited by backing store")]
    RateLimited,

    /// The adapter's circuit breaker is open; no attempt reached the store.
    #[error("Circuit open, retry after {retry_after:?}")]
    CircuitOpen { retry_after: Duration },

    /// Backing-store-reported failure.
    #[error("Upstream failure ({}): {message}", kind.label())]
    Upstream { kind: UpstreamKind, message: String },
}

impl AdapterError {
    /// Shorthand for a transient upstream failure.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Upstream {
            kind: UpstreamKind::Transient,
            message: message.into(),
        }
    }

    /// Shorthand for a schema-level upstream rejection.
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Upstream {
            kind: UpstreamKind::Schema,
            message: message.into(),
        }
    }

    /// Whether the envelope may retry after this failure.
    ///
    /// Timeouts, throttling, and transient upstream failures are retryable;
    /// schema/permission rejections never are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::RateLimited => true,
            Self::Upstream { kind, .. } => *kind == UpstreamKind::Transient,
            Self::NotFound { .. } | Self::CircuitOpen { .. } => false,
        }
    }

    /// Whether the gateway may treat this as "tier currently unavailable"
    /// and fall through to a slower tier during a read cascade.
    ///
    /// Everything qualifies except non-transient upstream rejections, which
    /// indicate a caller bug that cascading must not mask.
    pub fn is_unavailability(&self) -> bool {
        !matches!(
            self,
            Self::Upstream {
                kind: UpstreamKind::Schema | UpstreamKind::Permission,
                ..
            }
        )
    }

    /// Stable kind label for telemetry `error_kind` fields.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::RateLimited => "rate_limited",
            Self::CircuitOpen { .. } => "circuit_open",
            Self::Upstream { kind, .. } => kind.label(),
        }
    }
}

/// Gateway-level errors, as surfaced to the application.
///
/// Callers see a value, an explicit miss (`None`), or one of these; raw
/// backing-store error types never cross the gateway boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// A targeted tier failed, or a tier reported a non-retryable caller
    /// error that must not be masked by fallthrough.
    #[error("{tier} tier failed: {source}")]
    Tier {
        tier: Tier,
        #[source]
        source: AdapterError,
    },

    /// Every tier errored during a read cascade (no clean miss observed).
    #[error("All tiers unavailable for key {key}")]
    Unavailable { key: String },

    /// The caller-supplied overall deadline expired mid-cascade.
    #[error("Overall deadline exceeded before the {tier} tier completed")]
    DeadlineExceeded { tier: Tier },
}

/// Connector-level errors.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A stored payload could not be mapped to the domain shape.
    ///
    /// Distinct from availability: a malformed record found in cold storage
    /// is a data-quality problem, not a miss, and must never be promoted.
    #[error("Malformed {kind} payload at {key}: {reason}")]
    Malformed {
        kind: &'static str,
        key: String,
        reason: String,
    },

    /// A domain record failed its static validation rules.
    #[error("Invalid {kind}: {reason}")]
    Validation { kind: &'static str, reason: String },

    /// The underlying gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
