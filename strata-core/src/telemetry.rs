//! Observability hook for envelope-guarded calls.
//!
//! Every tier access emits exactly one [`CallRecord`] to an injected
//! [`TelemetrySink`]. The sink is fire-and-forget: it must never block or
//! fail the call it describes, so implementations do their own buffering
//! and swallow their own errors.

use crate::Tier;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result class of an envelope-guarded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A fetch that returned a value (or a successful mutation).
    Hit,
    /// A fetch that returned no value.
    Miss,
    /// The call failed after the envelope exhausted its options.
    Error,
}

impl Outcome {
    /// Stable label for log/metric fields.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Error => "error",
        }
    }
}

/// Structured record of one envelope-guarded call.
#[derive(Debug, Clone)]
pub struct CallRecord {
    /// Which tier the call targeted.
    pub tier: Tier,
    /// Operation name (`connect`, `fetch`, `upsert`, `delete`, `query`, `list`).
    pub operation: &'static str,
    /// Result class.
    pub outcome: Outcome,
    /// Wall time spent inside the envelope, retries included.
    pub duration: Duration,
    /// Error kind label, present only for `Outcome::Error`.
    pub error_kind: Option<&'static str>,
    /// When the call completed.
    pub at: DateTime<Utc>,
}

/// Injected logger/metrics sink.
///
/// The only coupling between Strata and the observability collaborator.
pub trait TelemetrySink: Send + Sync {
    /// Record one completed call. Must not block or panic.
    fn record(&self, record: &CallRecord);
}

/// Default sink forwarding records to `tracing`.
///
/// Errors go to `warn!`, everything else to `debug!`, so steady-state
/// traffic stays out of production logs at default filter levels.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&self, record: &CallRecord) {
        match record.outcome {
            Outcome::Error => tracing::warn!(
                tier = record.tier.name(),
                operation = record.operation,
                outcome = record.outcome.label(),
                duration_ms = record.duration.as_millis() as u64,
                error_kind = record.error_kind,
                "tier call failed"
            ),
            _ => tracing::debug!(
                tier = record.tier.name(),
                operation = record.operation,
                outcome = record.outcome.label(),
                duration_ms = record.duration.as_millis() as u64,
                "tier call"
            ),
        }
    }
}

/// Sink that drops every record. Useful in benchmarks and tests that do not
/// assert on telemetry.
#[derive(Debug, Default, Clone)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn record(&self, _record: &CallRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_labels() {
        assert_eq!(Outcome::Hit.label(), "hit");
        assert_eq!(Outcome::Miss.label(), "miss");
        assert_eq!(Outcome::Error.label(), "error");
    }

    #[test]
    fn sinks_accept_records() {
        let record = CallRecord {
            tier: Tier::Hot,
            operation: "fetch",
            outcome: Outcome::Miss,
            duration: Duration::from_millis(3),
            error_kind: None,
            at: Utc::now(),
        };
        TracingSink.record(&record);
        NullSink.record(&record);
    }
}
