//! End-to-end cascade behavior over failure-injecting backends.

use std::sync::Arc;
use std::time::Duration;

use strata_core::{GatewayError, Key, NullSink, ResilienceConfig, Tier, Value};
use strata_gateway::TieredGateway;
use strata_tiers::{TierAdapter, TierBackend};
use strata_test_utils::{fixtures, FlakyBackend};

/// Fast, deterministic resilience settings: no envelope response cache (so
/// backend call counts are exact), one quick retry, a tight breaker.
fn test_config() -> ResilienceConfig {
    ResilienceConfig::default()
        .with_rate(10_000, 1.0)
        .with_retries(1)
        .with_timeout(Duration::from_millis(200))
        .with_breaker(3, Duration::from_secs(30))
        .with_response_cache_ttl(Duration::ZERO)
}

struct Harness {
    gateway: TieredGateway,
    hot: Arc<TierAdapter<FlakyBackend>>,
    warm: Arc<TierAdapter<FlakyBackend>>,
    cold: Arc<TierAdapter<FlakyBackend>>,
}

fn harness() -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let adapter = |tier| {
        Arc::new(TierAdapter::new(
            tier,
            FlakyBackend::new(),
            test_config(),
            Arc::new(NullSink),
        ))
    };
    let (hot, warm, cold) = (adapter(Tier::Hot), adapter(Tier::Warm), adapter(Tier::Cold));
    Harness {
        gateway: TieredGateway::new(hot.clone(), warm.clone(), cold.clone()),
        hot,
        warm,
        cold,
    }
}

async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 1s");
}

#[tokio::test]
async fn warm_write_promotes_on_read_and_repromotes_after_eviction() {
    let h = harness();
    let key = Key::new("profile:42");
    let doc = fixtures::profile_doc("42", "Ann", "vip");

    h.gateway
        .set(&key, &doc, Tier::Warm, None, false)
        .await
        .unwrap();
    assert_eq!(h.hot.backend().inner().len(), 0);

    // First read falls through to warm and promotes the value into hot.
    assert_eq!(h.gateway.get(&key).await.unwrap(), Some(doc.clone()));
    let hot_inner = h.hot.backend().inner();
    eventually(|| hot_inner.len() == 1).await;

    // Hot evicts the copy; the next read falls through again and re-warms.
    assert!(hot_inner.evict(&key));
    assert_eq!(h.gateway.get(&key).await.unwrap(), Some(doc));
    eventually(|| hot_inner.len() == 1).await;
}

#[tokio::test]
async fn hot_hit_short_circuits_slower_tiers() {
    let h = harness();
    let key = Key::new("session:1");
    h.gateway
        .set(&key, &Value::text("token"), Tier::Hot, None, false)
        .await
        .unwrap();

    for _ in 0..5 {
        assert!(h.gateway.get(&key).await.unwrap().is_some());
    }
    assert_eq!(h.warm.backend().get_calls(), 0);
    assert_eq!(h.cold.backend().get_calls(), 0);
}

#[tokio::test]
async fn hot_outage_falls_through_without_touching_other_breakers() {
    let h = harness();
    let key = Key::new("profile:7");
    h.warm
        .backend()
        .inner()
        .put(&key, &Value::text("v"), None)
        .await
        .unwrap();
    h.hot.backend().set_unavailable(true);

    // Reads keep succeeding from warm while hot fails every attempt.
    for _ in 0..4 {
        assert_eq!(h.gateway.get(&key).await.unwrap(), Some(Value::text("v")));
    }

    // Hot's breaker has absorbed the failures; warm and cold are untouched.
    use strata_resilience::BreakerState;
    assert_eq!(h.hot.snapshot().breaker, BreakerState::Open);
    assert_eq!(h.warm.snapshot().breaker, BreakerState::Closed);
    assert_eq!(h.cold.snapshot().breaker, BreakerState::Closed);
}

#[tokio::test]
async fn clean_miss_everywhere_is_none_but_total_outage_is_an_error() {
    let h = harness();
    let key = Key::new("absent");
    assert_eq!(h.gateway.get(&key).await.unwrap(), None);

    for adapter in [&h.hot, &h.warm, &h.cold] {
        adapter.backend().set_unavailable(true);
    }
    assert!(matches!(
        h.gateway.get(&key).await,
        Err(GatewayError::Unavailable { .. })
    ));
}

#[tokio::test]
async fn schema_rejection_is_not_masked_by_fallthrough() {
    let h = harness();
    let key = Key::new("profile:9");
    h.warm
        .backend()
        .inner()
        .put(&key, &Value::text("v"), None)
        .await
        .unwrap();
    h.hot.backend().set_rejecting(true);

    // The value exists in warm, but a caller bug on hot must surface rather
    // than be hidden by a successful slower read.
    assert!(matches!(
        h.gateway.get(&key).await,
        Err(GatewayError::Tier {
            tier: Tier::Hot,
            ..
        })
    ));
    assert_eq!(h.warm.backend().get_calls(), 0);
}

#[tokio::test]
async fn transient_blip_is_retried_inside_the_tier() {
    let h = harness();
    let key = Key::new("profile:3");
    h.hot
        .backend()
        .inner()
        .put(&key, &Value::text("v"), None)
        .await
        .unwrap();

    // One injected failure, one configured retry: the read still succeeds
    // from hot without falling through.
    h.hot.backend().fail_next(1);
    assert_eq!(h.gateway.get(&key).await.unwrap(), Some(Value::text("v")));
    assert_eq!(h.warm.backend().get_calls(), 0);
}

#[tokio::test]
async fn slow_tier_is_cut_off_by_the_caller_deadline() {
    let h = harness();
    let key = Key::new("profile:5");
    h.hot.backend().set_latency(Duration::from_millis(100));

    let result = h
        .gateway
        .get_with_deadline(&key, Duration::from_millis(30))
        .await;
    assert!(matches!(
        result,
        Err(GatewayError::DeadlineExceeded { tier: Tier::Hot })
    ));
}

#[tokio::test]
async fn delete_tolerates_a_failing_tier() {
    let h = harness();
    let key = Key::new("k");
    for adapter in [&h.hot, &h.warm, &h.cold] {
        adapter
            .backend()
            .inner()
            .put(&key, &Value::text("v"), None)
            .await
            .unwrap();
    }
    h.cold.backend().set_unavailable(true);

    // Cold's copy survives but the delete still reports success.
    assert_eq!(h.gateway.delete(&key).await, Ok(true));
    assert!(h.hot.backend().inner().is_empty());
    assert!(h.warm.backend().inner().is_empty());
    assert_eq!(h.cold.backend().inner().len(), 1);
}

#[tokio::test]
async fn write_through_replicates_to_faster_tiers() {
    let h = harness();
    let key = Key::new("inventory:SKU-1");
    let doc = fixtures::inventory_doc("SKU-1", 12);

    h.gateway
        .set(&key, &doc, Tier::Cold, None, true)
        .await
        .unwrap();
    let (hot_inner, warm_inner) = (h.hot.backend().inner(), h.warm.backend().inner());
    eventually(|| hot_inner.len() == 1 && warm_inner.len() == 1).await;
    assert_eq!(h.cold.backend().inner().len(), 1);
}
