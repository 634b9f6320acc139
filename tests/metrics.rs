// tests/metrics.rs
//
// One run through the engine, then scrape /metrics. The recorder is global,
// so this binary holds a single test.

mod common;

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use common::{candidates, Behavior, Harness, ScriptedDestination};
use trending_relay::metrics::Metrics;
use trending_relay::seen::MemorySeenStore;

#[tokio::test]
async fn metrics_endpoint_contains_publish_series() {
    let metrics = Metrics::init(6_000, 129_600).expect("install recorder");

    let publisher = Harness::new(Arc::new(MemorySeenStore::new()))
        .destination(ScriptedDestination::new("relay-ok", Behavior::Accept))
        .destination(ScriptedDestination::new("relay-bad", Behavior::Reject))
        .build();
    publisher
        .run(candidates(&["a/b", "a/b", "c/d"]), &CancellationToken::new())
        .await
        .unwrap();

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for series in [
        "publish_candidates_total 3",
        "publish_skipped_seen_total 1",
        "publish_attempts_total 2",
        "publish_rate_interval_ms",
        "publish_run_last_ts",
        "publish_limiter_wait_ms",
    ] {
        assert!(text.contains(series), "missing `{series}` in:\n{text}");
    }
    assert!(text.contains(r#"publish_deliveries_total{destination="relay-ok",result="ok"} 2"#));
    assert!(text.contains(r#"publish_deliveries_total{destination="relay-bad",result="error"} 2"#));
}
