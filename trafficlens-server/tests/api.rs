use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use trafficlens_core::loading::{NetworkAsset, network_from_json_str};
use trafficlens_core::source::ScriptedSource;
use trafficlens_core::{EdgeState, Error, Snapshot, SnapshotSource, SseDecoder, StreamEvent};
use trafficlens_server::{AppState, OFFLINE_MESSAGE, RequestLimits, StreamSettings, router};

fn snapshot(queue: f64) -> Snapshot {
    Snapshot::new(
        5.0,
        vec![EdgeState {
            id: "A-B".into(),
            from: "A".into(),
            to: "B".into(),
            speed_kmh: 42.0,
            queue,
            delay_s: 12.0,
            flow_vph: 720.0,
        }],
        vec![],
    )
}

fn limits() -> RequestLimits {
    RequestLimits {
        timeout: Duration::from_secs(2),
        max_concurrent: 4,
    }
}

fn state<S>(source: S, network: Option<NetworkAsset>) -> AppState<S> {
    AppState {
        source: Arc::new(source),
        network: network.map(Arc::new),
        stream: StreamSettings {
            poll_interval: Duration::from_millis(20),
            keep_alive: Duration::from_secs(15),
        },
        shutdown: CancellationToken::new(),
    }
}

async fn get<S>(state: AppState<S>, uri: &str) -> (StatusCode, serde_json::Value)
where
    S: SnapshotSource + 'static,
{
    let response = router(state, limits())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn state_returns_one_snapshot() {
    let source = ScriptedSource::new([Ok(snapshot(3.0))]);
    let (status, body) = get(state(source, None), "/api/state").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["edges"][0]["id"], "A-B");
    assert_eq!(body["edges"][0]["queue"], 3.0);
}

#[tokio::test]
async fn state_maps_upstream_failure_to_bad_gateway() {
    let source = ScriptedSource::new([Err("connection refused".to_string())]);
    let (status, body) = get(state(source, None), "/api/state").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("connection refused")
    );
}

#[tokio::test]
async fn state_rejects_invalid_snapshots() {
    let mut duplicated = snapshot(-5.0);
    duplicated.edges.push(duplicated.edges[0].clone());
    let source = ScriptedSource::new([Ok(duplicated), Ok(snapshot(-5.0))]);
    let state = state(source, None);

    let (status, body) = get(state.clone(), "/api/state").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("Duplicate edge id in snapshot: A-B")
    );

    let (status, body) = get(state, "/api/state").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("queue"));
}

struct Stalled;

impl SnapshotSource for Stalled {
    async fn fetch(&self) -> Result<Snapshot, Error> {
        std::future::pending().await
    }
}

#[tokio::test(start_paused = true)]
async fn slow_upstream_times_out() {
    let (status, body) = get(state(Stalled, None), "/api/state").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn network_asset_is_served_when_configured() {
    let geometry = network_from_json_str(
        r#"{"bbox_xy":[0,0,10,10],"edges":[{"id":"A-B","coords":[[0,0],[10,10]]}]}"#,
    )
    .unwrap();
    let asset = NetworkAsset::from(&geometry);

    let (status, body) = get(
        state(ScriptedSource::default(), Some(asset)),
        "/network/network.json",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bbox_xy"], serde_json::json!([0.0, 0.0, 10.0, 10.0]));
    assert_eq!(body["edges"][0]["coords"][1], serde_json::json!([10.0, 10.0]));

    let (status, _) = get(state(ScriptedSource::default(), None), "/network/network.json").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stream_relays_ticks_then_errors() {
    let source = ScriptedSource::new([Ok(snapshot(1.0)), Ok(snapshot(2.0))]);
    let response = router(state(source, None), limits())
        .oneshot(Request::builder().uri("/api/stream").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body().into_data_stream();
    let mut decoder = SseDecoder::new();
    let mut events = Vec::new();
    while events.len() < 3 {
        let chunk = tokio::time::timeout(Duration::from_secs(5), body.next())
            .await
            .expect("stream stalled")
            .expect("stream ended")
            .unwrap();
        for event in decoder.feed_events(&chunk) {
            events.push(event.unwrap());
        }
    }

    let queues: Vec<f64> = events[..2]
        .iter()
        .map(|event| match event {
            StreamEvent::Tick(snapshot) => snapshot.edges[0].queue,
            other => panic!("expected tick, got {other:?}"),
        })
        .collect();
    assert_eq!(queues, vec![1.0, 2.0]);
    // the script is exhausted, so the relay reports the source as offline
    assert_eq!(events[2], StreamEvent::error(OFFLINE_MESSAGE));

    let (StreamEvent::Tick(first), StreamEvent::Tick(second)) = (&events[0], &events[1]) else {
        unreachable!();
    };
    assert!(second.timestamp >= first.timestamp);
}

#[tokio::test]
async fn shutdown_ends_open_streams() {
    let app_state = state(ScriptedSource::new([Ok(snapshot(1.0))]), None);
    let shutdown = app_state.shutdown.clone();
    let response = router(app_state, limits())
        .oneshot(Request::builder().uri("/api/stream").body(Body::empty()).unwrap())
        .await
        .unwrap();

    shutdown.cancel();
    let mut body = response.into_body().into_data_stream();
    let drained = tokio::time::timeout(Duration::from_secs(5), async {
        while body.next().await.is_some() {}
    })
    .await;
    assert!(drained.is_ok());
}
