//! HTTP surface: live stream, polling endpoint, geometry asset and the demo bridge.

use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, get};
use axum::{BoxError, Json, Router};
use futures_util::Stream;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tower::ServiceBuilder;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};
use trafficlens_core::loading::NetworkAsset;
use trafficlens_core::{Error, Snapshot, SnapshotSource, StreamEvent};

use crate::config::ServerConfig;
use crate::relay::{RelayClock, run_relay};

/// Events buffered per stream connection before the relay waits on the consumer
const STREAM_BUFFER: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSettings {
    pub poll_interval: Duration,
    pub keep_alive: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            keep_alive: Duration::from_secs(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestLimits {
    pub timeout: Duration,
    pub max_concurrent: usize,
}

impl From<&ServerConfig> for StreamSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            keep_alive: config.keep_alive(),
        }
    }
}

impl From<&ServerConfig> for RequestLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            timeout: config.request_timeout(),
            max_concurrent: config.max_concurrent_requests,
        }
    }
}

pub struct AppState<S> {
    pub source: Arc<S>,
    pub network: Option<Arc<NetworkAsset>>,
    pub stream: StreamSettings,
    /// Parent of every relay's cancellation token; cancelling it ends all streams
    pub shutdown: CancellationToken,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            network: self.network.clone(),
            stream: self.stream,
            shutdown: self.shutdown.clone(),
        }
    }
}

/// Upstream failure rendered as `502 {"message": ...}`
#[derive(Debug)]
pub struct BridgeError(Error);

impl From<Error> for BridgeError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "message": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Router for the dashboard-facing server
pub fn router<S>(state: AppState<S>, limits: RequestLimits) -> Router
where
    S: SnapshotSource + 'static,
{
    Router::new()
        .route("/api/stream", get(stream::<S>))
        .route("/api/state", with_limits(get(state_once::<S>), limits))
        .route("/network/network.json", get(network::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Router for the demo bridge: `GET /state` answers from `source`
pub fn bridge_router<S>(source: Arc<S>, limits: RequestLimits) -> Router
where
    S: SnapshotSource + 'static,
{
    let state = AppState {
        source,
        network: None,
        stream: StreamSettings::default(),
        shutdown: CancellationToken::new(),
    };
    Router::new()
        .route("/state", with_limits(get(state_once::<S>), limits))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn with_limits<S>(
    route: MethodRouter<AppState<S>>,
    limits: RequestLimits,
) -> MethodRouter<AppState<S>>
where
    S: SnapshotSource + 'static,
{
    route.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(middleware_error))
            .layer(TimeoutLayer::new(limits.timeout))
            .layer(ConcurrencyLimitLayer::new(limits.max_concurrent)),
    )
}

async fn middleware_error(err: BoxError) -> Response {
    let status = if err.is::<tower::timeout::error::Elapsed>() {
        StatusCode::GATEWAY_TIMEOUT
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    warn!(error = %err, %status, "Request failed in middleware");
    (status, Json(json!({ "message": err.to_string() }))).into_response()
}

async fn state_once<S>(State(state): State<AppState<S>>) -> Result<Json<Snapshot>, BridgeError>
where
    S: SnapshotSource + 'static,
{
    let snapshot = state.source.fetch().await.inspect_err(|err| {
        warn!(error = %err, "State fetch failed");
    })?;
    snapshot.validate().inspect_err(|err| {
        warn!(error = %err, "Bridge returned an invalid snapshot");
    })?;
    Ok(Json(snapshot))
}

async fn network<S>(State(state): State<AppState<S>>) -> Response
where
    S: SnapshotSource + 'static,
{
    match state.network {
        Some(asset) => Json(asset.as_ref().clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "no network geometry configured" })),
        )
            .into_response(),
    }
}

async fn stream<S>(
    State(state): State<AppState<S>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: SnapshotSource + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);
    let cancel = state.shutdown.child_token();
    tokio::spawn(run_relay(
        Arc::clone(&state.source),
        tx,
        state.stream.poll_interval,
        RelayClock::new(),
        cancel.clone(),
    ));
    debug!("Stream connection opened");

    Sse::new(RelayStream {
        events: ReceiverStream::new(rx),
        _cancel_on_drop: cancel.drop_guard(),
    })
    .keep_alive(KeepAlive::new().interval(state.stream.keep_alive))
}

/// Response body of one stream connection.
///
/// Dropping it cancels the relay task; the stream ends once the relay does.
struct RelayStream {
    events: ReceiverStream<StreamEvent>,
    _cancel_on_drop: DropGuard,
}

impl Stream for RelayStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.events)
            .poll_next(cx)
            .map(|event| event.map(|event| Ok(sse_event(&event))))
    }
}

fn sse_event(event: &StreamEvent) -> Event {
    match event.to_json() {
        Ok(data) => Event::default().data(data),
        Err(err) => {
            warn!(error = %err, "Failed to serialize stream event");
            Event::default().data(r#"{"type":"error","message":"serialization failed"}"#)
        }
    }
}
