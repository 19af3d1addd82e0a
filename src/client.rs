//! HTTP side of the consumer: live stream ingestion, polling fallback and the
//! one-time geometry fetch.

use std::fmt::Display;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use trafficlens_core::loading::NetworkAsset;
use trafficlens_core::{Error, LivePipeline, NetworkGeometry, Snapshot, SseDecoder, StreamEvent};

pub const STREAM_PATH: &str = "/api/stream";
pub const STATE_PATH: &str = "/api/state";
pub const NETWORK_PATH: &str = "/network/network.json";

/// Degraded status shown while the stream connection itself is down
pub const DISCONNECTED_MESSAGE: &str = "Stream disconnected";

/// Pipeline shared by the network tasks and the frame loop.
///
/// Every mutation happens under one short lock, so an apply never
/// interleaves with an arrival.
pub type SharedPipeline = Arc<Mutex<LivePipeline>>;

pub fn shared(pipeline: LivePipeline) -> SharedPipeline {
    Arc::new(Mutex::new(pipeline))
}

pub fn lock(pipeline: &SharedPipeline) -> MutexGuard<'_, LivePipeline> {
    pipeline.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl Client {
    /// `request_timeout` bounds the one-shot requests; the stream itself is
    /// only bounded at connect time.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, Error> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        // error bodies carry `{"message": ...}`
        let message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("message")?.as_str().map(str::to_string))
            .unwrap_or_else(|| status.to_string());
        Err(Error::Upstream(format!("{url} answered {status}: {message}")))
    }

    pub async fn fetch_state(&self) -> Result<Snapshot, Error> {
        let snapshot = self
            .get(STATE_PATH)
            .await?
            .json::<Snapshot>()
            .await
            .map_err(|e| Error::Upstream(format!("malformed snapshot: {e}")))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub async fn fetch_network(&self) -> Result<NetworkGeometry, Error> {
        let asset = self
            .get(NETWORK_PATH)
            .await?
            .json::<NetworkAsset>()
            .await
            .map_err(|e| Error::GeometryError(format!("malformed network asset: {e}")))?;
        asset.try_into()
    }

    pub async fn open_stream(&self) -> Result<reqwest::Response, Error> {
        let url = self.url(STREAM_PATH);
        let response = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("request to {url} failed: {e}")))?;
        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "{url} answered {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub events: u64,
    pub malformed: u64,
}

/// Decodes an event-stream body into `pipeline` until the body ends.
///
/// Malformed events are logged and skipped.
pub async fn ingest<St, E>(body: St, pipeline: &SharedPipeline) -> Result<IngestStats, Error>
where
    St: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut body = pin!(body);
    let mut decoder = SseDecoder::new();
    let mut stats = IngestStats::default();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| Error::Upstream(format!("stream interrupted: {e}")))?;
        let events = decoder.feed_events(&chunk);
        if events.is_empty() {
            continue;
        }

        let mut live = lock(pipeline);
        for event in events {
            match event {
                Ok(event) => {
                    stats.events += 1;
                    live.on_event(event);
                }
                Err(err) => {
                    stats.malformed += 1;
                    warn!("Discarding stream event: {err}");
                }
            }
        }
    }
    Ok(stats)
}

/// Keeps the live stream connected, reconnecting `reconnect_delay` after
/// every disconnect. Never returns.
pub async fn watch(client: &Client, pipeline: SharedPipeline, reconnect_delay: Duration) {
    loop {
        let result = match client.open_stream().await {
            Ok(response) => {
                info!("Connected to {}", client.url(STREAM_PATH));
                ingest(response.bytes_stream(), &pipeline).await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(stats) => debug!(
                "Stream closed after {} events ({} malformed)",
                stats.events, stats.malformed
            ),
            Err(err) => warn!("{err}"),
        }

        {
            let mut live = lock(&pipeline);
            live.on_event(StreamEvent::error(DISCONNECTED_MESSAGE));
            // the next connection runs on its own clock
            live.reset_ordering();
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

/// Polling fallback: offers one fetched snapshot per `period`. Never returns.
pub async fn poll(client: &Client, pipeline: SharedPipeline, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let event = match client.fetch_state().await {
            Ok(snapshot) => StreamEvent::Tick(snapshot),
            Err(err) => {
                warn!("{err}");
                StreamEvent::error(err.to_string())
            }
        };
        lock(&pipeline).on_event(event);
    }
}
