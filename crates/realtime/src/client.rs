use crate::error::{RealtimeError, Result};
use crate::event::{ChildEvent, StreamMessage};
use crate::fetch::FetchBuilder;
use crate::path::DbPath;
use crate::sse::{ChildMirror, SseDecoder, SseFrame};
use crate::store::RealtimeStore;
use crate::subscription::{ListenOptions, Subscription};
use async_trait::async_trait;
use futures_util::StreamExt;
use log::{debug, error, info, trace, warn};
use rand::Rng;
use reqwest::{Client, Method};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use url::Url;

/// Options for the REST calls and the event streams opened by
/// [`FirebaseClient`].
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: Option<u32>,
    /// Milliseconds before the first reconnect attempt.
    pub reconnect_interval: u64,
    pub reconnect_backoff_factor: f64,
    pub max_reconnect_interval: u64,
    /// Per-request timeout for reads and writes. Never applied to streams.
    pub request_timeout: Option<Duration>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: None, // Infinite attempts
            reconnect_interval: 1000,
            reconnect_backoff_factor: 1.5,
            max_reconnect_interval: 30000,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl StreamOptions {
    pub fn with_auto_reconnect(mut self, value: bool) -> Self {
        self.auto_reconnect = value;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, value: Option<u32>) -> Self {
        self.max_reconnect_attempts = value;
        self
    }

    pub fn with_reconnect_interval(mut self, millis: u64) -> Self {
        self.reconnect_interval = millis;
        self
    }

    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Delay before reconnect attempt number `attempt` (1-based), with up to
    /// 10% jitter.
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = self.reconnect_interval as f64 * self.reconnect_backoff_factor.powi(exponent);
        let capped = base.min(self.max_reconnect_interval as f64);
        let jitter = rand::thread_rng().gen_range(0.0..=0.1) * capped;
        Duration::from_millis((capped + jitter) as u64)
    }
}

/// Client for a Firebase Realtime Database, speaking its REST protocol for
/// reads and writes and its server-sent event protocol for listeners.
#[derive(Debug, Clone)]
pub struct FirebaseClient {
    pub(crate) base_url: Url,
    pub(crate) http_client: Client,
    pub(crate) options: StreamOptions,
}

impl FirebaseClient {
    /// Client with default options for `database_url`, e.g.
    /// `https://my-project-default-rtdb.firebaseio.com`.
    pub fn new(database_url: &str) -> Result<Self> {
        Self::new_with_options(database_url, StreamOptions::default())
    }

    pub fn new_with_options(database_url: &str, options: StreamOptions) -> Result<Self> {
        Self::with_http_client(database_url, Client::new(), options)
    }

    pub fn with_http_client(database_url: &str, http_client: Client, options: StreamOptions) -> Result<Self> {
        let base_url = Url::parse(database_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            s => {
                return Err(RealtimeError::ConnectionError(format!(
                    "Unsupported URL scheme: {}",
                    s
                )))
            }
        }
        info!("Creating realtime database client for {}", base_url);
        Ok(Self {
            base_url,
            http_client,
            options,
        })
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// REST endpoint for `path`: `{base}/{path}.json`.
    pub fn endpoint(&self, path: &DbPath) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RealtimeError::UrlParseError(url::ParseError::EmptyHost))?;
            segments.pop_if_empty();
            match path.segments().split_last() {
                Some((last, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{}.json", last));
                }
                None => {
                    segments.push(".json");
                }
            }
        }
        Ok(url)
    }

    fn request(&self, path: &DbPath, method: Method) -> Result<FetchBuilder<'_>> {
        Ok(FetchBuilder::new(&self.http_client, self.endpoint(path)?, method)
            .timeout(self.options.request_timeout))
    }
}

#[async_trait]
impl RealtimeStore for FirebaseClient {
    async fn get(&self, path: &DbPath) -> Result<Option<Value>> {
        debug!("GET '{}'", path);
        let value: Value = self.request(path, Method::GET)?.execute().await?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn set(&self, path: &DbPath, value: &Value) -> Result<()> {
        debug!("PUT '{}'", path);
        self.request(path, Method::PUT)?
            .query("print", "silent")
            .json(value)?
            .execute_empty()
            .await
    }

    async fn update(&self, path: &DbPath, fields: &Map<String, Value>) -> Result<()> {
        debug!("PATCH '{}' ({} fields)", path, fields.len());
        self.request(path, Method::PATCH)?
            .query("print", "silent")
            .json(fields)?
            .execute_empty()
            .await
    }

    async fn listen(&self, options: ListenOptions) -> Result<Subscription> {
        let url = self.endpoint(options.path())?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let path = options.path().clone();

        info!("Opening event stream for '{}'", path);
        let task = tokio::spawn(run_stream(
            self.http_client.clone(),
            url,
            options,
            self.options.clone(),
            sender,
        ));

        Ok(Subscription::new(path, receiver, move || task.abort()))
    }
}

enum StreamEnd {
    /// The server closed the connection; reconnecting may help.
    Closed,
    /// The listener was released or the server cancelled it for good.
    Finished,
}

#[tracing::instrument(skip_all, fields(url = %url))]
async fn run_stream(
    client: Client,
    url: Url,
    listen: ListenOptions,
    options: StreamOptions,
    sender: mpsc::UnboundedSender<ChildEvent>,
) {
    let mut mirror = ChildMirror::default();
    let mut attempts = 0;

    loop {
        let request = FetchBuilder::new(&client, url.clone(), Method::GET).event_stream();
        match request.execute_raw().await {
            Ok(response) => {
                debug!("Event stream connected");
                attempts = 0;
                match read_stream(response, &listen, &mut mirror, &sender).await {
                    StreamEnd::Finished => break,
                    StreamEnd::Closed => debug!("Event stream closed by server"),
                }
            }
            Err(e) => warn!("Event stream request failed: {}", e),
        }

        if !options.auto_reconnect || sender.is_closed() {
            break;
        }
        attempts += 1;
        if let Some(max_attempts) = options.max_reconnect_attempts {
            if attempts > max_attempts {
                error!("Max reconnect attempts ({}) reached, giving up", max_attempts);
                break;
            }
        }
        let delay = options.backoff(attempts);
        info!("Reconnecting event stream (attempt #{}) in {:?}", attempts, delay);
        sleep(delay).await;
    }
    debug!("Event stream task finished");
}

async fn read_stream(
    response: reqwest::Response,
    listen: &ListenOptions,
    mirror: &mut ChildMirror,
    sender: &mpsc::UnboundedSender<ChildEvent>,
) -> StreamEnd {
    let mut decoder = SseDecoder::default();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Event stream read error: {}", e);
                return StreamEnd::Closed;
            }
        };
        for frame in decoder.feed(&chunk) {
            match handle_frame(frame, listen, mirror, sender) {
                Ok(true) => {}
                Ok(false) => return StreamEnd::Finished,
                Err(e) => error!("Dropping malformed stream frame: {}", e),
            }
        }
    }
    StreamEnd::Closed
}

/// Returns `Ok(false)` when the stream must stop.
fn handle_frame(
    frame: SseFrame,
    listen: &ListenOptions,
    mirror: &mut ChildMirror,
    sender: &mpsc::UnboundedSender<ChildEvent>,
) -> Result<bool> {
    trace!("Stream frame '{}': {}", frame.event, frame.data);
    let events = match frame.event.as_str() {
        "put" => mirror.apply_put(serde_json::from_str::<StreamMessage>(&frame.data)?)?,
        "patch" => mirror.apply_patch(serde_json::from_str::<StreamMessage>(&frame.data)?)?,
        "keep-alive" => return Ok(true),
        "cancel" | "auth_revoked" => {
            warn!("Event stream {}: {}", frame.event, frame.data);
            return Ok(false);
        }
        other => {
            debug!("Ignoring unknown stream event '{}'", other);
            return Ok(true);
        }
    };

    for event in events.into_iter().filter(|e| listen.wants(e.kind)) {
        if sender.send(event).is_err() {
            return Ok(false);
        }
    }
    Ok(true)
}
