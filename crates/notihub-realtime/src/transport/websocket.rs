//! WebSocket transport speaking the hub JSON protocol.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::{StatusCode, Url};
use tokio::net::TcpStream;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use notihub_core::config::{HubConfig, TransportMode};
use notihub_core::error::{AppError, ErrorKind};
use notihub_core::result::AppResult;

use crate::protocol::handshake::{HandshakeRequest, HandshakeResponse};
use crate::protocol::message::HubMessage;
use crate::protocol::negotiate::NegotiateResponse;
use crate::protocol::{RECORD_SEPARATOR, split_records};

use super::{HubConnection, HubConnector};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Redirect hops followed during negotiation before giving up.
const MAX_NEGOTIATE_REDIRECTS: usize = 5;

/// Where to open the socket after negotiation.
#[derive(Debug, Clone)]
struct Endpoint {
    url: Url,
    connection_id: String,
    socket_id: Option<String>,
    access_token: String,
}

/// Opens WebSocket connections to the hub, negotiating first unless
/// configured for WebSocket-only.
#[derive(Debug, Clone)]
pub struct WsHubConnector {
    config: HubConfig,
    http: reqwest::Client,
}

impl WsHubConnector {
    /// Creates a connector for the configured hub.
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn resolve_endpoint(&self, access_token: &str) -> AppResult<Endpoint> {
        let hub_url = parse_url(&self.config.url)?;
        match self.config.transport {
            TransportMode::WebSocketOnly => Ok(Endpoint {
                url: hub_url,
                connection_id: Uuid::new_v4().to_string(),
                socket_id: None,
                access_token: access_token.to_string(),
            }),
            TransportMode::Negotiate => self.negotiate(hub_url, access_token).await,
        }
    }

    async fn negotiate(&self, mut hub_url: Url, access_token: &str) -> AppResult<Endpoint> {
        let mut token = access_token.to_string();

        for _ in 0..=MAX_NEGOTIATE_REDIRECTS {
            let url = negotiate_url(&hub_url)?;
            debug!(url = %url, "Negotiating hub connection");

            let response = self
                .http
                .post(url)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Connection, format!("Negotiate failed: {e}"), e)
                })?;

            match response.status() {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    return Err(AppError::authentication(format!(
                        "Hub rejected access token ({})",
                        response.status()
                    )));
                }
                status if !status.is_success() => {
                    return Err(AppError::connection(format!(
                        "Negotiate returned {status}"
                    )));
                }
                _ => {}
            }

            let body: NegotiateResponse = response.json().await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Protocol,
                    format!("Malformed negotiate response: {e}"),
                    e,
                )
            })?;

            if let Some(reason) = body.error {
                return Err(AppError::connection(format!("Negotiate rejected: {reason}")));
            }

            if let Some(redirect) = body.url {
                info!(url = %redirect, "Hub redirected negotiation");
                hub_url = parse_url(&redirect)?;
                if let Some(redirect_token) = body.access_token {
                    token = redirect_token;
                }
                continue;
            }

            if !body.supports_websockets() {
                return Err(AppError::connection(
                    "Hub does not offer the WebSockets transport",
                ));
            }

            let socket_id = body.socket_id().map(str::to_string);
            let connection_id = body
                .connection_id
                .clone()
                .or_else(|| socket_id.clone())
                .unwrap_or_else(|| Uuid::new_v4().to_string());

            return Ok(Endpoint {
                url: hub_url,
                connection_id,
                socket_id,
                access_token: token,
            });
        }

        Err(AppError::connection(format!(
            "Negotiate exceeded {MAX_NEGOTIATE_REDIRECTS} redirects"
        )))
    }

    async fn handshake(&self, stream: &mut WsStream) -> AppResult<VecDeque<HubMessage>> {
        let request = HandshakeRequest::json().encode()?;
        stream
            .send(Message::Text(request.into()))
            .await
            .map_err(|e| ws_error("Failed to send handshake", e))?;

        let timeout = Duration::from_secs(self.config.handshake_timeout_seconds);
        let mut pending = VecDeque::new();

        loop {
            let frame = tokio::time::timeout(timeout, stream.next())
                .await
                .map_err(|_| AppError::connection("Timed out waiting for handshake response"))?;

            let text = match frame {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(AppError::connection("Hub closed the socket during handshake"));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(ws_error("Handshake read failed", e)),
            };

            let mut records = split_records(text.as_str());
            let Some(first) = records.next() else {
                continue;
            };
            HandshakeResponse::parse(first)?;

            for record in records {
                match HubMessage::parse(record) {
                    Ok(message) => pending.push_back(message),
                    Err(e) => warn!(error = %e, "Dropping malformed record after handshake"),
                }
            }
            return Ok(pending);
        }
    }
}

#[async_trait]
impl HubConnector for WsHubConnector {
    async fn connect(&self, access_token: &str) -> AppResult<Box<dyn HubConnection>> {
        let endpoint = self.resolve_endpoint(access_token).await?;
        let url = socket_url(&endpoint)?;

        let (mut stream, _response) = connect_async(url.as_str()).await.map_err(|e| match e {
            WsError::Http(ref response)
                if response.status() == StatusCode::UNAUTHORIZED.as_u16() =>
            {
                AppError::authentication("Hub rejected access token on upgrade")
            }
            other => ws_error("WebSocket connect failed", other),
        })?;

        let pending = match self.handshake(&mut stream).await {
            Ok(pending) => pending,
            Err(e) => {
                let _ = stream.close(None).await;
                return Err(e);
            }
        };

        info!(connection_id = %endpoint.connection_id, "Hub handshake complete");

        let keep_alive_period = Duration::from_secs(self.config.keep_alive_interval_seconds.max(1));
        let mut keep_alive =
            tokio::time::interval_at(Instant::now() + keep_alive_period, keep_alive_period);
        keep_alive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(Box::new(WsHubConnection {
            connection_id: endpoint.connection_id,
            stream,
            pending,
            keep_alive,
            server_timeout: Duration::from_secs(self.config.server_timeout_seconds.max(1)),
            last_received: Instant::now(),
            closed: false,
        }))
    }
}

/// Live WebSocket connection.
pub struct WsHubConnection {
    connection_id: String,
    stream: WsStream,
    /// Records already read but not yet handed out.
    pending: VecDeque<HubMessage>,
    keep_alive: Interval,
    server_timeout: Duration,
    last_received: Instant,
    closed: bool,
}

impl fmt::Debug for WsHubConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsHubConnection")
            .field("connection_id", &self.connection_id)
            .field("pending", &self.pending.len())
            .field("closed", &self.closed)
            .finish()
    }
}

enum Wake {
    Frame(Option<Result<Message, WsError>>),
    KeepAlive,
    ServerTimeout,
}

#[async_trait]
impl HubConnection for WsHubConnection {
    fn connection_id(&self) -> &str {
        &self.connection_id
    }

    async fn next_message(&mut self) -> Option<AppResult<HubMessage>> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Some(Ok(message));
            }
            if self.closed {
                return None;
            }

            let deadline = self.last_received + self.server_timeout;
            let wake = tokio::select! {
                frame = self.stream.next() => Wake::Frame(frame),
                _ = self.keep_alive.tick() => Wake::KeepAlive,
                _ = tokio::time::sleep_until(deadline) => Wake::ServerTimeout,
            };

            match wake {
                Wake::Frame(None) => {
                    self.closed = true;
                    return None;
                }
                Wake::Frame(Some(Err(e))) => {
                    self.closed = true;
                    return Some(Err(ws_error("WebSocket read failed", e)));
                }
                Wake::Frame(Some(Ok(Message::Text(text)))) => {
                    self.last_received = Instant::now();
                    for record in split_records(text.as_str()) {
                        match HubMessage::parse(record) {
                            Ok(message) => self.pending.push_back(message),
                            Err(e) => warn!(
                                connection_id = %self.connection_id,
                                error = %e,
                                "Dropping malformed hub record"
                            ),
                        }
                    }
                }
                Wake::Frame(Some(Ok(Message::Close(frame)))) => {
                    debug!(connection_id = %self.connection_id, ?frame, "Hub closed the socket");
                    self.closed = true;
                    return None;
                }
                Wake::Frame(Some(Ok(_))) => {
                    self.last_received = Instant::now();
                }
                Wake::KeepAlive => {
                    trace!(connection_id = %self.connection_id, "Sending keep-alive ping");
                    if let Err(e) = self.send(&HubMessage::Ping).await {
                        self.closed = true;
                        return Some(Err(e));
                    }
                }
                Wake::ServerTimeout => {
                    self.closed = true;
                    return Some(Err(AppError::connection(format!(
                        "No message from hub within {}s",
                        self.server_timeout.as_secs()
                    ))));
                }
            }
        }
    }

    async fn send(&mut self, message: &HubMessage) -> AppResult<()> {
        let text = message.encode()?;
        debug_assert!(text.ends_with(RECORD_SEPARATOR));
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ws_error("WebSocket send failed", e))
    }

    async fn close(&mut self) -> AppResult<()> {
        self.closed = true;
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(ws_error("WebSocket close failed", e)),
        }
    }
}

fn parse_url(raw: &str) -> AppResult<Url> {
    Url::parse(raw).map_err(|e| AppError::configuration(format!("Invalid hub URL '{raw}': {e}")))
}

/// `{hub}/negotiate?negotiateVersion=1` over http(s).
fn negotiate_url(hub_url: &Url) -> AppResult<Url> {
    let mut url = with_scheme(hub_url, false)?;
    let path = format!("{}/negotiate", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.query_pairs_mut().append_pair("negotiateVersion", "1");
    Ok(url)
}

/// Hub URL over ws(s) carrying the connection id and access token.
fn socket_url(endpoint: &Endpoint) -> AppResult<Url> {
    let mut url = with_scheme(&endpoint.url, true)?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(id) = &endpoint.socket_id {
            query.append_pair("id", id);
        }
        query.append_pair("access_token", &endpoint.access_token);
    }
    Ok(url)
}

/// Switch between the http and ws scheme families, keeping TLS.
fn with_scheme(url: &Url, websocket: bool) -> AppResult<Url> {
    let secure = matches!(url.scheme(), "https" | "wss");
    let scheme = match (websocket, secure) {
        (true, true) => "wss",
        (true, false) => "ws",
        (false, true) => "https",
        (false, false) => "http",
    };
    let mut out = url.clone();
    out.set_scheme(scheme)
        .map_err(|_| AppError::configuration(format!("Unsupported hub URL scheme: {url}")))?;
    Ok(out)
}

fn ws_error(context: &str, err: WsError) -> AppError {
    AppError::with_source(ErrorKind::Connection, format!("{context}: {err}"), err)
}
