//! Connection manager: one logical hub connection with observable state and
//! automatic reconnection.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use notihub_core::error::{AppError, ErrorKind};
use notihub_core::result::AppResult;
use notihub_core::traits::TokenProvider;
use notihub_core::types::{ConnectionState, ConnectionStatus};

use crate::dispatch::EventDispatcher;
use crate::metrics::RelayMetrics;
use crate::protocol::message::HubMessage;
use crate::transport::{HubConnection, HubConnector};

use super::event::ConnectionEvent;
use super::policy::ReconnectPolicy;
use super::state::StateCell;

const EVENT_BUFFER: usize = 64;

/// Owns the single hub connection for this process.
///
/// Errors from [`start`](Self::start) are returned and also recorded in the
/// observable state. Neither `start` nor `stop` panics. A later `start` or
/// `stop` cancels any `start` still in flight, and `stop` cancels a pending
/// reconnect backoff so no attempt fires afterwards.
#[derive(Debug)]
pub struct ConnectionManager {
    connector: Arc<dyn HubConnector>,
    dispatcher: Arc<EventDispatcher>,
    policy: ReconnectPolicy,
    metrics: Arc<RelayMetrics>,
    state: Arc<StateCell>,
    /// Serializes start/stop; holds the live supervisor.
    lifecycle: tokio::sync::Mutex<Option<ActiveConnection>>,
    /// Cancels whatever start or supervisor is current.
    current: Mutex<CancellationToken>,
}

/// A supervisor task and the token that stops it.
#[derive(Debug)]
struct ActiveConnection {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ActiveConnection {
    /// Cancel and wait until the transport has been closed.
    async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!(error = %e, "Connection supervisor panicked");
            }
        }
    }
}

impl ConnectionManager {
    /// Creates a manager in the `disconnected` state.
    ///
    /// Counters are shared with `dispatcher`.
    pub fn new(
        connector: Arc<dyn HubConnector>,
        dispatcher: Arc<EventDispatcher>,
        policy: ReconnectPolicy,
    ) -> Self {
        let metrics = dispatcher.metrics();
        Self {
            connector,
            dispatcher,
            policy,
            metrics,
            state: Arc::new(StateCell::new(EVENT_BUFFER)),
            lifecycle: tokio::sync::Mutex::new(None),
            current: Mutex::new(CancellationToken::new()),
        }
    }

    /// Connect using a token from `tokens`.
    ///
    /// Any existing connection is torn down first, its transport closed and
    /// the state reset to `disconnected` before the new handshake begins. Fails with `Authentication` when the
    /// provider has no token and with `Connection` when the token cannot be
    /// read or the handshake fails; either way the state becomes `error` and
    /// nothing is retried. Returns `Cancelled` if a later `start` or `stop`
    /// superseded this call.
    pub async fn start(&self, tokens: Arc<dyn TokenProvider>) -> AppResult<()> {
        let cancel = self.supersede();
        let mut active = self.lifecycle.lock().await;

        if let Some(previous) = active.take() {
            debug!("Stopping existing connection before reconnecting");
            previous.shutdown().await;
        }
        if self.state.get().status != ConnectionStatus::Disconnected {
            self.state.transition(ConnectionState::disconnected());
        }
        if cancel.is_cancelled() {
            return Err(superseded());
        }

        self.state.transition(ConnectionState::connecting());

        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(superseded()),
            token = tokens.access_token() => token,
        };
        let token = match token {
            Ok(Some(token)) => token,
            Ok(None) => {
                return Err(self.fail(AppError::authentication(
                    "No access token available; sign in first",
                )));
            }
            Err(e) => {
                return Err(self.fail(AppError::with_source(
                    ErrorKind::Connection,
                    format!("Token provider failed: {}", e.message),
                    e,
                )));
            }
        };

        let connection = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(superseded()),
            connection = self.connector.connect(&token) => connection,
        };
        let connection = match connection {
            Ok(connection) => connection,
            Err(e) if e.is_auth() => return Err(self.fail(e)),
            Err(e) => {
                return Err(self.fail(AppError::with_source(
                    ErrorKind::Connection,
                    e.message.clone(),
                    e,
                )));
            }
        };

        let connection_id = connection.connection_id().to_string();
        self.metrics.record_connected();
        self.state
            .transition(ConnectionState::connected(connection_id.clone()));

        let supervisor = Supervisor {
            connector: Arc::clone(&self.connector),
            dispatcher: Arc::clone(&self.dispatcher),
            policy: self.policy.clone(),
            metrics: Arc::clone(&self.metrics),
            state: Arc::clone(&self.state),
            tokens,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(supervisor.run(connection));
        *active = Some(ActiveConnection { cancel, task });

        info!(connection_id = %connection_id, "Hub connection started");
        Ok(())
    }

    /// Tear down any connection, cancel pending retries, and reset to
    /// `disconnected`. Safe to call repeatedly.
    pub async fn stop(&self) {
        self.supersede();
        let mut active = self.lifecycle.lock().await;

        let had_connection = match active.take() {
            Some(previous) => {
                previous.shutdown().await;
                true
            }
            None => false,
        };

        if self.state.get().status != ConnectionStatus::Disconnected {
            self.state.transition(ConnectionState::disconnected());
        }
        if had_connection {
            info!("Hub connection stopped");
        }
    }

    /// Current state. Never blocks.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Whether the connection is live.
    pub fn is_connected(&self) -> bool {
        self.state.get().is_connected()
    }

    /// Every state transition in order, plus reconnect notices.
    ///
    /// Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.state.subscribe()
    }

    /// Latest-value view of the state.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.watch()
    }

    /// Shared counters.
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Cancel the current start or supervisor and install a fresh token.
    fn supersede(&self) -> CancellationToken {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.cancel();
        *current = CancellationToken::new();
        current.clone()
    }

    fn fail(&self, error: AppError) -> AppError {
        warn!(kind = %error.kind, error = %error.message, "Hub connection failed");
        self.state.transition(ConnectionState::error(error.message.clone()));
        error
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
    }
}

fn superseded() -> AppError {
    AppError::cancelled("Connection attempt superseded by a later start or stop")
}

/// Why the read loop ended.
enum Exit {
    /// `stop` or a newer `start` asked us to finish.
    Cancelled,
    /// The transport went away; the policy may retry.
    Dropped(String),
    /// The hub refused further connections.
    Fatal(String),
}

/// Reads one connection at a time and reconnects after drops.
struct Supervisor {
    connector: Arc<dyn HubConnector>,
    dispatcher: Arc<EventDispatcher>,
    policy: ReconnectPolicy,
    metrics: Arc<RelayMetrics>,
    state: Arc<StateCell>,
    tokens: Arc<dyn TokenProvider>,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run(self, mut connection: Box<dyn HubConnection>) {
        loop {
            let exit = self.pump(connection.as_mut()).await;
            if let Err(e) = connection.close().await {
                debug!(error = %e, "Error while closing hub connection");
            }

            let reason = match exit {
                Exit::Cancelled => return,
                Exit::Fatal(reason) => {
                    self.state.transition(ConnectionState::error(reason));
                    return;
                }
                Exit::Dropped(reason) => reason,
            };

            warn!(
                connection_id = %connection.connection_id(),
                reason = %reason,
                "Hub connection dropped"
            );
            match self.reconnect(reason).await {
                Some(next) => connection = next,
                None => return,
            }
        }
    }

    async fn pump(&self, connection: &mut dyn HubConnection) -> Exit {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Exit::Cancelled,
                next = connection.next_message() => next,
            };

            let message = match next {
                None => return Exit::Dropped("Connection closed by hub".to_string()),
                Some(Err(e)) => return Exit::Dropped(e.message),
                Some(Ok(message)) => message,
            };
            self.metrics.record_frame();

            match message {
                HubMessage::Invocation {
                    target, arguments, ..
                } => {
                    trace!(event = %target, "Hub invocation received");
                    self.dispatcher
                        .dispatch(&target, HubMessage::payload_from_arguments(arguments));
                }
                HubMessage::Close {
                    error,
                    allow_reconnect,
                } => {
                    let reason = error.unwrap_or_else(|| "Hub closed the connection".to_string());
                    return if allow_reconnect {
                        Exit::Dropped(reason)
                    } else {
                        Exit::Fatal(reason)
                    };
                }
                HubMessage::Ping => trace!("Hub ping"),
                other => debug!(message = ?other, "Ignoring hub message"),
            }
        }
    }

    /// Walk the backoff schedule until a handshake succeeds.
    ///
    /// Returns `None` when cancelled or when the state has moved to `error`.
    async fn reconnect(&self, reason: String) -> Option<Box<dyn HubConnection>> {
        let mut last_error = reason;
        let mut attempt: u32 = 0;

        loop {
            let Some(delay) = self.policy.delay_for_attempt(attempt) else {
                self.state.transition(ConnectionState::error(format!(
                    "Reconnect failed after {attempt} attempts: {last_error}"
                )));
                return None;
            };
            attempt += 1;

            self.state.transition(ConnectionState::reconnecting(
                attempt,
                Some(last_error.clone()),
            ));
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Waiting before reconnect");

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
            self.metrics.record_reconnect_attempt();

            let token = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                token = self.tokens.access_token() => token,
            };
            let token = match token {
                Ok(Some(token)) => token,
                Ok(None) => {
                    self.state.transition(ConnectionState::error(
                        "No access token available; sign in again",
                    ));
                    return None;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Token provider failed during reconnect");
                    last_error = e.message;
                    continue;
                }
            };

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                result = self.connector.connect(&token) => result,
            };
            match result {
                Ok(connection) => {
                    let connection_id = connection.connection_id().to_string();
                    self.metrics.record_connected();
                    self.state
                        .transition(ConnectionState::connected(connection_id.clone()));
                    self.state
                        .emit(ConnectionEvent::Reconnected { connection_id });
                    return Some(connection);
                }
                Err(e) if e.is_auth() => {
                    self.state.transition(ConnectionState::error(e.message));
                    return None;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Reconnect attempt failed");
                    last_error = e.message;
                }
            }
        }
    }
}
