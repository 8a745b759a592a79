//! Shared test helpers for integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use notihub_core::config::AppConfig;
use notihub_core::error::AppError;
use notihub_core::result::AppResult;
use notihub_core::traits::{DurableStorage, TokenProvider};
use notihub_core::types::{ConnectionState, ConnectionStatus};
use notihub_realtime::{
    ConnectionEvent, ConnectionManager, EventDispatcher, HubConnection, HubConnector,
    HubMessage, NotificationClient, ReconnectPolicy, RelayMetrics, StaticTokenProvider,
};
use notihub_store::backend::MemoryStorage;

/// Long enough that backoff timers always fire first under a paused clock.
pub const WAIT: Duration = Duration::from_secs(600);

/// What the mock hub does with the next handshake.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Complete the handshake.
    Accept,
    /// Fail with a connection error.
    Fail,
    /// Reject the token.
    Unauthorized,
    /// Never complete.
    Hang,
}

/// Scripted hub: records every handshake and teardown in order.
#[derive(Debug)]
pub struct MockConnector {
    script: Mutex<VecDeque<Outcome>>,
    fallback: Outcome,
    log: Arc<Mutex<Vec<String>>>,
    tokens: Mutex<Vec<String>>,
    links: Mutex<Vec<mpsc::UnboundedSender<Frame>>>,
    attempts: AtomicUsize,
}

#[derive(Debug)]
enum Frame {
    Message(HubMessage),
    Drop,
}

impl MockConnector {
    /// Accepts every handshake.
    pub fn new() -> Arc<Self> {
        Self::scripted(Vec::new(), Outcome::Accept)
    }

    /// Plays `script` in order, then `fallback` forever.
    pub fn scripted(script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            log: Arc::new(Mutex::new(Vec::new())),
            tokens: Mutex::new(Vec::new()),
            links: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        })
    }

    /// Handshakes started so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// `connect:N` and `close:conn-N` entries in the order they happened.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Tokens presented, one per handshake.
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    /// Push a message on the most recent connection.
    pub fn send(&self, message: HubMessage) {
        let links = self.links.lock().unwrap();
        let link = links.last().expect("no accepted connection");
        link.send(Frame::Message(message)).expect("connection gone");
    }

    /// Invoke a client method on the most recent connection.
    pub fn invoke(&self, target: &str, arguments: Vec<serde_json::Value>) {
        self.send(HubMessage::Invocation {
            invocation_id: None,
            target: target.to_string(),
            arguments,
        });
    }

    /// Break the most recent connection as if the network failed.
    pub fn drop_connection(&self) {
        let links = self.links.lock().unwrap();
        let link = links.last().expect("no accepted connection");
        link.send(Frame::Drop).expect("connection gone");
    }

    fn next_outcome(&self) -> Outcome {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl HubConnector for MockConnector {
    async fn connect(&self, access_token: &str) -> AppResult<Box<dyn HubConnection>> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.lock().unwrap().push(format!("connect:{n}"));
        self.tokens.lock().unwrap().push(access_token.to_string());

        match self.next_outcome() {
            Outcome::Accept => {
                let (tx, rx) = mpsc::unbounded_channel();
                self.links.lock().unwrap().push(tx);
                Ok(Box::new(MockConnection {
                    id: format!("conn-{n}"),
                    rx,
                    log: Arc::clone(&self.log),
                    closed: false,
                }))
            }
            Outcome::Fail => Err(AppError::connection("Handshake rejected by hub")),
            Outcome::Unauthorized => Err(AppError::authentication("Hub rejected the access token")),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

#[derive(Debug)]
struct MockConnection {
    id: String,
    rx: mpsc::UnboundedReceiver<Frame>,
    log: Arc<Mutex<Vec<String>>>,
    closed: bool,
}

#[async_trait]
impl HubConnection for MockConnection {
    fn connection_id(&self) -> &str {
        &self.id
    }

    async fn next_message(&mut self) -> Option<AppResult<HubMessage>> {
        if self.closed {
            return None;
        }
        match self.rx.recv().await {
            Some(Frame::Message(message)) => Some(Ok(message)),
            Some(Frame::Drop) => {
                self.closed = true;
                Some(Err(AppError::connection("Connection reset by peer")))
            }
            None => {
                self.closed = true;
                None
            }
        }
    }

    async fn send(&mut self, _message: &HubMessage) -> AppResult<()> {
        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        self.closed = true;
        self.log.lock().unwrap().push(format!("close:{}", self.id));
        Ok(())
    }
}

/// Token provider that hands out `t1`, `t2`, ... on successive calls.
#[derive(Debug, Default)]
pub struct RotatingTokens {
    calls: AtomicUsize,
}

#[async_trait]
impl TokenProvider for RotatingTokens {
    async fn access_token(&self) -> AppResult<Option<String>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Some(format!("t{n}")))
    }
}

/// A fixed token.
pub fn token(value: &str) -> Arc<dyn TokenProvider> {
    Arc::new(StaticTokenProvider::new(value))
}

/// Manager over `connector` with the default schedule.
pub fn manager(connector: Arc<MockConnector>) -> Arc<ConnectionManager> {
    manager_with_policy(connector, ReconnectPolicy::default())
}

/// Manager over `connector` with a custom schedule.
pub fn manager_with_policy(
    connector: Arc<MockConnector>,
    policy: ReconnectPolicy,
) -> Arc<ConnectionManager> {
    let dispatcher = EventDispatcher::spawn(Arc::new(RelayMetrics::new()));
    Arc::new(ConnectionManager::new(connector, dispatcher, policy))
}

/// In-memory storage holding `auth_token`.
pub fn storage_with_token(value: &str) -> Arc<dyn DurableStorage> {
    let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
    storage.set("auth_token", value).unwrap();
    storage
}

/// Full client over `connector` with in-memory storage.
pub fn client(connector: Arc<MockConnector>, storage: Arc<dyn DurableStorage>) -> NotificationClient {
    NotificationClient::with_connector(AppConfig::default(), storage, connector).unwrap()
}

/// Next connection event, failing the test if none arrives.
pub async fn next_event(rx: &mut broadcast::Receiver<ConnectionEvent>) -> ConnectionEvent {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("no connection event")
        .expect("event channel closed")
}

/// Receive events until one carries `status`; returns everything seen.
pub async fn events_until(
    rx: &mut broadcast::Receiver<ConnectionEvent>,
    status: ConnectionStatus,
) -> Vec<ConnectionEvent> {
    let mut seen = Vec::new();
    loop {
        let event = next_event(rx).await;
        let done = matches!(&event, ConnectionEvent::StateChanged { current, .. } if current.status == status);
        seen.push(event);
        if done {
            return seen;
        }
    }
}

/// Statuses of the state changes in `events`, in order.
pub fn statuses(events: &[ConnectionEvent]) -> Vec<ConnectionStatus> {
    events
        .iter()
        .filter_map(|event| match event {
            ConnectionEvent::StateChanged { current, .. } => Some(current.status),
            ConnectionEvent::Reconnected { .. } => None,
        })
        .collect()
}

/// Wait until the manager's state satisfies `predicate`.
pub async fn wait_for_state(
    manager: &ConnectionManager,
    predicate: impl FnMut(&ConnectionState) -> bool,
) -> ConnectionState {
    let mut watch = manager.watch_state();
    let state = tokio::time::timeout(WAIT, watch.wait_for(predicate))
        .await
        .expect("state never reached")
        .expect("state channel closed")
        .clone();
    state
}
