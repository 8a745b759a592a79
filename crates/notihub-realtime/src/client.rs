//! Wiring for a complete notification client.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use notihub_core::config::AppConfig;
use notihub_core::result::AppResult;
use notihub_core::traits::{DurableStorage, TokenProvider};
use notihub_core::types::AuthSignal;
use notihub_store::NotificationStore;

use crate::connection::{ConnectionManager, ReconnectPolicy};
use crate::dispatch::{EventDispatcher, EventHandler, StoreHandler};
use crate::metrics::RelayMetrics;
use crate::registration::{DeviceRegistrar, RegistrationClient};
use crate::session::{SessionBridge, SessionContext, StoredTokenProvider};
use crate::transport::{HubConnector, WsHubConnector};

/// One explicitly constructed client: store, dispatcher, connection manager
/// and optional device registration, sharing one durable storage.
///
/// The configured notification events are routed into the store.
#[derive(Debug)]
pub struct NotificationClient {
    config: AppConfig,
    storage: Arc<dyn DurableStorage>,
    store: NotificationStore,
    dispatcher: Arc<EventDispatcher>,
    manager: Arc<ConnectionManager>,
    tokens: Arc<dyn TokenProvider>,
    registrar: Option<Arc<DeviceRegistrar>>,
}

impl NotificationClient {
    /// Client using the WebSocket transport. Must be called inside a tokio
    /// runtime.
    pub fn new(config: AppConfig, storage: Arc<dyn DurableStorage>) -> AppResult<Self> {
        let connector = Arc::new(WsHubConnector::new(config.hub.clone()));
        Self::with_connector(config, storage, connector)
    }

    /// Client using a custom transport.
    pub fn with_connector(
        config: AppConfig,
        storage: Arc<dyn DurableStorage>,
        connector: Arc<dyn HubConnector>,
    ) -> AppResult<Self> {
        let dispatcher = EventDispatcher::spawn(Arc::new(RelayMetrics::new()));
        let store = NotificationStore::new(Arc::clone(&storage), config.notifications.clone());

        let handler: Arc<dyn EventHandler> = Arc::new(StoreHandler::new(store.clone()));
        for event in &config.hub.notification_events {
            dispatcher.register_handler(event, Arc::clone(&handler));
        }

        let manager = Arc::new(ConnectionManager::new(
            connector,
            Arc::clone(&dispatcher),
            ReconnectPolicy::from_config(&config.reconnect),
        ));

        let tokens: Arc<dyn TokenProvider> = Arc::new(StoredTokenProvider::new(
            Arc::clone(&storage),
            config.session.token_key.clone(),
        ));

        let registrar = if config.push.enabled() {
            Some(Arc::new(DeviceRegistrar::new(
                RegistrationClient::from_config(&config)?,
                config.push.clone(),
                Arc::clone(&storage),
                Arc::clone(&tokens),
            )))
        } else {
            None
        };

        info!(
            hub = %config.hub.url,
            storage = storage.backend_name(),
            events = config.hub.notification_events.len(),
            push = registrar.is_some(),
            "Notification client ready"
        );

        Ok(Self {
            config,
            storage,
            store,
            dispatcher,
            manager,
            tokens,
            registrar,
        })
    }

    /// Connect and disconnect as `signal` changes.
    pub fn bind_session(&self, signal: watch::Receiver<AuthSignal>) -> SessionBridge {
        SessionBridge::spawn(signal, self.session_context())
    }

    /// Collaborators for a [`SessionBridge`].
    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            manager: Arc::clone(&self.manager),
            store: self.store.clone(),
            tokens: Arc::clone(&self.tokens),
            registrar: self.registrar.clone(),
        }
    }

    /// Remove this device's push registration from the hub.
    ///
    /// Returns `Ok(false)` when push delivery is disabled or no access token
    /// is available.
    pub async fn unregister_device(&self) -> AppResult<bool> {
        match &self.registrar {
            Some(registrar) => registrar.unregister().await,
            None => Ok(false),
        }
    }

    /// Disconnect from the hub.
    pub async fn shutdown(&self) {
        self.manager.stop().await;
    }

    /// Notification history.
    pub fn store(&self) -> &NotificationStore {
        &self.store
    }

    /// The hub connection.
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// The event dispatcher, for registering extra handlers.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    /// Shared counters.
    pub fn metrics(&self) -> Arc<RelayMetrics> {
        self.dispatcher.metrics()
    }

    /// Durable storage backing the store and token provider.
    pub fn storage(&self) -> &Arc<dyn DurableStorage> {
        &self.storage
    }

    /// The token provider used for every handshake.
    pub fn tokens(&self) -> &Arc<dyn TokenProvider> {
        &self.tokens
    }

    /// Active configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
