//! Drives connect/disconnect from auth signal transitions.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use notihub_core::traits::TokenProvider;
use notihub_core::types::{AuthSignal, UserId};
use notihub_store::NotificationStore;

use crate::connection::ConnectionManager;
use crate::registration::DeviceRegistrar;

/// Collaborators the bridge drives.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// The hub connection.
    pub manager: Arc<ConnectionManager>,
    /// Notification history.
    pub store: NotificationStore,
    /// Token source handed to every start.
    pub tokens: Arc<dyn TokenProvider>,
    /// Device registration, when push delivery is configured.
    pub registrar: Option<Arc<DeviceRegistrar>>,
}

/// Background task reacting to [`AuthSignal`] changes.
///
/// Sign-in loads the user's history, starts the connection and registers
/// the device. Sign-out stops the connection, detaches the store and forgets
/// the registration. Switching users does both, in that order. A new signal
/// arriving while a start is in flight abandons that start.
#[derive(Debug)]
pub struct SessionBridge {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SessionBridge {
    /// Start reacting to `signal`, beginning with its current value.
    pub fn spawn(signal: watch::Receiver<AuthSignal>, context: SessionContext) -> Self {
        let cancel = CancellationToken::new();
        let worker = Worker {
            signal,
            context,
            cancel: cancel.clone(),
            active: None,
            start_pending: false,
        };
        let task = tokio::spawn(worker.run());
        Self { cancel, task }
    }

    /// Stop reacting and disconnect any active session.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                error!(error = %e, "Session bridge panicked");
            }
        }
    }
}

struct Worker {
    signal: watch::Receiver<AuthSignal>,
    context: SessionContext,
    cancel: CancellationToken,
    active: Option<UserId>,
    /// A start for `active` was abandoned and must be retried.
    start_pending: bool,
}

impl Worker {
    async fn run(mut self) {
        let mut changed = true;
        loop {
            if self.cancel.is_cancelled() {
                break;
            }
            if !changed {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    result = self.signal.changed() => {
                        if result.is_err() {
                            debug!("Auth signal closed");
                            break;
                        }
                    }
                }
            }
            let desired = self.signal.borrow_and_update().active_user().cloned();
            changed = self.apply(desired).await;
        }

        if self.active.take().is_some() {
            self.context.manager.stop().await;
            self.context.store.detach();
        }
        debug!("Session bridge stopped");
    }

    /// Move to `desired`. Returns `true` when a newer signal interrupted a
    /// start and must be applied right away.
    async fn apply(&mut self, desired: Option<UserId>) -> bool {
        if self.active == desired {
            if !self.start_pending {
                return false;
            }
        } else {
            if let Some(previous) = self.active.take() {
                info!(user_id = %previous, "Session ended; disconnecting from hub");
                self.start_pending = false;
                self.context.manager.stop().await;
                self.context.store.detach();
                if let Some(registrar) = &self.context.registrar {
                    registrar.forget();
                }
            }

            let Some(user_id) = desired else {
                return false;
            };
            info!(user_id = %user_id, "Session started; connecting to hub");
            let loaded = self.context.store.load_for_user(&user_id);
            debug!(user_id = %user_id, loaded, "Loaded notification history");
            self.active = Some(user_id);
        }

        match self.active.clone() {
            Some(user_id) => self.connect(user_id).await,
            None => false,
        }
    }

    async fn connect(&mut self, user_id: UserId) -> bool {
        self.start_pending = true;
        let interrupted = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => true,
            result = self.signal.changed() => result.is_ok(),
            result = self.context.manager.start(Arc::clone(&self.context.tokens)) => {
                if let Err(e) = result {
                    warn!(user_id = %user_id, kind = %e.kind, error = %e.message, "Hub connection not established");
                }
                false
            }
        };
        if interrupted {
            debug!(user_id = %user_id, "Auth signal changed during connect");
            return true;
        }
        self.start_pending = false;

        if let Some(registrar) = &self.context.registrar {
            match registrar.register(&user_id).await {
                Ok(true) => debug!(user_id = %user_id, "Device registration sent"),
                Ok(false) => {}
                Err(e) => warn!(user_id = %user_id, error = %e, "Device registration failed"),
            }
        }
        false
    }
}
