//! Inbound authentication signal.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Authentication state published by the host application.
///
/// Transitions of this value are the only trigger for connecting to or
/// disconnecting from the hub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSignal {
    /// Whether a user is currently signed in.
    pub authenticated: bool,
    /// The signed-in user.
    pub user_id: Option<UserId>,
}

impl AuthSignal {
    /// A signed-in user.
    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id.into()),
        }
    }

    /// No user signed in.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// The active user, if authenticated.
    pub fn active_user(&self) -> Option<&UserId> {
        if self.authenticated {
            self.user_id.as_ref()
        } else {
            None
        }
    }
}
