// common/src/models/connection.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::LifecycleError;

/// Stable identifier of an authenticated chat user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Handle of one live WebSocket connection (one device or tab).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of a single connection.
///
/// `Connecting -> Authenticated -> Active -> Closed`, or straight from
/// `Connecting` to `Closed` when the credential is rejected. `Closed` is
/// reachable from every phase and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Authenticated,
    Active,
    Closed,
}

impl ConnectionPhase {
    /// The identity verifier accepted the connection.
    pub fn authenticate(self) -> Result<Self, LifecycleError> {
        match self {
            Self::Connecting => Ok(Self::Authenticated),
            from => Err(LifecycleError::IllegalTransition { from, event: "authenticate" }),
        }
    }

    /// The connection was registered with the presence hub.
    pub fn activate(self) -> Result<Self, LifecycleError> {
        match self {
            Self::Authenticated => Ok(Self::Active),
            from => Err(LifecycleError::IllegalTransition { from, event: "activate" }),
        }
    }

    pub fn close(self) -> Self {
        Self::Closed
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}
