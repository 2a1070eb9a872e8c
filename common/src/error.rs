// common/src/error.rs
use thiserror::Error;

use crate::models::connection::ConnectionPhase;

/// Why a connection attempt could not be bound to a user.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingCredential,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token carries an empty user id")]
    InvalidSubject,
    #[error("origin {0} is not allowed")]
    OriginNotAllowed(String),
}

/// Per-connection send failure. Never surfaced to the caller of a fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("connection mailbox is closed")]
    Closed,
    #[error("connection mailbox is full")]
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("cannot {event} a connection in phase {from:?}")]
    IllegalTransition {
        from: ConnectionPhase,
        event: &'static str,
    },
}

/// An inbound frame that could not be turned into a client event.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(&'static str),
}
