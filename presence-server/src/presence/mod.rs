// presence-server/src/presence/mod.rs
//
// Transport-independent presence core. The actor layer plugs actix
// recipients in as sinks; tests plug in recording sinks.

pub mod gateway;
pub mod publisher;
pub mod registry;
pub mod service;

use common::DeliveryError;
use std::sync::Arc;

pub use registry::{ChangeKind, ConnectionRegistry, PresenceChange};
pub use service::PresenceService;

/// An encoded text frame, shared by every connection in a fan-out.
pub type Frame = Arc<str>;

/// Outbound side of one connection.
///
/// Must not block: a slow or dead connection reports an error instead of
/// stalling the caller.
pub trait EventSink {
    fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError>;
}

/// Result of sending one frame to a set of connections.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOut {
    pub delivered: usize,
    /// Connections whose mailbox is gone; they should be unregistered.
    pub closed: Vec<common::ConnectionId>,
}
