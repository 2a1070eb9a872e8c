// presence-server/src/presence/gateway.rs
use common::{ServerEvent, UserId};

use super::publisher::{encode, fan_out};
use super::{ConnectionRegistry, EventSink, FanOut};

/// Deliver `event` to every live connection of `user_id`.
///
/// An offline user is not an error; the caller owns any offline fallback.
pub fn deliver_to_user<S: EventSink>(
    registry: &ConnectionRegistry<S>,
    user_id: &UserId,
    event: &ServerEvent,
) -> FanOut {
    if !registry.is_online(user_id) {
        tracing::debug!("User {} is offline, nothing delivered", user_id);
        return FanOut::default();
    }

    match encode(event) {
        Some(frame) => fan_out(registry.sinks_for(user_id), &frame),
        None => FanOut::default(),
    }
}
