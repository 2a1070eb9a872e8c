// presence-server/src/presence/publisher.rs
use common::{ConnectionId, DeliveryError, ServerEvent};

use super::{ConnectionRegistry, EventSink, FanOut, Frame};

/// Serialise an event once for a whole fan-out.
pub fn encode(event: &ServerEvent) -> Option<Frame> {
    match event.encode() {
        Ok(json) => Some(Frame::from(json)),
        Err(e) => {
            tracing::error!("Failed to serialize server event: {}", e);
            None
        }
    }
}

/// Send `frame` to every target independently. One failing connection never
/// prevents delivery to the rest.
pub fn fan_out<'a, S, I>(targets: I, frame: &Frame) -> FanOut
where
    S: EventSink + 'a,
    I: IntoIterator<Item = (ConnectionId, &'a S)>,
{
    let mut result = FanOut::default();

    for (connection_id, sink) in targets {
        match sink.try_deliver(frame.clone()) {
            Ok(()) => result.delivered += 1,
            Err(DeliveryError::Closed) => {
                tracing::debug!("Connection {} is closed, scheduling removal", connection_id);
                result.closed.push(connection_id);
            }
            Err(DeliveryError::Full) => {
                tracing::warn!("Connection {} is not keeping up, event dropped", connection_id);
            }
        }
    }

    result
}

/// Push the current online roster to every registered connection.
pub fn broadcast_online_users<S: EventSink>(registry: &ConnectionRegistry<S>) -> FanOut {
    let online = registry.online_user_ids();
    let Some(frame) = encode(&ServerEvent::GetOnlineUsers(online)) else {
        return FanOut::default();
    };

    let result = fan_out(registry.all_sinks(), &frame);
    tracing::debug!(
        "Broadcast online users ({} online) to {} connections",
        registry.user_count(),
        result.delivered
    );
    result
}
