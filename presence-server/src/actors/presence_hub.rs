// presence-server/src/actors/presence_hub.rs
use actix::prelude::*;
use common::{ConnectionId, DeliveryError, ServerEvent, UserId};
use std::time::Duration;

use crate::presence::{EventSink, Frame, PresenceService};

// How often the hub logs its occupancy
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Encoded event pushed into a connection actor
#[derive(Message)]
#[rtype(result = "()")]
pub struct Deliver {
    pub frame: Frame,
}

impl EventSink for Recipient<Deliver> {
    fn try_deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        self.try_send(Deliver { frame }).map_err(|e| match e {
            SendError::Full(_) => DeliveryError::Full,
            SendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// An authenticated connection became active
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub user_id: UserId,
    pub connection_id: ConnectionId,
    pub recipient: Recipient<Deliver>,
}

/// A connection closed. Safe to send more than once.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub connection_id: ConnectionId,
}

/// Push an event to every connection of one user. Resolves to the number
/// of connections that accepted it.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct DeliverToUser {
    pub user_id: UserId,
    pub event: ServerEvent,
}

#[derive(Message)]
#[rtype(result = "bool")]
pub struct IsOnline {
    pub user_id: UserId,
}

#[derive(Message)]
#[rtype(result = "Vec<UserId>")]
pub struct GetOnlineUsers;

#[derive(Message)]
#[rtype(result = "Vec<ConnectionId>")]
pub struct ConnectionsFor {
    pub user_id: UserId,
}

/// Single owner of the presence registry.
///
/// The mailbox serialises every connect, disconnect and delivery, so each
/// broadcast reflects one consistent point in time.
#[derive(Default)]
pub struct PresenceHub {
    service: PresenceService<Recipient<Deliver>>,
}

impl PresenceHub {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for PresenceHub {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("PresenceHub started");

        ctx.run_interval(STATS_INTERVAL, |act, _ctx| {
            tracing::debug!(
                "Presence: {} users online over {} connections",
                act.service.user_count(),
                act.service.connection_count()
            );
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(
            "PresenceHub stopped with {} live connections",
            self.service.connection_count()
        );
    }
}

impl Handler<Connect> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) -> Self::Result {
        self.service.connect(msg.user_id, msg.connection_id, msg.recipient);
    }
}

impl Handler<Disconnect> for PresenceHub {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _ctx: &mut Self::Context) -> Self::Result {
        self.service.disconnect(msg.connection_id);
    }
}

impl Handler<DeliverToUser> for PresenceHub {
    type Result = usize;

    fn handle(&mut self, msg: DeliverToUser, _ctx: &mut Self::Context) -> Self::Result {
        self.service.deliver_to_user(&msg.user_id, &msg.event)
    }
}

impl Handler<IsOnline> for PresenceHub {
    type Result = bool;

    fn handle(&mut self, msg: IsOnline, _ctx: &mut Self::Context) -> Self::Result {
        self.service.is_online(&msg.user_id)
    }
}

impl Handler<GetOnlineUsers> for PresenceHub {
    type Result = MessageResult<GetOnlineUsers>;

    fn handle(&mut self, _msg: GetOnlineUsers, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.service.online_user_ids())
    }
}

impl Handler<ConnectionsFor> for PresenceHub {
    type Result = MessageResult<ConnectionsFor>;

    fn handle(&mut self, msg: ConnectionsFor, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.service.handles_for(&msg.user_id))
    }
}
