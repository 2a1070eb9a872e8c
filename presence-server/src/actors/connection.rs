// presence-server/src/actors/connection.rs
use actix::{Actor, ActorContext, Addr, AsyncContext, Handler, StreamHandler};
use actix_web_actors::ws;
use common::{
    ClientEvent, Config, ConnectionId, ConnectionPhase, HeartbeatConfig, ProtocolError,
    ServerEvent, UserId,
};
use std::time::Instant;

use super::presence_hub::{Connect, Deliver, DeliverToUser, Disconnect, PresenceHub};

/// One authenticated WebSocket connection.
///
/// Built by the upgrade route in `Authenticated` and becomes `Active` once
/// it has registered with the hub. Any other starting phase stops the actor.
pub struct ConnectionActor {
    connection_id: ConnectionId,
    user_id: UserId,
    phase: ConnectionPhase,
    last_heartbeat: Instant,
    heartbeat: HeartbeatConfig,
    mailbox_capacity: usize,
    hub: Addr<PresenceHub>,
}

impl ConnectionActor {
    pub fn new(
        user_id: UserId,
        phase: ConnectionPhase,
        hub: Addr<PresenceHub>,
        config: &Config,
    ) -> Self {
        Self {
            connection_id: ConnectionId::new(),
            user_id,
            phase,
            last_heartbeat: Instant::now(),
            heartbeat: config.heartbeat.clone(),
            mailbox_capacity: config.mailbox_capacity,
            hub,
        }
    }

    // Ping the client and drop it when it stops answering
    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(self.heartbeat.interval(), |act, ctx| {
            if Instant::now().duration_since(act.last_heartbeat) > act.heartbeat.timeout() {
                tracing::warn!(
                    "Heartbeat timeout for connection {} of user {}",
                    act.connection_id,
                    act.user_id
                );
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }

    fn reply(&self, event: &ServerEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match event.encode() {
            Ok(json) => ctx.text(json),
            Err(e) => tracing::error!("Failed to serialize reply: {}", e),
        }
    }

    /// Inbound event from the client.
    fn on_message(&mut self, event: ClientEvent, _ctx: &mut ws::WebsocketContext<Self>) {
        match event {
            ClientEvent::SendMessage(outgoing) => {
                let message = outgoing.into_chat_message(self.user_id.clone());
                tracing::debug!(
                    "Relaying message from {} to {}",
                    message.sender_id,
                    message.receiver_id
                );

                let receiver_id = message.receiver_id.clone();
                let event = ServerEvent::NewMessage(message);

                if receiver_id != self.user_id {
                    self.hub.do_send(DeliverToUser {
                        user_id: receiver_id,
                        event: event.clone(),
                    });
                }
                // Every tab of the sender sees its own message, this one included.
                self.hub.do_send(DeliverToUser {
                    user_id: self.user_id.clone(),
                    event,
                });
            }
        }
    }

    /// The connection is gone. Runs for every closed connection, registered or not.
    fn on_close(&mut self) {
        if self.phase.is_closed() {
            return;
        }
        self.phase = self.phase.close();
        self.hub.do_send(Disconnect {
            connection_id: self.connection_id,
        });
    }

    fn on_protocol_error(&self, error: ProtocolError, ctx: &mut ws::WebsocketContext<Self>) {
        tracing::debug!("Rejected frame from {}: {}", self.user_id, error);
        self.reply(&ServerEvent::error(error.to_string()), ctx);
    }
}

impl Actor for ConnectionActor {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.set_mailbox_capacity(self.mailbox_capacity);

        match self.phase.activate() {
            Ok(phase) => self.phase = phase,
            Err(e) => {
                tracing::error!("Connection {} not activated: {}", self.connection_id, e);
                ctx.stop();
                return;
            }
        }

        tracing::info!("Connection {} opened for user {}", self.connection_id, self.user_id);
        self.last_heartbeat = Instant::now();
        self.start_heartbeat(ctx);

        self.hub.do_send(Connect {
            user_id: self.user_id.clone(),
            connection_id: self.connection_id,
            recipient: ctx.address().recipient(),
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("Connection {} closed for user {}", self.connection_id, self.user_id);
        self.on_close();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ConnectionActor {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!("Protocol error on connection {}: {}", self.connection_id, e);
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(payload) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            ws::Message::Pong(_) => {
                self.last_heartbeat = Instant::now();
            }
            ws::Message::Text(text) => {
                self.last_heartbeat = Instant::now();
                match ClientEvent::decode(&text) {
                    Ok(event) => self.on_message(event, ctx),
                    Err(e) => self.on_protocol_error(e, ctx),
                }
            }
            ws::Message::Binary(_) => {
                self.on_protocol_error(ProtocolError::Invalid("binary frames are not supported"), ctx);
            }
            ws::Message::Close(reason) => {
                tracing::debug!("Client closing connection {}: {:?}", self.connection_id, reason);
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Continuation(_) | ws::Message::Nop => {}
        }
    }
}

impl Handler<Deliver> for ConnectionActor {
    type Result = ();

    fn handle(&mut self, msg: Deliver, ctx: &mut Self::Context) -> Self::Result {
        if self.phase.is_active() {
            ctx.text(msg.frame.to_string());
        }
    }
}
