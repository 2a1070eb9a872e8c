// presence-server/src/api/presence.rs
use actix::Addr;
use actix_web::{get, web, HttpResponse, Responder};
use common::UserId;
use serde::Serialize;
use serde_json::json;

use crate::actors::presence_hub::{ConnectionsFor, GetOnlineUsers, PresenceHub};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresenceResponse {
    pub user_id: UserId,
    pub online: bool,
    pub connections: usize,
}

fn hub_unavailable(e: actix::MailboxError) -> HttpResponse {
    tracing::error!("Presence hub unavailable: {}", e);
    HttpResponse::InternalServerError().json(json!({
        "message": "Internal Server Error"
    }))
}

// Everyone currently online
#[get("/online")]
pub async fn online_users(hub: web::Data<Addr<PresenceHub>>) -> impl Responder {
    match hub.send(GetOnlineUsers).await {
        Ok(online) => HttpResponse::Ok().json(json!({ "online": online })),
        Err(e) => hub_unavailable(e),
    }
}

// Presence of a single user
#[get("/{user_id}")]
pub async fn user_presence(
    path: web::Path<(String,)>,
    hub: web::Data<Addr<PresenceHub>>,
) -> impl Responder {
    let user_id = UserId::from(path.into_inner().0);

    match hub.send(ConnectionsFor { user_id: user_id.clone() }).await {
        Ok(connections) => HttpResponse::Ok().json(UserPresenceResponse {
            user_id,
            online: !connections.is_empty(),
            connections: connections.len(),
        }),
        Err(e) => hub_unavailable(e),
    }
}
