// presence-server/src/routing.rs
use actix::Addr;
use actix_web::{error, get, web, Error, HttpRequest, HttpResponse, Responder};
use actix_web_actors::ws;
use common::{Config, ConnectionPhase};
use serde_json::json;

use crate::actors::connection::ConnectionActor;
use crate::actors::presence_hub::PresenceHub;
use crate::api;
use crate::auth::{check_origin, extract_credential, IdentityVerifier};

/// Configure routes for the presence server
pub fn routes(cfg: &mut web::ServiceConfig, allowed_origins: &[String]) {
    cfg.service(index)
        .service(web::resource("/ws").route(web::get().to(chat_ws_route)));
    api::configure(cfg, allowed_origins);
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Chat presence server",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// WebSocket route for chat clients.
///
/// Origin and credential are checked before the upgrade: a rejected attempt
/// never starts a connection actor and so never reaches the presence hub.
async fn chat_ws_route(
    req: HttpRequest,
    stream: web::Payload,
    hub: web::Data<Addr<PresenceHub>>,
    verifier: web::Data<dyn IdentityVerifier>,
    config: web::Data<Config>,
) -> Result<HttpResponse, Error> {
    if let Err(e) = check_origin(&req, &config) {
        tracing::warn!("Rejected WebSocket connection: {}", e);
        return Ok(HttpResponse::Forbidden().json(json!({
            "message": "Forbidden"
        })));
    }

    let verified = extract_credential(&req, &config.jwt_cookie_name)
        .and_then(|credential| verifier.verify(&credential));

    let user_id = match verified {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!("Rejected WebSocket connection: {}", e);
            return Ok(HttpResponse::Unauthorized().json(json!({
                "message": "Unauthorized"
            })));
        }
    };

    let phase = ConnectionPhase::Connecting
        .authenticate()
        .map_err(error::ErrorInternalServerError)?;

    let connection = ConnectionActor::new(user_id, phase, hub.get_ref().clone(), &config);
    ws::start(connection, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtVerifier;
    use actix::Actor;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use common::{generate_jwt_token, UserId, TOKEN_TTL};
    use std::sync::Arc;

    const SECRET: &str = "routing-secret";

    fn token_for(user: &str) -> String {
        generate_jwt_token(&UserId::from(user), SECRET.as_bytes(), TOKEN_TTL).unwrap()
    }

    macro_rules! test_app {
        ($hub:expr) => {{
            let config = Config::default();
            let origins = config.allowed_origins.clone();
            let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwtVerifier::new(SECRET));
            test::init_service(
                App::new()
                    .app_data(web::Data::new(config))
                    .app_data(web::Data::new($hub))
                    .app_data(web::Data::from(verifier))
                    .configure(|cfg| routes(cfg, &origins)),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn test_foreign_origin_is_forbidden_even_with_valid_cookie() {
        let hub = PresenceHub::new().start();
        let app = test_app!(hub.clone());

        let req = test::TestRequest::get()
            .uri("/ws")
            .insert_header((header::ORIGIN, "https://evil.example"))
            .insert_header((header::COOKIE, format!("jwt={}", token_for("victim"))))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let online = hub.send(crate::actors::presence_hub::GetOnlineUsers).await.unwrap();
        assert!(online.is_empty());
    }

    #[actix_web::test]
    async fn test_allowed_origin_without_credential_is_unauthorized() {
        let app = test_app!(PresenceHub::new().start());

        let req = test::TestRequest::get()
            .uri("/ws")
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_presence_api_answers_allowed_origin_only() {
        let app = test_app!(PresenceHub::new().start());

        let req = test::TestRequest::get()
            .uri("/api/presence/online")
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );

        let req = test::TestRequest::get()
            .uri("/api/presence/online")
            .insert_header((header::ORIGIN, "https://evil.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(!resp.status().is_success());
        assert!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
