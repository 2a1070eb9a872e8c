// presence-server/src/api/mod.rs
use actix_cors::Cors;
use actix_web::{http::header, web};

pub mod presence;

// Same allow-list as the WebSocket upgrade; the chat frontend sends cookies.
fn cors(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods(vec!["GET", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE])
        .supports_credentials()
        .max_age(3600)
}

pub fn configure(cfg: &mut web::ServiceConfig, allowed_origins: &[String]) {
    cfg.service(
        web::scope("/api/presence")
            .wrap(cors(allowed_origins))
            .service(presence::online_users)
            .service(presence::user_presence),
    );
}
