// presence-server/src/lib.rs
pub mod actors;
pub mod api;
pub mod auth;
pub mod presence;
pub mod routing;

use actix::Actor;
use actix_web::{dev::Server, web, App, HttpServer};
use common::Config;
use std::net::TcpListener;
use std::sync::Arc;

use actors::presence_hub::PresenceHub;
use auth::{IdentityVerifier, JwtVerifier};

/// Start the presence hub and an HTTP server on `listener`.
///
/// Must be called from inside a running actix system.
pub fn serve(config: Config, listener: TcpListener) -> std::io::Result<Server> {
    let hub = PresenceHub::new().start();
    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(JwtVerifier::new(config.jwt_secret.as_bytes()));

    let allowed_origins = config.allowed_origins.clone();
    let config_data = web::Data::new(config);
    let hub_data = web::Data::new(hub);
    let verifier_data = web::Data::from(verifier);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(config_data.clone())
            .app_data(hub_data.clone())
            .app_data(verifier_data.clone())
            .configure(|cfg| routing::routes(cfg, &allowed_origins))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
