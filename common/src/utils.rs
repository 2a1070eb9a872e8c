// common/src/utils.rs
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::error::AuthError;
use crate::models::connection::UserId;

/// Lifetime of tokens issued by the chat API at login.
pub const TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Setup tracing for the whole process. Unknown levels fall back to INFO.
pub fn setup_tracing(log_level: &str) {
    let level = Level::from_str(log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

// JWT Claims structure shared with the chat API
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub exp: usize, // expiration time
    pub iat: usize, // issued at time
}

fn unix_now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as usize
}

// Sign a token for user_id, valid for ttl
pub fn generate_jwt_token(
    user_id: &UserId,
    secret: &[u8],
    ttl: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = unix_now();
    let claims = JwtClaims {
        user_id: user_id.to_string(),
        iat: now,
        exp: now + ttl.as_secs() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

// Validate token and extract the user it was issued to
pub fn validate_jwt_token(token: &str, secret: &[u8]) -> Result<UserId, AuthError> {
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<JwtClaims>(token, &DecodingKey::from_secret(secret), &validation)?;

    if token_data.claims.user_id.trim().is_empty() {
        return Err(AuthError::InvalidSubject);
    }

    Ok(UserId::from(token_data.claims.user_id))
}
