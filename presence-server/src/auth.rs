// presence-server/src/auth.rs
use actix_web::{http::header, web, HttpRequest};
use common::{validate_jwt_token, AuthError, Config, UserId};
use serde::Deserialize;

/// Turns the credential presented on an upgrade request into a user.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<UserId, AuthError>;
}

/// Accepts HS256 tokens issued by the chat API at login.
pub struct JwtVerifier {
    secret: Vec<u8>,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, credential: &str) -> Result<UserId, AuthError> {
        validate_jwt_token(credential, &self.secret)
    }
}

/// Reject upgrades sent by pages outside the allow-list.
///
/// Browsers always attach `Origin` to a WebSocket handshake, so a request
/// without one is not riding on a user's cookie and is let through.
pub fn check_origin(req: &HttpRequest, config: &Config) -> Result<(), AuthError> {
    let Some(origin) = req.headers().get(header::ORIGIN) else {
        return Ok(());
    };

    match origin.to_str() {
        Ok(origin) if config.is_origin_allowed(origin) => Ok(()),
        Ok(origin) => Err(AuthError::OriginNotAllowed(origin.to_string())),
        Err(_) => Err(AuthError::OriginNotAllowed("<non-ascii>".to_string())),
    }
}

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Find the credential on a request: bearer header, then cookie, then `?token=`.
pub fn extract_credential(req: &HttpRequest, cookie_name: &str) -> Result<String, AuthError> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Ok(token.to_string());
    }

    if let Some(cookie) = req.cookie(cookie_name) {
        if !cookie.value().is_empty() {
            return Ok(cookie.value().to_string());
        }
    }

    web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|query| query.into_inner().token)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingCredential)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;
    use common::{generate_jwt_token, TOKEN_TTL};

    #[test]
    fn test_bearer_header_wins() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer from-header"))
            .cookie(Cookie::new("jwt", "from-cookie"))
            .uri("/ws?token=from-query")
            .to_http_request();
        assert_eq!(extract_credential(&req, "jwt").unwrap(), "from-header");
    }

    #[test]
    fn test_cookie_before_query() {
        let req = TestRequest::default()
            .cookie(Cookie::new("jwt", "from-cookie"))
            .uri("/ws?token=from-query")
            .to_http_request();
        assert_eq!(extract_credential(&req, "jwt").unwrap(), "from-cookie");
    }

    #[test]
    fn test_query_token() {
        let req = TestRequest::default().uri("/ws?token=abc").to_http_request();
        assert_eq!(extract_credential(&req, "jwt").unwrap(), "abc");
    }

    #[test]
    fn test_missing_credential() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Basic dXNlcg=="))
            .uri("/ws?token=")
            .to_http_request();
        assert!(matches!(
            extract_credential(&req, "jwt"),
            Err(AuthError::MissingCredential)
        ));
    }

    #[test]
    fn test_origin_allow_list() {
        let config = Config::default();

        let allowed = TestRequest::default()
            .insert_header((header::ORIGIN, "http://localhost:5173"))
            .to_http_request();
        assert!(check_origin(&allowed, &config).is_ok());

        let no_origin = TestRequest::default().to_http_request();
        assert!(check_origin(&no_origin, &config).is_ok());

        let foreign = TestRequest::default()
            .insert_header((header::ORIGIN, "https://evil.example"))
            .cookie(Cookie::new("jwt", "victim-token"))
            .to_http_request();
        assert!(matches!(
            check_origin(&foreign, &config),
            Err(AuthError::OriginNotAllowed(origin)) if origin == "https://evil.example"
        ));
    }

    #[test]
    fn test_jwt_verifier() {
        let verifier = JwtVerifier::new("secret");
        let token = generate_jwt_token(&UserId::from("alice"), b"secret", TOKEN_TTL).unwrap();
        assert_eq!(verifier.verify(&token).unwrap(), UserId::from("alice"));
        assert!(verifier.verify("garbage").is_err());
    }
}
