//! Bearer-token authentication.
//!
//! Stateless HS256 tokens; the subject claim becomes the owner id that
//! scopes every offer and scoring result.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::config::Settings;
use shared::error::AppError;
use std::future::{ready, Ready};

const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

pub fn issue_token(secret: &str, user_id: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + TOKEN_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Unauthorized(format!("failed to issue token: {e}")))
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

/// Authenticated caller, extracted from the Authorization header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_user(req))
    }
}

fn extract_user(req: &HttpRequest) -> Result<AuthUser, AppError> {
    let settings = req
        .app_data::<web::Data<Settings>>()
        .ok_or_else(|| AppError::Unauthorized("Authentication not configured".into()))?;
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Expected a Bearer token".into()))?;
    let claims = verify_token(&settings.jwt_secret, token)?;
    Ok(AuthUser {
        user_id: claims.sub,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn settings() -> Settings {
        Settings {
            jwt_secret: "test-secret".into(),
            ..Default::default()
        }
    }

    #[test]
    fn round_trips_subject() {
        let token = issue_token("s3cret", "user-42").unwrap();
        let claims = verify_token("s3cret", &token).unwrap();
        assert_eq!(claims.sub, "user-42");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("s3cret", "user-42").unwrap();
        assert!(verify_token("other", &token).is_err());
    }

    #[actix_web::test]
    async fn extractor_accepts_valid_bearer_token() {
        let cfg = settings();
        let token = issue_token(&cfg.jwt_secret, "user-7").unwrap();
        let req = TestRequest::default()
            .app_data(web::Data::new(cfg))
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request();
        let user = extract_user(&req).unwrap();
        assert_eq!(user.user_id, "user-7");
    }

    #[actix_web::test]
    async fn extractor_rejects_missing_and_malformed_headers() {
        let cfg = settings();
        let req = TestRequest::default()
            .app_data(web::Data::new(cfg.clone()))
            .to_http_request();
        assert!(extract_user(&req).is_err());

        let req = TestRequest::default()
            .app_data(web::Data::new(cfg))
            .insert_header(("Authorization", "Basic abc"))
            .to_http_request();
        assert!(extract_user(&req).is_err());
    }
}
