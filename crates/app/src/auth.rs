use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sportnexus_marketplace::Session;
use sportnexus_models::Error;
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 signing and verification with a shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn issue(&self, user_id: Uuid, ttl: Duration) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = Claims { sub: user_id.to_string(), iat: now.timestamp(), exp: (now + ttl).timestamp() };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, Error> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!("Rejected bearer token: {e}");
            Error::LoginRequired
        })?;
        Uuid::parse_str(&data.claims.sub).map_err(|_| Error::LoginRequired)
    }
}

/// The caller's session. Requests without an `Authorization` header are
/// anonymous; a header that fails verification is rejected outright.
pub struct Viewer(pub Session);

impl FromRequestParts<AppState> for Viewer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Viewer(Session::anonymous()));
        };
        let token = header
            .to_str()
            .ok()
            .and_then(|h| h.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .ok_or(Error::LoginRequired)?;
        let user_id = state.keys.verify(token)?;
        Ok(Viewer(Session::user(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_verify_with_the_same_secret_only() {
        let keys = JwtKeys::new("secret-a");
        let user = Uuid::new_v4();
        let token = keys.issue(user, Duration::hours(1)).unwrap();

        assert_eq!(keys.verify(&token).unwrap(), user);
        assert!(matches!(JwtKeys::new("secret-b").verify(&token), Err(Error::LoginRequired)));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let keys = JwtKeys::new("secret");
        let token = keys.issue(Uuid::new_v4(), Duration::hours(-2)).unwrap();
        assert!(matches!(keys.verify(&token), Err(Error::LoginRequired)));
    }
}
