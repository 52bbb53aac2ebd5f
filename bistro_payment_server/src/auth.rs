//! Bearer-token authentication.
//!
//! The server consumes principals as opaque JWTs issued by the identity collaborator; it never
//! stores users itself. A token carries `{sub, email, name?, role, exp}` and is validated with
//! the shared HS256 secret. Two extractors are provided: [`JwtClaims`] (the route fails without a
//! valid token) and [`OptionalClaims`] (an invalid or absent token degrades to `None`, which is
//! what lets an expired session still place a cash order as a guest; it never upgrades
//! privilege, it only removes it).

use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpMessage, HttpRequest};
use bistro_order_engine::db_types::Role;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const AUTH_HEADER: &str = "Authorization";
const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The user id at the identity collaborator.
    pub sub: i64,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
    /// Expiry, unix seconds. Enforced by the JWT library during validation.
    pub exp: i64,
}

pub fn decode_bearer_token(header_value: &str, config: &AuthConfig) -> Result<JwtClaims, AuthError> {
    let token = header_value
        .strip_prefix(BEARER_PREFIX)
        .ok_or_else(|| AuthError::PoorlyFormattedToken("expected a Bearer token".to_string()))?;
    let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
    let data = decode::<JwtClaims>(token.trim(), &key, &Validation::new(Algorithm::HS256))
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;
    Ok(data.claims)
}

pub(crate) fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    // The ACL middleware validates tokens on the routes it guards and leaves the claims in the
    // request extensions; unguarded routes fall through to decoding the header here.
    if let Some(claims) = req.extensions().get::<JwtClaims>() {
        return Ok(claims.clone());
    }
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| ServerError::InitializeError("Auth configuration is not registered".to_string()))?;
    let header = req
        .headers()
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ServerError::CouldNotDeserializeAuthToken)?;
    let claims = decode_bearer_token(header, config).map_err(|e| {
        debug!("💻️ Could not validate access token. {e}");
        ServerError::AuthenticationError(e)
    })?;
    Ok(claims)
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

/// An extractor that never fails: `Some` when the caller presented a valid token, `None`
/// otherwise (including invalid and expired tokens).
pub struct OptionalClaims(pub Option<JwtClaims>);

impl FromRequest for OptionalClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(OptionalClaims(claims_from_request(req).ok())))
    }
}

/// Signs access tokens. The identity collaborator is the production issuer; this exists for
/// operational tooling and tests, using the same shared secret.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    token_lifetime: chrono::Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { encoding_key, token_lifetime: config.token_lifetime }
    }

    pub fn issue_token(
        &self,
        user_id: i64,
        email: &str,
        name: Option<&str>,
        role: Role,
    ) -> Result<String, AuthError> {
        let exp = (Utc::now() + self.token_lifetime).timestamp();
        let claims =
            JwtClaims { sub: user_id, email: email.to_string(), name: name.map(String::from), role, exp };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}
