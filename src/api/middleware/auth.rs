use actix_web::dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use anyhow::{Context as AnyhowContext, Result};
use chrono::{Duration, Utc};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Mint a bearer token for a user id. The identity provider lives outside
/// this service; this exists for operators and tests.
pub fn issue_token(user_id: Uuid, secret: &str, expiry_hours: i64) -> Result<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(expiry_hours))
        .context("Token expiry out of range")?;

    let claims = TokenClaims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode JWT")
}

fn decode_token(token: &str, secret: &str) -> Result<TokenClaims, ApiError> {
    decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("Invalid or expired token.".to_string()))
}

/// The authenticated caller, extracted from the claims the middleware stored
/// in request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<TokenClaims>().cloned();

        ready(match claims {
            Some(claims) => Uuid::parse_str(&claims.sub)
                .map(|user_id| AuthUser { user_id })
                .map_err(|_| {
                    ApiError::Unauthorized("Invalid token subject.".to_string()).into()
                }),
            None => Err(ApiError::Unauthorized(
                "Authentication credentials were not provided.".to_string(),
            )
            .into()),
        })
    }
}

pub struct AuthenticationMiddleware {
    jwt_secret: String,
}

impl AuthenticationMiddleware {
    pub fn new(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthenticationMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddlewareService {
            service,
            jwt_secret: self.jwt_secret.clone(),
        }))
    }
}

pub struct AuthenticationMiddlewareService<S> {
    service: S,
    jwt_secret: String,
}

impl<S, B> Service<ServiceRequest> for AuthenticationMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // The health probe is the only unauthenticated route.
        if req.path() == "/health" {
            return Box::pin(self.service.call(req));
        }

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let token = match header {
            Some(value) if value.starts_with("Bearer ") => value["Bearer ".len()..].to_string(),
            Some(_) => {
                return Box::pin(ready(Err(ApiError::Unauthorized(
                    "Invalid Authorization header format.".to_string(),
                )
                .into())))
            }
            None => {
                return Box::pin(ready(Err(ApiError::Unauthorized(
                    "Authentication credentials were not provided.".to_string(),
                )
                .into())))
            }
        };

        match decode_token(&token, &self.jwt_secret) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                Box::pin(self.service.call(req))
            }
            Err(err) => Box::pin(ready(Err(err.into()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_issue_and_decode_round_trip() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, SECRET, 1).unwrap();
        let claims = decode_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = issue_token(Uuid::new_v4(), SECRET, 1).unwrap();
        assert!(decode_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Well past the default validation leeway.
        let token = issue_token(Uuid::new_v4(), SECRET, -2).unwrap();
        assert!(decode_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(decode_token("not.a.jwt", SECRET).is_err());
    }

    #[actix_web::test]
    async fn test_auth_user_requires_claims() {
        let req = TestRequest::default().to_http_request();
        let result = AuthUser::extract(&req).await;
        assert!(result.is_err());
    }

    #[actix_web::test]
    async fn test_auth_user_reads_claims() {
        let user_id = Uuid::new_v4();
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(TokenClaims {
            sub: user_id.to_string(),
            exp: 0,
            iat: 0,
        });

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, user_id);
    }
}
