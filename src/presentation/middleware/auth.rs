//! Authentication
//!
//! Bearer credential resolution and JWT verification. The `AuthUser`
//! extractor runs both before any handler body, so a WebSocket upgrade is
//! refused before a duplex channel exists.

use std::collections::HashMap;

use axum::{
    extract::{FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::shared::error::{AppError, GatewayError};
use crate::startup::AppState;

/// Query parameter carrying a credential.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Cookie carrying a credential.
pub const AUTH_COOKIE: &str = "auth_token";

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Find a bearer credential on a request.
///
/// Checked in order: `Authorization: Bearer <token>`, the `token` query
/// parameter, then the `auth_token` cookie. Empty values are skipped.
pub fn resolve_token(headers: &HeaderMap, query_token: Option<&str>) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if from_header.is_some() {
        return from_header;
    }

    if let Some(token) = query_token.map(str::trim).filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Turns a credential into a user identity.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<String, GatewayError>;
}

/// HS256 JWT verifier. The `sub` claim is the user identity.
pub struct JwtVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    expiry_minutes: i64,
}

impl JwtVerifier {
    pub fn new(settings: &JwtSettings) -> Self {
        Self {
            encoding: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation: Validation::default(),
            expiry_minutes: settings.expiry_minutes,
        }
    }

    /// Mint a token for `user_id`.
    pub fn issue(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + self.expiry_minutes * 60,
            iat: now,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

impl TokenVerifier for JwtVerifier {
    fn verify(&self, token: &str) -> Result<String, GatewayError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    GatewayError::Unauthenticated("Token expired".into())
                }
                _ => GatewayError::Unauthenticated("Invalid token".into()),
            }
        })?;

        if data.claims.sub.is_empty() {
            return Err(GatewayError::Unauthenticated("Invalid token claims".into()));
        }
        Ok(data.claims.sub)
    }
}

/// Authenticated user extracted from the request credential
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let query_token = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(mut q)| q.remove(TOKEN_QUERY_PARAM));

        let token = resolve_token(&parts.headers, query_token.as_deref())
            .ok_or_else(|| AppError::Unauthorized("Missing credential".into()))?;

        let user_id = state.verifier.verify(&token).map_err(|e| {
            tracing::debug!(error = %e, "Credential rejected");
            AppError::from(e)
        })?;

        Ok(AuthUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};
    use test_case::test_case;

    fn headers(authorization: Option<&str>, cookie: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = authorization {
            headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        if let Some(value) = cookie {
            headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    fn verifier() -> JwtVerifier {
        JwtVerifier::new(&JwtSettings {
            secret: "a-test-secret-that-is-long-enough-for-hs256".into(),
            expiry_minutes: 60,
        })
    }

    #[test_case(Some("Bearer h"), Some("q"), Some("auth_token=c"), Some("h") ; "header wins")]
    #[test_case(None, Some("q"), Some("auth_token=c"), Some("q") ; "query before cookie")]
    #[test_case(None, None, Some("theme=dark; auth_token=c"), Some("c") ; "cookie last")]
    #[test_case(Some("Bearer "), Some(""), Some("auth_token=c"), Some("c") ; "empty values skipped")]
    #[test_case(Some("Basic abc"), None, None, None ; "non bearer scheme ignored")]
    #[test_case(None, None, None, None ; "nothing present")]
    fn test_resolve_token(
        authorization: Option<&str>,
        query: Option<&str>,
        cookie: Option<&str>,
        expected: Option<&str>,
    ) {
        let resolved = resolve_token(&headers(authorization, cookie), query);
        assert_eq!(resolved.as_deref(), expected);
    }

    #[test]
    fn test_issued_token_verifies_to_subject() {
        let verifier = verifier();
        let token = verifier.issue("u1").unwrap();
        assert_eq!(verifier.verify(&token).unwrap(), "u1");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let verifier = verifier();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "u1".into(),
            exp: now - 3600,
            iat: now - 7200,
        };
        let token = encode(&Header::default(), &claims, &verifier.encoding).unwrap();

        assert!(matches!(
            verifier.verify(&token),
            Err(GatewayError::Unauthenticated(msg)) if msg == "Token expired"
        ));
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let other = JwtVerifier::new(&JwtSettings {
            secret: "another-secret-that-is-also-long-enough".into(),
            expiry_minutes: 60,
        });
        let token = other.issue("u1").unwrap();

        assert!(verifier().verify(&token).is_err());
        assert!(verifier().verify("not.a.jwt").is_err());
    }
}
