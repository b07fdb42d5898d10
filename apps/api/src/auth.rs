//! JWT authentication module.
//!
//! Customers arrive with an HS256 bearer token issued by the account
//! service. This module only validates it.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (customer id)
    pub sub: String,

    /// Customer e-mail, used for gateway receipts
    pub email: String,

    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Validates customer tokens.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        JwtVerifier {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Validate and decode a token.
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "JWT validation failed");
                ApiError::unauthorized("Invalid or expired token")
            })
    }
}

/// Authenticated customer, extracted from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: String,
    pub email: String,
}

impl FromRequestParts<AppState> for Customer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization format"))?;

        let claims = state.jwt.validate(token)?;
        Ok(Customer {
            id: claims.sub,
            email: claims.email,
        })
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Signs a token the way the account service does.
#[cfg(test)]
pub(crate) fn issue_token(secret: &str, customer_id: &str, email: &str, lifetime_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: customer_id.to_string(),
        email: email.to_string(),
        exp: chrono::Utc::now().timestamp() + lifetime_secs,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let token = issue_token("test-secret", "cust-1", "ada@example.com", 3600);
        let claims = JwtVerifier::new("test-secret").validate(&token).unwrap();
        assert_eq!(claims.sub, "cust-1");
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn test_wrong_secret_and_expiry() {
        let token = issue_token("other-secret", "cust-1", "ada@example.com", 3600);
        assert!(JwtVerifier::new("test-secret").validate(&token).is_err());

        let expired = issue_token("test-secret", "cust-1", "ada@example.com", -3600);
        assert!(JwtVerifier::new("test-secret").validate(&expired).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
