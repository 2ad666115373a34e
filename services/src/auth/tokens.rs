// services/src/auth/tokens.rs
//! Stateless HS256 bearer tokens. Three base64url segments
//! (header.claims.signature) signed with HMAC-SHA256; the server keeps no
//! session state, every request is authenticated from the token alone.
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use models::errors::{ApiError, ApiResult};
use models::medical::user::{Role, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated user.
    pub sub: String,
    pub uid: i64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        TokenService {
            secret: secret.as_bytes().to_vec(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn mint(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.username.clone(),
            uid: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> ApiResult<String> {
        let header = TokenHeader {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        };
        let header_json = serde_json::to_string(&header)
            .map_err(|e| ApiError::internal(format!("Failed to serialize header: {}", e)))?;
        let claims_json = serde_json::to_string(claims)
            .map_err(|e| ApiError::internal(format!("Failed to serialize claims: {}", e)))?;

        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json.as_bytes()),
            URL_SAFE_NO_PAD.encode(claims_json.as_bytes())
        );

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ApiError::internal(format!("Failed to create HMAC: {}", e)))?;
        mac.update(message.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{}.{}", message, URL_SAFE_NO_PAD.encode(signature)))
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(ApiError::unauthorized("Invalid token format"));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|_| ApiError::unauthorized("Invalid token signature"))?;

        let message = format!("{}.{}", parts[0], parts[1]);
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ApiError::internal(format!("Failed to create HMAC: {}", e)))?;
        mac.update(message.as_bytes());
        // constant-time comparison
        mac.verify_slice(&signature)
            .map_err(|_| ApiError::unauthorized("Invalid token signature"))?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| ApiError::unauthorized("Invalid token claims encoding"))?;
        let claims: Claims = serde_json::from_slice(&claims_json)
            .map_err(|_| ApiError::unauthorized("Invalid token claims"))?;

        if claims.exp < Utc::now().timestamp() {
            return Err(ApiError::unauthorized("Token has expired"));
        }

        Ok(claims)
    }
}
