//! Signed token issuance and decoding.
//!
//! Tokens are JWTs (HS256) carrying `sub`, `scopes`, `iat`, `exp`. The issuer
//! is stateless: everything is a function of configuration and the clock.
//! There is no revocation list here; session revocation belongs to the
//! external session registry.

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::services::AuthError;
use crate::utils::Clock;

pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Claims carried by every token this service signs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,
    /// Scope tags restricting what the bearer may do (e.g. "admin")
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Set to "refresh" on refresh tokens, absent on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl TokenClaims {
    pub fn is_refresh(&self) -> bool {
        self.typ.as_deref() == Some(REFRESH_TOKEN_TYPE)
    }

    pub fn subject_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenInvalid)
    }
}

/// Token pair returned to the client after successful authentication.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[schema(example = "bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    extended_access_ttl: Duration,
    extended_refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_ttl_minutes),
            refresh_ttl: Duration::minutes(config.refresh_token_ttl_minutes),
            extended_access_ttl: Duration::minutes(config.extended_access_ttl_minutes),
            extended_refresh_ttl: Duration::minutes(config.extended_refresh_ttl_minutes),
            clock,
        }
    }

    /// Issue an access/refresh token pair. `remember_me` selects the extended
    /// TTL pair from configuration.
    pub fn issue(
        &self,
        subject: Uuid,
        scopes: &[String],
        remember_me: bool,
    ) -> Result<TokenPair, AuthError> {
        let (access_ttl, refresh_ttl) = if remember_me {
            (self.extended_access_ttl, self.extended_refresh_ttl)
        } else {
            (self.access_ttl, self.refresh_ttl)
        };

        let now = self.clock.now();

        let access_claims = TokenClaims {
            sub: subject.to_string(),
            scopes: scopes.to_vec(),
            iat: now.timestamp(),
            exp: (now + access_ttl).timestamp(),
            typ: None,
        };

        let refresh_claims = TokenClaims {
            sub: subject.to_string(),
            scopes: scopes.to_vec(),
            iat: now.timestamp(),
            exp: (now + refresh_ttl).timestamp(),
            typ: Some(REFRESH_TOKEN_TYPE.to_string()),
        };

        let header = Header::new(Algorithm::HS256);
        let access_token = encode(&header, &access_claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))?;
        let refresh_token = encode(&header, &refresh_claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode refresh token: {}", e))?;

        Ok(TokenPair {
            access_token,
            refresh_token: Some(refresh_token),
            token_type: "bearer".to_string(),
            expires_in: access_ttl.num_seconds(),
        })
    }

    /// Decode and verify a token.
    ///
    /// Signature or structural problems fail with `TokenInvalid`; a good
    /// signature past its `exp` fails with `TokenExpired`. Expiry is judged
    /// against the injected clock with no grace period.
    pub fn decode(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock, not system time.
        validation.validate_exp = false;

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| AuthError::TokenInvalid)?;

        if self.clock.now().timestamp() > token_data.claims.exp {
            return Err(AuthError::TokenExpired);
        }

        Ok(token_data.claims)
    }

    /// Access token lifetime in seconds, as reported to clients.
    pub fn access_ttl_seconds(&self, remember_me: bool) -> i64 {
        if remember_me {
            self.extended_access_ttl.num_seconds()
        } else {
            self.access_ttl.num_seconds()
        }
    }
}
