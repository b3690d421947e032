//! JWT-backed identity provider.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{IdentityProvider, Principal, UserSummary};
use crate::db::{DbPool, UserRepository};
use crate::{NimbusError, Result};

/// JWT claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: i64,
    /// Issued at timestamp.
    pub iat: u64,
    /// Expiration timestamp.
    pub exp: u64,
    /// JWT ID (unique identifier).
    pub jti: String,
}

/// Identity provider that accepts HS256 bearer tokens and looks users up in
/// the `users` table.
#[derive(Clone)]
pub struct JwtIdentityProvider {
    pool: DbPool,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_expiry_secs: u64,
}

impl JwtIdentityProvider {
    /// Create a provider from a shared secret.
    pub fn new(pool: DbPool, secret: &str, token_expiry_secs: u64) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            pool,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            token_expiry_secs,
        }
    }

    /// Issue an access token for a user.
    pub fn issue_token(&self, user_id: i64) -> Result<String> {
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.token_expiry_secs,
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| NimbusError::Auth(format!("failed to sign token: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve_principal(&self, credential: &str) -> Result<Option<Principal>> {
        let data = match decode::<Claims>(credential, &self.decoding_key, &self.validation) {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("JWT validation failed: {}", e);
                return Ok(None);
            }
        };

        // A token for a deleted account no longer identifies anyone
        if !self.user_exists(data.claims.sub).await? {
            return Ok(None);
        }

        Ok(Some(Principal::new(data.claims.sub)))
    }

    async fn user_exists(&self, user_id: i64) -> Result<bool> {
        UserRepository::new(&self.pool).exists(user_id).await
    }

    async fn describe_user(&self, user_id: i64) -> Result<Option<UserSummary>> {
        let user = UserRepository::new(&self.pool).get_by_id(user_id).await?;
        Ok(user.map(UserSummary::from))
    }
}
