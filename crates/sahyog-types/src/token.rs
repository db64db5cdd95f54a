//! Bearer tokens shared by the REST middleware and the socket handshake.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::models::{Role, User};

pub use jsonwebtoken::errors::Error as TokenError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

impl Claims {
    pub fn for_user(user: &User, ttl: Duration) -> Self {
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            exp: (Utc::now() + ttl).timestamp() as usize,
        }
    }

    pub fn encode(&self, secret: &str) -> Result<String, TokenError> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Verifies signature and expiry.
    pub fn decode(token: &str, secret: &str) -> Result<Self, TokenError> {
        let data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(data.claims)
    }
}
