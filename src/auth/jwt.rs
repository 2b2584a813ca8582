/// Token Codec
///
/// Mints and decodes HS256-signed JWTs. Decoding checks signature, expiry
/// (no leeway) and the `type` discriminator, and reports every failure as the
/// same `AuthError::InvalidToken` so callers learn nothing about which check
/// tripped.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::claims::{DecodeEnvelope, MintEnvelope, TokenType};
use crate::error::{AppError, AuthError};

/// Claims recovered from a valid token, with its expiry.
#[derive(Debug, Clone)]
pub struct Decoded<C> {
    pub claims: C,
    /// Unix timestamp
    pub expires_at: i64,
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Sign `claims` with an `exp` of now + `ttl_seconds` and the given type.
    ///
    /// # Errors
    /// Returns error if serialization or signing fails
    pub fn mint<C: Serialize>(
        &self,
        claims: &C,
        ttl_seconds: i64,
        token_type: TokenType,
    ) -> Result<String, AppError> {
        let envelope = MintEnvelope {
            claims,
            exp: chrono::Utc::now().timestamp() + ttl_seconds,
            token_type,
        };

        encode(&Header::new(Algorithm::HS256), &envelope, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }

    /// Decode a token that must be of `expected_type`.
    pub fn decode<C: DeserializeOwned>(
        &self,
        token: &str,
        expected_type: TokenType,
    ) -> Result<Decoded<C>, AuthError> {
        let data = decode::<DecodeEnvelope<C>>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token rejected by codec");
                AuthError::InvalidToken
            })?;

        let envelope = data.claims;
        if envelope.token_type != expected_type {
            tracing::debug!(
                expected = ?expected_type,
                actual = ?envelope.token_type,
                "Token type mismatch"
            );
            return Err(AuthError::InvalidToken);
        }

        Ok(Decoded {
            claims: envelope.claims,
            expires_at: envelope.exp,
        })
    }
}
