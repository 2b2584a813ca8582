/// Rotation Protocol
///
/// Login starts a refresh-token family; every refresh consumes the family's
/// current token and issues its successor. Presenting any other live token of
/// the family means a copy is in someone else's hands, so the whole family is
/// denied.
///
/// Store operations run in the order read pointer, decide, deny old token,
/// write new pointer, with no cross-key transaction. Two refreshes racing on
/// the same current token can both succeed; the later pointer write wins and
/// the other new token becomes a reuse signal on its next presentation.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims, TokenType};
use crate::auth::credentials::CredentialVerifier;
use crate::auth::family::FamilyTracker;
use crate::auth::jwt::TokenCodec;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

pub const REASON_ROTATED: &str = "rotated";
pub const REASON_REUSE_DETECTED: &str = "reuse detected";

/// Access and refresh token issued together.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

#[derive(Clone)]
pub struct RotationService {
    verifier: CredentialVerifier,
    codec: Arc<TokenCodec>,
    tracker: FamilyTracker,
    access_ttl: i64,
    refresh_ttl: i64,
}

fn new_token_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn remaining_ttl(expires_at: i64) -> i64 {
    (expires_at - chrono::Utc::now().timestamp()).max(0)
}

impl RotationService {
    pub fn new(
        verifier: CredentialVerifier,
        codec: Arc<TokenCodec>,
        tracker: FamilyTracker,
        jwt: &JwtSettings,
    ) -> Self {
        Self {
            verifier,
            codec,
            tracker,
            access_ttl: jwt.access_token_expiry,
            refresh_ttl: jwt.refresh_token_expiry,
        }
    }

    fn mint_pair(&self, user: &str, jti: &str, family: &str) -> Result<TokenPair, AppError> {
        let access_token = self.codec.mint(
            &AccessClaims {
                sub: user.to_string(),
            },
            self.access_ttl,
            TokenType::Access,
        )?;
        let refresh_token = self.codec.mint(
            &RefreshClaims {
                sub: user.to_string(),
                jti: jti.to_string(),
                fam: family.to_string(),
            },
            self.refresh_ttl,
            TokenType::Refresh,
        )?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Verify credentials and start a new refresh-token family.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self.verifier.authenticate(username, password).await?;
        if user.disabled {
            return Err(AuthError::InactiveIdentity.into());
        }

        let family = new_token_id();
        let jti = new_token_id();
        let pair = self.mint_pair(&user.name, &jti, &family)?;

        self.tracker
            .set_current_jti(&user.name, &family, &jti, self.refresh_ttl)
            .await?;

        tracing::info!(user = %user.name, family = %family, "User logged in");
        Ok(pair)
    }

    /// Exchange the family's current refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let decoded = self
            .codec
            .decode::<RefreshClaims>(refresh_token, TokenType::Refresh)?;
        if !decoded.claims.is_complete() {
            return Err(AuthError::InvalidToken.into());
        }
        let RefreshClaims {
            sub: user,
            jti,
            fam: family,
        } = decoded.claims;

        if self.tracker.is_family_denied(&user, &family).await? {
            tracing::info!(user = %user, family = %family, "Refresh token of denied family presented");
            return Err(AuthError::InvalidToken.into());
        }

        let jti_denied = self.tracker.is_jti_denied(&jti).await?;
        let remaining = remaining_ttl(decoded.expires_at);

        // A live token that is not the family's current one has been rotated
        // away, whether or not its own deny entry is still present.
        if let Some(current) = self.tracker.get_current_jti(&user, &family).await? {
            if current != jti {
                tracing::warn!(
                    user = %user,
                    family = %family,
                    jti = %jti,
                    "Refresh token reuse detected, denying family"
                );
                self.tracker
                    .deny_family(&user, &family, Some(remaining), REASON_REUSE_DETECTED)
                    .await?;
                self.tracker
                    .deny_jti(&jti, Some(remaining), REASON_REUSE_DETECTED)
                    .await?;
                return Err(AuthError::ReuseDetected.into());
            }
        }

        if jti_denied {
            tracing::info!(user = %user, jti = %jti, "Denied refresh token presented");
            return Err(AuthError::InvalidToken.into());
        }

        let identity = self.verifier.active_identity(&user).await?;

        let new_jti = new_token_id();
        let pair = self.mint_pair(&identity.name, &new_jti, &family)?;

        self.tracker
            .deny_jti(&jti, Some(remaining), REASON_ROTATED)
            .await?;
        self.tracker
            .set_current_jti(&identity.name, &family, &new_jti, self.refresh_ttl)
            .await?;

        tracing::info!(user = %identity.name, family = %family, "Refresh token rotated");
        Ok(pair)
    }
}
