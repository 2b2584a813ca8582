/// Administrative revocation
///
/// Privileged add/remove of denylist entries. Entries written here have no
/// known token expiry, so they take the tracker's default TTL. Removal checks
/// presence first so a missing entry is reported rather than silently ignored.
///
/// The fail-open policy does not apply here: an operator must learn that a
/// revocation was not recorded, and an outage must not read as "not found".

use crate::auth::family::FamilyTracker;
use crate::error::{AppError, RevocationError};
use crate::users::{Authority, User};

/// Fail unless `user` holds at least `required`.
pub fn require_authority(user: &User, required: Authority) -> Result<(), RevocationError> {
    if user.authority < required {
        return Err(RevocationError::Forbidden);
    }
    Ok(())
}

#[derive(Clone)]
pub struct RevocationService {
    tracker: FamilyTracker,
}

impl RevocationService {
    pub fn new(tracker: FamilyTracker) -> Self {
        Self {
            tracker: tracker.fail_closed(),
        }
    }

    pub async fn add_jti(&self, jti: &str, reason: Option<&str>) -> Result<(), AppError> {
        self.tracker.deny_jti(jti, None, reason.unwrap_or("")).await?;
        tracing::info!(jti = %jti, reason = ?reason, "Refresh token revoked by administrator");
        Ok(())
    }

    pub async fn add_family(
        &self,
        user: &str,
        family: &str,
        reason: Option<&str>,
    ) -> Result<(), AppError> {
        self.tracker
            .deny_family(user, family, None, reason.unwrap_or(""))
            .await?;
        tracing::info!(user = %user, family = %family, reason = ?reason, "Token family revoked by administrator");
        Ok(())
    }

    pub async fn remove_jti(&self, jti: &str) -> Result<(), AppError> {
        if !self.tracker.is_jti_denied(jti).await? {
            return Err(RevocationError::TargetNotFound(format!("jti {}", jti)).into());
        }
        self.tracker.remove_jti(jti).await?;
        tracing::info!(jti = %jti, "Refresh token deny entry removed");
        Ok(())
    }

    pub async fn remove_family(&self, user: &str, family: &str) -> Result<(), AppError> {
        if !self.tracker.is_family_denied(user, family).await? {
            return Err(
                RevocationError::TargetNotFound(format!("family {} of {}", family, user)).into(),
            );
        }
        self.tracker.remove_family(user, family).await?;
        tracing::info!(user = %user, family = %family, "Token family deny entry removed");
        Ok(())
    }
}
