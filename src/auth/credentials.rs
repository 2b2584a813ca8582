/// Credential Verifier
///
/// Checks a username/password pair against the stored bcrypt hash. An unknown
/// user and a wrong password produce the same `InvalidCredentials`.

use std::sync::Arc;

use crate::auth::password::verify_password;
use crate::error::{AppError, AuthError};
use crate::users::{User, UserRepository};

#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserRepository>,
}

impl CredentialVerifier {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Return the identity behind `username` if `password` matches.
    ///
    /// Does not look at the `disabled` flag; that is the caller's decision.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_name(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        // bcrypt is deliberately slow; keep it off the async workers.
        let password = password.to_string();
        let password_hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {}", e)))?;

        if !valid {
            return Err(AuthError::InvalidCredentials.into());
        }
        Ok(user)
    }

    /// Look up an identity that must still exist and be enabled.
    pub async fn active_identity(&self, username: &str) -> Result<User, AppError> {
        let user = self
            .users
            .find_by_name(username)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if user.disabled {
            return Err(AuthError::InactiveIdentity.into());
        }
        Ok(user)
    }
}
