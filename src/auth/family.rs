/// Family Tracker
///
/// Denylist and current-pointer primitives over the shared TTL store.
///
/// Keys:
/// - `<prefix>:deny:<jti>`
/// - `<prefix>:family:current:<user>:<family>`
/// - `<prefix>:family:deny:<user>:<family>`
///
/// Every operation handles store failures on its own. Fail-open logs and
/// returns the permissive default ("not denied", "no pointer", write skipped);
/// fail-closed logs and returns `AuthError::StoreUnavailable`.

use std::sync::Arc;

use crate::configuration::StoreSettings;
use crate::error::AuthError;
use crate::store::{StoreError, TokenStore};

#[derive(Clone)]
pub struct FamilyTracker {
    store: Arc<dyn TokenStore>,
    fail_open: bool,
    default_ttl_seconds: i64,
    key_prefix: String,
}

impl FamilyTracker {
    pub fn new(store: Arc<dyn TokenStore>, settings: &StoreSettings) -> Self {
        Self {
            store,
            fail_open: settings.fail_open,
            default_ttl_seconds: settings.default_deny_ttl_seconds(),
            key_prefix: settings.key_prefix.clone(),
        }
    }

    pub fn is_fail_open(&self) -> bool {
        self.fail_open
    }

    /// Same store and keys, but every store failure is `StoreUnavailable`.
    pub fn fail_closed(&self) -> Self {
        Self {
            fail_open: false,
            ..self.clone()
        }
    }

    fn deny_jti_key(&self, jti: &str) -> String {
        format!("{}:deny:{}", self.key_prefix, jti)
    }

    fn family_current_key(&self, user: &str, family: &str) -> String {
        format!("{}:family:current:{}:{}", self.key_prefix, user, family)
    }

    fn family_deny_key(&self, user: &str, family: &str) -> String {
        format!("{}:family:deny:{}:{}", self.key_prefix, user, family)
    }

    fn on_store_error<T>(
        &self,
        err: StoreError,
        operation: &'static str,
        fallback: T,
    ) -> Result<T, AuthError> {
        tracing::warn!(
            operation,
            error = %err,
            fail_open = self.fail_open,
            "Token store error"
        );
        if self.fail_open {
            Ok(fallback)
        } else {
            Err(AuthError::StoreUnavailable)
        }
    }

    pub async fn is_jti_denied(&self, jti: &str) -> Result<bool, AuthError> {
        match self.store.exists(&self.deny_jti_key(jti)).await {
            Ok(denied) => Ok(denied),
            Err(e) => self.on_store_error(e, "is_jti_denied", false),
        }
    }

    pub async fn is_family_denied(&self, user: &str, family: &str) -> Result<bool, AuthError> {
        match self.store.exists(&self.family_deny_key(user, family)).await {
            Ok(denied) => Ok(denied),
            Err(e) => self.on_store_error(e, "is_family_denied", false),
        }
    }

    pub async fn get_current_jti(&self, user: &str, family: &str) -> Result<Option<String>, AuthError> {
        match self.store.get(&self.family_current_key(user, family)).await {
            Ok(current) => Ok(current),
            Err(e) => self.on_store_error(e, "get_current_jti", None),
        }
    }

    /// Record `jti` as the one outstanding refresh token of the family.
    /// An already expired lifetime (`ttl_seconds <= 0`) writes nothing.
    pub async fn set_current_jti(
        &self,
        user: &str,
        family: &str,
        jti: &str,
        ttl_seconds: i64,
    ) -> Result<(), AuthError> {
        if ttl_seconds <= 0 {
            return Ok(());
        }
        match self
            .store
            .set_ex(&self.family_current_key(user, family), jti, ttl_seconds as u64)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => self.on_store_error(e, "set_current_jti", ()),
        }
    }

    /// Resolve an explicit TTL, or the configured default when none is known.
    fn resolve_ttl(&self, ttl_seconds: Option<i64>) -> i64 {
        ttl_seconds.unwrap_or(self.default_ttl_seconds)
    }

    /// Deny a single token. `reason` is stored for diagnostics only.
    pub async fn deny_jti(
        &self,
        jti: &str,
        ttl_seconds: Option<i64>,
        reason: &str,
    ) -> Result<(), AuthError> {
        let ttl = self.resolve_ttl(ttl_seconds);
        if ttl <= 0 {
            return Ok(());
        }
        match self.store.set_ex(&self.deny_jti_key(jti), reason, ttl as u64).await {
            Ok(()) => Ok(()),
            Err(e) => self.on_store_error(e, "deny_jti", ()),
        }
    }

    /// Deny every token of a user's family.
    pub async fn deny_family(
        &self,
        user: &str,
        family: &str,
        ttl_seconds: Option<i64>,
        reason: &str,
    ) -> Result<(), AuthError> {
        let ttl = self.resolve_ttl(ttl_seconds);
        if ttl <= 0 {
            return Ok(());
        }
        match self
            .store
            .set_ex(&self.family_deny_key(user, family), reason, ttl as u64)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => self.on_store_error(e, "deny_family", ()),
        }
    }

    pub async fn remove_jti(&self, jti: &str) -> Result<(), AuthError> {
        match self.store.delete(&self.deny_jti_key(jti)).await {
            Ok(()) => Ok(()),
            Err(e) => self.on_store_error(e, "remove_jti", ()),
        }
    }

    pub async fn remove_family(&self, user: &str, family: &str) -> Result<(), AuthError> {
        match self.store.delete(&self.family_deny_key(user, family)).await {
            Ok(()) => Ok(()),
            Err(e) => self.on_store_error(e, "remove_family", ()),
        }
    }
}
