/// User store interface
///
/// User records are owned by user management; this service only reads them
/// to verify credentials and to re-check that an identity is still enabled.

mod postgres;

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppError;

pub use postgres::PgUserRepository;

/// Authority level, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Authority {
    None = 0,
    Read = 1,
    ReadWrite = 2,
    Admin = 9,
}

impl Authority {
    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            0 => Some(Authority::None),
            1 => Some(Authority::Read),
            2 => Some(Authority::ReadWrite),
            9 => Some(Authority::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    pub password_hash: String,
    pub disabled: bool,
    pub authority: Authority,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, AppError>;
}

/// Map-backed repository for development and tests.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: User) {
        if let Ok(mut users) = self.users.write() {
            users.insert(user.name.clone(), user);
        }
    }

    pub fn set_disabled(&self, name: &str, disabled: bool) {
        if let Ok(mut users) = self.users.write() {
            if let Some(user) = users.get_mut(name) {
                user.disabled = disabled;
            }
        }
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut users) = self.users.write() {
            users.remove(name);
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, AppError> {
        let users = self
            .users
            .read()
            .map_err(|_| AppError::Internal("user map lock poisoned".to_string()))?;
        Ok(users.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            name: name.to_string(),
            password_hash: "$2b$04$unused".to_string(),
            disabled: false,
            authority: Authority::Read,
        }
    }

    #[test]
    fn test_authority_ordering() {
        assert!(Authority::Admin > Authority::ReadWrite);
        assert!(Authority::ReadWrite > Authority::Read);
        assert!(Authority::Read > Authority::None);
    }

    #[test]
    fn test_authority_from_level() {
        assert_eq!(Authority::from_level(9), Some(Authority::Admin));
        assert_eq!(Authority::from_level(2), Some(Authority::ReadWrite));
        assert_eq!(Authority::from_level(5), None);
    }

    #[tokio::test]
    async fn test_in_memory_lookup_and_disable() {
        let repo = InMemoryUserRepository::new();
        repo.insert(user("alice"));

        let found = repo.find_by_name("alice").await.unwrap().unwrap();
        assert!(!found.disabled);

        repo.set_disabled("alice", true);
        assert!(repo.find_by_name("alice").await.unwrap().unwrap().disabled);

        repo.remove("alice");
        assert!(repo.find_by_name("alice").await.unwrap().is_none());
    }
}
