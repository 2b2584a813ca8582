//! Shared harness for the HTTP integration tests.
//!
//! The server runs on a random port against in-memory users; the token store
//! is injected so tests can inspect it or make it unreachable.

#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;

use serde_json::Value;
use tokenkeeper::auth::{hash_password_with_cost, RefreshClaims, TokenCodec, TokenType};
use tokenkeeper::configuration::{ApplicationSettings, JwtSettings, Settings, StoreSettings};
use tokenkeeper::startup::{run, AppState};
use tokenkeeper::store::{InMemoryTokenStore, TokenStore};
use tokenkeeper::users::{Authority, InMemoryUserRepository, User, UserRepository};

pub const SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const ALICE_PASSWORD: &str = "wonderland";
pub const ADMIN_PASSWORD: &str = "supersecret";

pub struct TestApp {
    pub address: String,
    pub users: Arc<InMemoryUserRepository>,
    pub client: reqwest::Client,
}

fn test_settings(fail_open: bool) -> Settings {
    Settings {
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: None,
        jwt: JwtSettings {
            secret: SECRET.to_string(),
            access_token_expiry: 1800,
            refresh_token_expiry: 3600,
        },
        store: StoreSettings {
            fail_open,
            ..StoreSettings::default()
        },
    }
}

fn seed_users() -> Arc<InMemoryUserRepository> {
    let users = Arc::new(InMemoryUserRepository::new());
    let seed = [
        ("alice", ALICE_PASSWORD, Authority::ReadWrite, false),
        ("root", ADMIN_PASSWORD, Authority::Admin, false),
        ("bob", "builder", Authority::Read, true),
    ];
    for (name, password, authority, disabled) in seed {
        users.insert(User {
            name: name.to_string(),
            password_hash: hash_password_with_cost(password, 4).expect("Failed to hash password"),
            disabled,
            authority,
        });
    }
    users
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_store(Arc::new(InMemoryTokenStore::new()), true).await
}

pub async fn spawn_app_with_store(store: Arc<dyn TokenStore>, fail_open: bool) -> TestApp {
    let users = seed_users();
    let address = spawn_server(users.clone(), store, fail_open);

    TestApp {
        address,
        users,
        client: reqwest::Client::new(),
    }
}

/// Start the server on a random port and return its base URL.
pub fn spawn_server(
    users: Arc<dyn UserRepository>,
    store: Arc<dyn TokenStore>,
    fail_open: bool,
) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let state = AppState::new(&test_settings(fail_open), users, store);
    let server = run(listener, state).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    format!("http://127.0.0.1:{}", port)
}

impl TestApp {
    pub async fn post_token(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/token", &self.address))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.client
            .post(&format!("{}/refresh", &self.address))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Log in and return the response body, asserting success.
    pub async fn login(&self, username: &str, password: &str) -> Value {
        let response = self.post_token(username, password).await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    pub async fn admin_access_token(&self) -> String {
        let body = self.login("root", ADMIN_PASSWORD).await;
        body["access_token"].as_str().unwrap().to_string()
    }
}

/// `(jti, family)` of a refresh token issued by the test app.
pub fn refresh_ids(refresh_token: &str) -> (String, String) {
    let decoded = TokenCodec::new(SECRET)
        .decode::<RefreshClaims>(refresh_token, TokenType::Refresh)
        .expect("Refresh token should decode");
    (decoded.claims.jti, decoded.claims.fam)
}

pub fn token(body: &Value, field: &str) -> String {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("response has no {}", field))
        .to_string()
}
