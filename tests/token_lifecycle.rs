mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{refresh_ids, spawn_app, spawn_app_with_store, token, ALICE_PASSWORD};
use serde_json::Value;
use tokenkeeper::store::RedisTokenStore;

// --- Login ---

#[tokio::test]
async fn token_returns_200_and_pair_for_valid_credentials() {
    let app = spawn_app().await;

    let response = app.post_token("alice", ALICE_PASSWORD).await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
    assert_eq!(body["token_type"], "bearer");
}

#[tokio::test]
async fn token_returns_401_for_bad_credentials() {
    let app = spawn_app().await;

    let test_cases = vec![
        ("alice", "not-the-password", "wrong password"),
        ("nobody", "whatever", "unknown user"),
        ("bob", "builder", "disabled account"),
    ];

    for (username, password, reason) in test_cases {
        let response = app.post_token(username, password).await;
        assert_eq!(401, response.status().as_u16(), "Should reject {}", reason);
        assert_eq!(
            response
                .headers()
                .get("www-authenticate")
                .and_then(|h| h.to_str().ok()),
            Some("Bearer")
        );

        let body: Value = response.json().await.expect("Failed to parse response");
        assert_eq!(body["message"], "Could not validate credentials");
    }
}

#[tokio::test]
async fn token_returns_400_for_missing_fields() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(&format!("{}/token", &app.address))
        .form(&[("username", "alice")])
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
}

// --- Refresh ---

#[tokio::test]
async fn refresh_rotates_within_the_same_family() {
    let app = spawn_app().await;
    let login = app.login("alice", ALICE_PASSWORD).await;
    let r0 = token(&login, "refresh_token");

    let response = app.post_refresh(&r0).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let r1 = token(&body, "refresh_token");

    let (jti0, fam0) = refresh_ids(&r0);
    let (jti1, fam1) = refresh_ids(&r1);
    assert_eq!(fam0, fam1);
    assert_ne!(jti0, jti1);

    let response = app.post_refresh(&r1).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn reusing_a_rotated_token_revokes_the_family() {
    let app = spawn_app().await;
    let login = app.login("alice", ALICE_PASSWORD).await;
    let r0 = token(&login, "refresh_token");

    let body: Value = app.post_refresh(&r0).await.json().await.unwrap();
    let r1 = token(&body, "refresh_token");

    // The attacker replays R0.
    let response = app.post_refresh(&r0).await;
    assert_eq!(401, response.status().as_u16());

    // The legitimate holder's R1 is now dead too.
    let response = app.post_refresh(&r1).await;
    assert_eq!(401, response.status().as_u16());

    // A fresh login starts an unaffected family.
    let login = app.login("alice", ALICE_PASSWORD).await;
    let response = app.post_refresh(&token(&login, "refresh_token")).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_access_tokens_and_garbage() {
    let app = spawn_app().await;
    let login = app.login("alice", ALICE_PASSWORD).await;

    let test_cases = vec![
        (token(&login, "access_token"), "access token"),
        ("not-a-jwt".to_string(), "garbage"),
        (String::new(), "empty"),
    ];

    for (presented, reason) in test_cases {
        let response = app.post_refresh(&presented).await;
        assert_eq!(401, response.status().as_u16(), "Should reject {}", reason);
    }
}

#[tokio::test]
async fn refresh_is_rejected_once_the_account_is_disabled() {
    let app = spawn_app().await;
    let login = app.login("alice", ALICE_PASSWORD).await;

    app.users.set_disabled("alice", true);

    let response = app.post_refresh(&token(&login, "refresh_token")).await;
    assert_eq!(401, response.status().as_u16());
}

// --- /me ---

#[tokio::test]
async fn me_requires_a_bearer_access_token() {
    let app = spawn_app().await;
    let login = app.login("alice", ALICE_PASSWORD).await;

    let response = app
        .client
        .get(&format!("{}/me", &app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    // Refresh tokens do not grant access.
    let response = app
        .client
        .get(&format!("{}/me", &app.address))
        .bearer_auth(token(&login, "refresh_token"))
        .send()
        .await
        .unwrap();
    assert_eq!(401, response.status().as_u16());

    let response = app
        .client
        .get(&format!("{}/me", &app.address))
        .bearer_auth(token(&login, "access_token"))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "alice");
    assert_eq!(body["authority"], "readwrite");
}

// --- Store outages ---

#[tokio::test]
async fn fail_open_keeps_serving_when_the_store_is_unreachable() {
    let store = Arc::new(RedisTokenStore::new("redis://127.0.0.1:1").unwrap());
    let app = spawn_app_with_store(store, true).await;

    let started = Instant::now();
    let login = app.login("alice", ALICE_PASSWORD).await;
    let response = app.post_refresh(&token(&login, "refresh_token")).await;
    assert_eq!(200, response.status().as_u16());

    // The outage must not stall each store call.
    assert!(
        started.elapsed() < Duration::from_secs(3),
        "login and refresh took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn fail_closed_returns_503_when_the_store_is_unreachable() {
    let store = Arc::new(RedisTokenStore::new("redis://127.0.0.1:1").unwrap());
    let app = spawn_app_with_store(store, false).await;

    let response = app.post_token("alice", ALICE_PASSWORD).await;
    assert_eq!(503, response.status().as_u16());
}
