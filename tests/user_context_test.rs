use anyhow::Result;
use httpmock::prelude::*;
use inventory_desk::domain::ports::CredentialStore;
use inventory_desk::{AdminError, ApiClient, FileCredentialStore, MemoryCredentialStore, UserContext};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn client(server: &MockServer, credentials: Arc<dyn CredentialStore>) -> ApiClient {
    ApiClient::new(&server.base_url(), Duration::from_secs(5), credentials).unwrap()
}

#[tokio::test]
async fn test_init_without_token_asks_nothing() -> Result<()> {
    let server = MockServer::start_async().await;
    let whoami = server
        .mock_async(|when, then| {
            when.method(GET).path("/account/auth-user/");
            then.status(200)
                .json_body(json!({"username": "admin", "email": "admin@example.com"}));
        })
        .await;

    let context = UserContext::init(client(&server, Arc::new(MemoryCredentialStore::new()))).await?;

    assert!(context.current().is_none());
    whoami.assert_hits_async(0).await;
    Ok(())
}

#[tokio::test]
async fn test_unauthenticated_answer_means_no_user() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account/auth-user/");
            then.status(400)
                .json_body(json!({"message": "user not authenticated"}));
        })
        .await;

    let credentials = Arc::new(MemoryCredentialStore::with_token("stale"));
    let context = UserContext::init(client(&server, credentials)).await?;

    assert!(context.current().is_none());
    Ok(())
}

#[tokio::test]
async fn test_rejected_token_is_an_error() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/account/auth-user/");
            then.status(401).json_body(json!({"code": "token_not_valid"}));
        })
        .await;

    let credentials = Arc::new(MemoryCredentialStore::with_token("expired"));
    let result = UserContext::init(client(&server, credentials)).await;

    assert!(matches!(result, Err(AdminError::TokenInvalid)));
    Ok(())
}

#[tokio::test]
async fn test_login_stores_token_and_logout_notifies() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let token_file = temp_dir.path().join("session").join("token");
    let credentials = Arc::new(FileCredentialStore::new(&token_file));

    let server = MockServer::start_async().await;
    let login = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/auth/login/")
                .json_body(json!({"email": "admin@example.com", "password": "hunter2"}));
            then.status(200)
                .json_body(json!({"access": "fresh-access", "refresh": "fresh-refresh"}));
        })
        .await;
    let whoami = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/account/auth-user/")
                .header("authorization", "Bearer fresh-access");
            then.status(200).json_body(json!({
                "username": "admin",
                "email": "admin@example.com",
                "groups": ["staff"]
            }));
        })
        .await;

    let context = UserContext::signed_out(client(&server, credentials.clone()));
    let mut updates = context.subscribe();

    let user = context.login("admin@example.com", "hunter2").await?;
    login.assert_async().await;
    whoami.assert_async().await;
    assert_eq!(user.username, "admin");
    assert_eq!(user.groups, vec!["staff".to_string()]);
    assert_eq!(std::fs::read_to_string(&token_file)?.trim(), "fresh-access");
    assert!(updates.has_changed()?);
    assert_eq!(updates.borrow_and_update().as_ref(), Some(&user));

    context.logout()?;
    assert!(updates.has_changed()?);
    assert!(updates.borrow_and_update().is_none());
    assert!(credentials.load()?.is_none());
    assert!(context.current().is_none());
    Ok(())
}
