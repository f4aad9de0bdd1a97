//! Integration tests for the REST auth backend
//!
//! These tests interact with real Firebase services (or the Auth emulator)
//! and require:
//! 1. A Firebase project with Authentication enabled
//! 2. Environment variables set in .env file (`FIREBASE_API_KEY`,
//!    `FIREBASE_PROJECT_ID`, `TEST_USER_EMAIL`, `TEST_USER_PASSWORD`,
//!    optionally `FIREBASE_AUTH_EMULATOR_HOST`)
//! 3. Run with: cargo test --features integration-tests -- --test-threads=1

#![cfg(feature = "integration-tests")]

use async_trait::async_trait;
use firebase_plugin::auth::{AuthService, Credential, NativeAuth, TokenSource};
use firebase_plugin::{App, AppOptions, AuthError, AuthServiceConfig, FirebaseError, MemoryPreferences};
use std::env;
use std::sync::Arc;

/// Load environment variables from .env file
fn load_env() {
    dotenvy::dotenv().ok();
}

/// Get test app and user credentials from environment
fn get_test_config() -> (App, String, String) {
    load_env();

    let options = AppOptions::from_env().expect("FIREBASE_API_KEY and FIREBASE_PROJECT_ID must be set in .env file");
    let email = env::var("TEST_USER_EMAIL").expect("TEST_USER_EMAIL must be set in .env file");
    let password = env::var("TEST_USER_PASSWORD").expect("TEST_USER_PASSWORD must be set in .env file");

    (App::new(options).expect("Failed to create app"), email, password)
}

/// Token source for providers not configured in the test project
struct NoProvider;

#[async_trait]
impl TokenSource for NoProvider {
    async fn fetch_credential(&self) -> Result<Credential, FirebaseError> {
        Err(AuthError::Cancelled.into())
    }

    async fn sign_out(&self) -> Result<(), FirebaseError> {
        Ok(())
    }
}

async fn service(app: &App) -> AuthService {
    let auth = Arc::new(app.rest_auth().expect("Failed to create auth backend"));
    app.auth_service(
        auth,
        NoProvider,
        NoProvider,
        Arc::new(MemoryPreferences::new()),
        AuthServiceConfig::default(),
    )
    .await
}

/// Test: Sign in with email and password
#[tokio::test]
async fn test_sign_in_with_email_password() {
    let (app, email, password) = get_test_config();
    let service = service(&app).await;

    let user = service
        .sign_in_with_email_and_password(&email, &password)
        .await
        .expect("Failed to sign in");

    assert!(!user.uid.is_empty());
    assert_eq!(user.email.as_deref(), Some(email.as_str()));
    assert!(user.id_token().is_some());
    assert!(service.is_signed_in());

    service.sign_out().await.expect("Failed to sign out");
    assert!(service.current_user().is_none());
}

/// Test: Anonymous authentication
#[tokio::test]
async fn test_anonymous_auth() {
    let (app, _, _) = get_test_config();
    let service = service(&app).await;

    let user = service.sign_in_anonymously().await.expect("Failed to sign in anonymously");
    assert!(user.is_anonymous);
    assert!(!user.uid.is_empty());

    service.sign_out().await.expect("Failed to sign out");
}

/// Test: Wrong password fails and leaves no user behind
#[tokio::test]
async fn test_wrong_password_signs_out() {
    let (app, email, _) = get_test_config();
    let service = service(&app).await;

    let result = service
        .sign_in_with_email_and_password(&email, "definitely-not-the-password")
        .await;

    assert!(result.is_err());
    assert!(service.current_user().is_none());
    assert!(!service.is_sign_in_running());
}

/// Test: Sign-in methods lookup
#[tokio::test]
async fn test_fetch_sign_in_methods() {
    let (app, email, _) = get_test_config();
    let auth = app.rest_auth().expect("Failed to create auth backend");

    let result = auth.fetch_sign_in_methods(&email).await;
    // Projects with email enumeration protection return an empty list.
    assert!(result.is_ok());
}

/// Test: Reload refreshes the profile of the signed-in user
#[tokio::test]
async fn test_reload_user() {
    let (app, email, password) = get_test_config();
    let auth = app.rest_auth().expect("Failed to create auth backend");

    auth.sign_in_with_email_and_password(&email, &password)
        .await
        .expect("Failed to sign in");
    let reloaded = auth.reload().await.expect("Failed to reload");

    assert_eq!(reloaded.email.as_deref(), Some(email.as_str()));
    assert!(reloaded.is_linked_to("password"));
}
