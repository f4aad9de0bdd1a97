//! Identity backends consumed by the auth façade
//!
//! [`NativeAuth`] is the Firebase Authentication capability set, [`SocialAuth`]
//! a social sign-in SDK (Google, Facebook) and [`TokenSource`] the platform
//! half of a social flow that only yields a provider token.

use crate::auth::types::{Credential, User};
use crate::config::ActionCodeSettings;
use crate::error::FirebaseError;
use async_trait::async_trait;
use std::sync::Arc;

/// Firebase Authentication backend
#[async_trait]
pub trait NativeAuth: Send + Sync {
    /// Session restored by the backend, if any
    async fn current_user(&self) -> Option<Arc<User>>;

    /// Create and sign in an anonymous account
    async fn sign_in_anonymously(&self) -> Result<Arc<User>, FirebaseError>;

    /// Sign in with email and password
    async fn sign_in_with_email_and_password(&self, email: &str, password: &str) -> Result<Arc<User>, FirebaseError>;

    /// Complete a passwordless sign-in link
    async fn sign_in_with_email_link(&self, email: &str, link: &str) -> Result<Arc<User>, FirebaseError>;

    /// Sign in with Apple
    async fn sign_in_with_apple(&self) -> Result<Arc<User>, FirebaseError>;

    /// Exchange a provider credential for a Firebase session
    async fn sign_in_with_credential(&self, credential: Credential) -> Result<Arc<User>, FirebaseError>;

    /// Start phone number verification; the SMS code is used afterwards
    async fn verify_phone_number(&self, phone_number: &str) -> Result<(), FirebaseError>;

    /// Sign in with the SMS code of the last verification
    async fn sign_in_with_phone_number_verification_code(&self, code: &str) -> Result<Arc<User>, FirebaseError>;

    /// Attach an email/password credential to the current user
    async fn link_with_email_and_password(&self, email: &str, password: &str) -> Result<Arc<User>, FirebaseError>;

    /// Attach the phone number of the last verification to the current user
    async fn link_with_phone_number_verification_code(&self, code: &str) -> Result<Arc<User>, FirebaseError>;

    /// Attach a provider credential to the current user
    async fn link_with_credential(&self, credential: Credential) -> Result<Arc<User>, FirebaseError>;

    /// Detach `provider_id` from the current user
    async fn unlink(&self, provider_id: &str) -> Result<(), FirebaseError>;

    /// Email a sign-in link to `email`
    async fn send_sign_in_link(&self, email: &str, settings: &ActionCodeSettings) -> Result<(), FirebaseError>;

    /// Drop the backend session
    async fn sign_out(&self) -> Result<(), FirebaseError>;

    /// Sign-in methods registered for `email`
    async fn fetch_sign_in_methods(&self, email: &str) -> Result<Vec<String>, FirebaseError>;

    /// Email a password reset link to `email`
    async fn send_password_reset_email(&self, email: &str) -> Result<(), FirebaseError>;

    /// Whether `link` is a sign-in link
    fn is_sign_in_with_email_link(&self, link: &str) -> bool;
}

/// Social sign-in SDK
#[async_trait]
pub trait SocialAuth: Send + Sync {
    /// Run the provider flow and sign in to Firebase
    async fn sign_in(&self) -> Result<Arc<User>, FirebaseError>;

    /// Run the provider flow and link the result to the current user
    async fn link(&self) -> Result<Arc<User>, FirebaseError>;

    /// Sign out of the provider
    async fn sign_out(&self) -> Result<(), FirebaseError>;
}

/// Platform side of a provider flow (Google Sign-In, Facebook Login, Apple)
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Run the interactive flow and return the resulting credential.
    ///
    /// A user abort is reported as [`AuthError::Cancelled`](crate::AuthError::Cancelled).
    async fn fetch_credential(&self) -> Result<Credential, FirebaseError>;

    /// Forget the provider session
    async fn sign_out(&self) -> Result<(), FirebaseError>;
}
