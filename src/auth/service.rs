//! Auth façade
//!
//! [`AuthService`] puts the Firebase backend and the Google and Facebook
//! providers behind one async interface. It tracks the signed-in user and
//! whether a sign-in is running, and publishes both as streams.
//!
//! Every sign-in or link call goes through one runner that:
//! - raises the running flag for the duration of the call (lowered on
//!   success, failure and when the future is dropped),
//! - runs one attempt at a time unless `serialize_sign_in` is disabled,
//! - publishes the resulting user,
//! - on failure logs the error chain, optionally signs out of every
//!   provider, and returns the original error. No retries.
//!
//! # Example
//! ```no_run
//! # async fn example(service: firebase_plugin::auth::AuthService) -> Result<(), firebase_plugin::FirebaseError> {
//! use futures::StreamExt;
//!
//! let mut signed_in = service.is_signed_in_ticks();
//! service.sign_in_anonymously().await?;
//! while let Some(flag) = signed_in.next().await {
//!     println!("signed in: {}", flag);
//! }
//! # Ok(())
//! # }
//! ```

use crate::auth::native::{NativeAuth, SocialAuth};
use crate::auth::types::User;
use crate::config::AuthServiceConfig;
use crate::error::{log_error_chain, AuthError, FirebaseError};
use crate::preferences::{preference_keys, Preferences};
use crate::subject::{Subject, Ticks};
use futures::StreamExt;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Unified sign-in façade
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthServiceInner>,
}

struct AuthServiceInner {
    auth: Arc<dyn NativeAuth>,
    facebook: Arc<dyn SocialAuth>,
    google: Arc<dyn SocialAuth>,
    preferences: Arc<dyn Preferences>,
    config: AuthServiceConfig,
    current_user: Subject<Option<Arc<User>>>,
    sign_in_running: Subject<bool>,
    /// Number of auth tasks in flight; the running flag is `count > 0`
    running_count: StdMutex<usize>,
    sign_in_lock: Mutex<()>,
}

/// Keeps the running flag raised while alive
struct RunningGuard<'a> {
    inner: &'a AuthServiceInner,
    operation: &'static str,
}

impl<'a> RunningGuard<'a> {
    fn start(inner: &'a AuthServiceInner, operation: &'static str) -> Self {
        let mut count = inner
            .running_count
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *count += 1;
        if *count == 1 {
            inner.sign_in_running.publish(true);
        }
        Self { inner, operation }
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        let mut count = self
            .inner
            .running_count
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.inner.sign_in_running.publish(false);
        }
        tracing::debug!(operation = self.operation, "sign-in process completed");
    }
}

/// Domain part of an address, for logs
fn email_domain(email: &str) -> &str {
    email.rsplit_once('@').map(|(_, domain)| domain).unwrap_or("<invalid>")
}

impl AuthService {
    /// Build the façade and seed the current user from the backend's
    /// restored session
    pub async fn new(
        auth: Arc<dyn NativeAuth>,
        facebook: Arc<dyn SocialAuth>,
        google: Arc<dyn SocialAuth>,
        preferences: Arc<dyn Preferences>,
        config: AuthServiceConfig,
    ) -> Self {
        let restored = auth.current_user().await;
        if let Some(user) = &restored {
            tracing::info!(uid = %user.uid, "restored signed-in user");
        }

        Self {
            inner: Arc::new(AuthServiceInner {
                auth,
                facebook,
                google,
                preferences,
                config,
                current_user: Subject::new(restored),
                sign_in_running: Subject::new(false),
                running_count: StdMutex::new(0),
                sign_in_lock: Mutex::new(()),
            }),
        }
    }

    /// Currently signed-in user
    pub fn current_user(&self) -> Option<Arc<User>> {
        self.inner.current_user.value()
    }

    /// Whether a user is signed in
    pub fn is_signed_in(&self) -> bool {
        self.current_user().is_some()
    }

    /// Whether a sign-in or link operation is in flight
    pub fn is_sign_in_running(&self) -> bool {
        self.inner.sign_in_running.value()
    }

    /// Current user now and after every change
    pub fn current_user_ticks(&self) -> Ticks<Option<Arc<User>>> {
        self.inner.current_user.subscribe()
    }

    /// `current_user().is_some()` now and after every change.
    ///
    /// Derived from the current-user stream, so the two never disagree.
    pub fn is_signed_in_ticks(&self) -> Ticks<bool> {
        Box::pin(self.current_user_ticks().map(|user| user.is_some()))
    }

    /// Running flag now and after every change
    pub fn is_sign_in_running_ticks(&self) -> Ticks<bool> {
        self.inner.sign_in_running.subscribe()
    }

    /// Address stored by the last [`send_sign_in_link`](Self::send_sign_in_link)
    pub fn sign_in_link_email(&self) -> Result<Option<String>, FirebaseError> {
        self.inner.preferences.get(preference_keys::SIGN_IN_LINK_EMAIL)
    }

    async fn run_auth_task<F>(
        &self,
        operation: &'static str,
        sign_out_when_failed: bool,
        task: F,
    ) -> Result<Arc<User>, FirebaseError>
    where
        F: Future<Output = Result<Arc<User>, FirebaseError>> + Send,
    {
        let _running = RunningGuard::start(&self.inner, operation);
        let _serial = if self.inner.config.serialize_sign_in {
            Some(self.inner.sign_in_lock.lock().await)
        } else {
            None
        };

        match task.await {
            Ok(user) => {
                tracing::info!(operation, uid = %user.uid, "user signed in successfully");
                self.inner.current_user.publish(Some(Arc::clone(&user)));
                Ok(user)
            }
            Err(err) => {
                log_error_chain(operation, &err);
                if sign_out_when_failed {
                    if let Err(sign_out_err) = self.sign_out().await {
                        log_error_chain("sign_out after failed sign-in", &sign_out_err);
                    }
                }
                Err(err)
            }
        }
    }

    /// Sign in with a new anonymous account
    pub async fn sign_in_anonymously(&self) -> Result<Arc<User>, FirebaseError> {
        let auth = &self.inner.auth;
        self.run_auth_task("sign_in_anonymously", true, auth.sign_in_anonymously())
            .await
    }

    /// Sign in with email and password
    pub async fn sign_in_with_email_and_password(&self, email: &str, password: &str) -> Result<Arc<User>, FirebaseError> {
        let auth = &self.inner.auth;
        self.run_auth_task(
            "sign_in_with_email_and_password",
            true,
            auth.sign_in_with_email_and_password(email, password),
        )
        .await
    }

    /// Sign in with a link received by email
    pub async fn sign_in_with_email_link(&self, email: &str, link: &str) -> Result<Arc<User>, FirebaseError> {
        let auth = &self.inner.auth;
        self.run_auth_task(
            "sign_in_with_email_link",
            true,
            auth.sign_in_with_email_link(email, link),
        )
        .await
    }

    /// Complete a sign-in link with the address stored when it was sent
    pub async fn complete_sign_in_with_email_link(&self, link: &str) -> Result<Arc<User>, FirebaseError> {
        // Error-first: not a sign-in link
        if !self.is_sign_in_with_email_link(link) {
            return Err(AuthError::InvalidActionCode.into());
        }
        let Some(email) = self.sign_in_link_email()? else {
            return Err(AuthError::InvalidEmail.into());
        };
        self.sign_in_with_email_link(&email, link).await
    }

    /// Sign in through Google Sign-In
    pub async fn sign_in_with_google(&self) -> Result<Arc<User>, FirebaseError> {
        let google = &self.inner.google;
        self.run_auth_task("sign_in_with_google", true, google.sign_in())
            .await
    }

    /// Sign in through Facebook Login
    pub async fn sign_in_with_facebook(&self) -> Result<Arc<User>, FirebaseError> {
        let facebook = &self.inner.facebook;
        self.run_auth_task("sign_in_with_facebook", true, facebook.sign_in())
            .await
    }

    /// Sign in with Apple
    pub async fn sign_in_with_apple(&self) -> Result<Arc<User>, FirebaseError> {
        let auth = &self.inner.auth;
        self.run_auth_task("sign_in_with_apple", true, auth.sign_in_with_apple())
            .await
    }

    /// Send an SMS code to `phone_number`; no state change
    pub async fn verify_phone_number(&self, phone_number: &str) -> Result<(), FirebaseError> {
        self.inner
            .auth
            .verify_phone_number(phone_number)
            .await
            .inspect_err(|err| log_error_chain("verify_phone_number", err))
    }

    /// Sign in with the SMS code from [`verify_phone_number`](Self::verify_phone_number)
    pub async fn sign_in_with_phone_number_verification_code(&self, code: &str) -> Result<Arc<User>, FirebaseError> {
        let auth = &self.inner.auth;
        self.run_auth_task(
            "sign_in_with_phone_number_verification_code",
            true,
            auth.sign_in_with_phone_number_verification_code(code),
        )
        .await
    }

    /// Add an email/password login to the current user
    pub async fn link_with_email_and_password(&self, email: &str, password: &str) -> Result<Arc<User>, FirebaseError> {
        let auth = &self.inner.auth;
        self.run_auth_task(
            "link_with_email_and_password",
            false,
            auth.link_with_email_and_password(email, password),
        )
        .await
    }

    /// Add the Google account to the current user
    pub async fn link_with_google(&self) -> Result<Arc<User>, FirebaseError> {
        let google = &self.inner.google;
        self.run_auth_task("link_with_google", false, google.link())
            .await
    }

    /// Add the Facebook account to the current user
    pub async fn link_with_facebook(&self) -> Result<Arc<User>, FirebaseError> {
        let facebook = &self.inner.facebook;
        self.run_auth_task("link_with_facebook", false, facebook.link())
            .await
    }

    /// Add the verified phone number to the current user
    pub async fn link_with_phone_number_verification_code(&self, code: &str) -> Result<Arc<User>, FirebaseError> {
        let auth = &self.inner.auth;
        self.run_auth_task(
            "link_with_phone_number_verification_code",
            false,
            auth.link_with_phone_number_verification_code(code),
        )
        .await
    }

    /// Remove `provider_id` from the current user and republish the user
    pub async fn unlink_provider(&self, provider_id: &str) -> Result<Arc<User>, FirebaseError> {
        // Error-first: nothing to unlink from
        if self.current_user().is_none() {
            return Err(AuthError::NoSignedInUser.into());
        }

        let auth = Arc::clone(&self.inner.auth);
        let task = async move {
            auth.unlink(provider_id).await?;
            auth.current_user()
                .await
                .ok_or_else(|| FirebaseError::from(AuthError::NoSignedInUser))
        };
        self.run_auth_task("unlink_provider", false, task).await
    }

    /// Email a sign-in link to `email` and remember the address
    pub async fn send_sign_in_link(&self, email: &str) -> Result<(), FirebaseError> {
        self.inner
            .auth
            .send_sign_in_link(email, &self.inner.config.action_code_settings)
            .await
            .inspect_err(|err| log_error_chain("send_sign_in_link", err))?;

        self.inner
            .preferences
            .set(preference_keys::SIGN_IN_LINK_EMAIL, email)?;
        tracing::info!(domain = email_domain(email), "sign-in link sent");
        Ok(())
    }

    /// Sign out of Firebase, Facebook and Google.
    ///
    /// The three sign-outs run concurrently. Once all have finished the
    /// current user is cleared and the stored link address removed, whether
    /// or not a provider failed; the first failure is then returned.
    pub async fn sign_out(&self) -> Result<(), FirebaseError> {
        let (native, facebook, google) = futures::join!(
            self.inner.auth.sign_out(),
            self.inner.facebook.sign_out(),
            self.inner.google.sign_out()
        );

        let cleanup = self.handle_user_signed_out();

        let mut first_error = None;
        let steps = [
            ("firebase", native),
            ("facebook", facebook),
            ("google", google),
            ("preferences", cleanup),
        ];
        for (step, result) in steps {
            if let Err(err) = result {
                tracing::warn!(step, "sign-out step failed");
                log_error_chain("sign_out", &err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                tracing::info!("user signed out");
                Ok(())
            }
        }
    }

    fn handle_user_signed_out(&self) -> Result<(), FirebaseError> {
        self.inner.current_user.publish(None);
        self.inner
            .preferences
            .remove(preference_keys::SIGN_IN_LINK_EMAIL)
    }

    /// Sign-in methods registered for `email`
    pub async fn fetch_sign_in_methods(&self, email: &str) -> Result<Vec<String>, FirebaseError> {
        self.inner
            .auth
            .fetch_sign_in_methods(email)
            .await
            .inspect_err(|err| log_error_chain("fetch_sign_in_methods", err))
    }

    /// Email a password reset link to the current user
    pub async fn send_password_reset_email(&self) -> Result<(), FirebaseError> {
        let Some(user) = self.current_user() else {
            return Err(AuthError::NoSignedInUser.into());
        };
        let Some(email) = user.email.as_deref() else {
            return Err(AuthError::InvalidEmail.into());
        };

        self.inner
            .auth
            .send_password_reset_email(email)
            .await
            .inspect_err(|err| log_error_chain("send_password_reset_email", err))
    }

    /// Whether `link` is a sign-in link
    pub fn is_sign_in_with_email_link(&self, link: &str) -> bool {
        self.inner.auth.is_sign_in_with_email_link(link)
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("signed_in", &self.is_signed_in())
            .field("sign_in_running", &self.is_sign_in_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_domain() {
        assert_eq!(email_domain("user@example.com"), "example.com");
        assert_eq!(email_domain("nope"), "<invalid>");
    }
}
