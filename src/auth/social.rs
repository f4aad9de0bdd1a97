//! Social sign-in through identity provider tokens
//!
//! [`IdpAuth`] turns a platform [`TokenSource`] into a [`SocialAuth`]: the
//! token source runs the provider UI, the resulting credential is exchanged
//! with the Firebase backend.

use crate::auth::native::{NativeAuth, SocialAuth, TokenSource};
use crate::auth::types::{Credential, User};
use crate::error::{AuthError, FirebaseError};
use async_trait::async_trait;
use std::sync::Arc;

/// Social provider backed by a token source and a Firebase backend
pub struct IdpAuth<T> {
    token_source: T,
    auth: Arc<dyn NativeAuth>,
}

impl<T: TokenSource> IdpAuth<T> {
    /// Combine a token source with the backend it signs in to
    pub fn new(token_source: T, auth: Arc<dyn NativeAuth>) -> Self {
        Self { token_source, auth }
    }

    async fn credential(&self) -> Result<Credential, FirebaseError> {
        let credential = self.token_source.fetch_credential().await?;
        validate(&credential)?;
        tracing::debug!(provider = credential.provider_id(), "provider credential obtained");
        Ok(credential)
    }
}

fn validate(credential: &Credential) -> Result<(), AuthError> {
    match credential {
        Credential::Google { id_token: None, access_token: None } => Err(AuthError::InvalidCredential(
            "Google credential requires id_token or access_token".to_string(),
        )),
        Credential::Facebook { access_token } if access_token.is_empty() => Err(
            AuthError::InvalidCredential("Facebook credential requires access_token".to_string()),
        ),
        Credential::OAuth { id_token: None, access_token: None, .. } => Err(AuthError::InvalidCredential(
            "OAuth credential requires id_token or access_token".to_string(),
        )),
        Credential::EmailPassword { .. } => Err(AuthError::InvalidCredential(
            "token sources must yield provider credentials".to_string(),
        )),
        _ => Ok(()),
    }
}

#[async_trait]
impl<T: TokenSource> SocialAuth for IdpAuth<T> {
    async fn sign_in(&self) -> Result<Arc<User>, FirebaseError> {
        let credential = self.credential().await?;
        self.auth.sign_in_with_credential(credential).await
    }

    async fn link(&self) -> Result<Arc<User>, FirebaseError> {
        let credential = self.credential().await?;
        self.auth.link_with_credential(credential).await
    }

    async fn sign_out(&self) -> Result<(), FirebaseError> {
        self.token_source.sign_out().await
    }
}

impl<T> std::fmt::Debug for IdpAuth<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdpAuth").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_requires_a_token() {
        let cred = Credential::Google {
            id_token: None,
            access_token: None,
        };
        assert!(matches!(validate(&cred), Err(AuthError::InvalidCredential(_))));

        let cred = Credential::Google {
            id_token: Some("id".to_string()),
            access_token: None,
        };
        assert!(validate(&cred).is_ok());
    }

    #[test]
    fn test_facebook_requires_access_token() {
        let cred = Credential::Facebook {
            access_token: String::new(),
        };
        assert!(validate(&cred).is_err());
    }

    #[test]
    fn test_email_password_is_not_a_provider_credential() {
        let cred = Credential::EmailPassword {
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
        };
        assert!(validate(&cred).is_err());
    }
}
