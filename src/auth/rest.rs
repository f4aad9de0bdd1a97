//! Identity Toolkit REST backend
//!
//! [`RestAuth`] implements [`NativeAuth`] on top of the Firebase Auth REST
//! API so the façade can run without a platform SDK (desktop, server-side
//! tools, the Auth emulator). It keeps the signed-in user and the pending
//! phone verification session in memory; tokens are not refreshed.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use firebase_plugin::auth::{NativeAuth, RestAuth};
//!
//! let auth = RestAuth::new("YOUR_API_KEY")?;
//! let user = auth.sign_in_with_email_and_password("user@example.com", "password").await?;
//! println!("Signed in: {}", user.uid);
//! # Ok(())
//! # }
//! ```

use crate::auth::native::{NativeAuth, TokenSource};
use crate::auth::types::{provider_ids, Credential, User, UserInfo, UserMetadata};
use crate::config::{ActionCodeSettings, AppOptions};
use crate::error::{AuthError, FirebaseError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const IDP_REQUEST_URI: &str = "http://localhost";

/// Firebase Auth over the Identity Toolkit REST API
pub struct RestAuth {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
    current_user: RwLock<Option<Arc<User>>>,
    phone_session: RwLock<Option<String>>,
    recaptcha_token: RwLock<Option<String>>,
    apple: Option<Arc<dyn TokenSource>>,
}

impl RestAuth {
    /// Create a backend for `api_key` with its own HTTP client
    pub fn new(api_key: impl Into<String>) -> Result<Self, FirebaseError> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| FirebaseError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Self::with_client(http_client, api_key, DEFAULT_BASE_URL)
    }

    /// Create a backend from project options, honouring the emulator host
    pub fn from_options(http_client: reqwest::Client, options: &AppOptions) -> Result<Self, FirebaseError> {
        options.validate()?;
        Self::with_client(http_client, options.api_key.clone(), options.identity_toolkit_url())
    }

    /// Create a backend with an explicit client and base URL
    pub fn with_client(
        http_client: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, FirebaseError> {
        let api_key: String = api_key.into();
        let base_url: String = base_url.into();

        // Validate API key (error case first)
        if api_key.is_empty() {
            return Err(FirebaseError::config("API key not configured"));
        }

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            current_user: RwLock::new(None),
            phone_session: RwLock::new(None),
            recaptcha_token: RwLock::new(None),
            apple: None,
        })
    }

    /// Enable Sign in with Apple through a platform token source
    pub fn with_apple(mut self, apple: Arc<dyn TokenSource>) -> Self {
        self.apple = Some(apple);
        self
    }

    /// reCAPTCHA token sent with the next phone verification request.
    ///
    /// Production projects reject `sendVerificationCode` without one; the
    /// emulator does not need it.
    pub async fn set_recaptcha_token(&self, token: impl Into<String>) {
        *self.recaptcha_token.write().await = Some(token.into());
    }

    /// Get the API key for this backend
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Re-read the signed-in account from `accounts:lookup`
    pub async fn reload(&self) -> Result<Arc<User>, FirebaseError> {
        let current = self.require_user().await?;
        let id_token = id_token_of(&current)?;

        let response: LookupResponse = self
            .post("accounts:lookup", &json!({ "idToken": id_token }))
            .await?;
        let Some(account) = response.users.into_iter().next() else {
            return Err(AuthError::UserNotFound.into());
        };

        let mut user = account.into_user();
        user.id_token = current.id_token.clone();
        user.refresh_token = current.refresh_token.clone();
        user.token_expiration = current.token_expiration;

        let user = Arc::new(user);
        self.set_current_user(Some(Arc::clone(&user))).await;
        Ok(user)
    }

    async fn set_current_user(&self, user: Option<Arc<User>>) {
        *self.current_user.write().await = user;
    }

    async fn require_user(&self) -> Result<Arc<User>, FirebaseError> {
        self.current_user
            .read()
            .await
            .clone()
            .ok_or_else(|| AuthError::NoSignedInUser.into())
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}?key={}", self.base_url, method, self.api_key)
    }

    async fn post<B, R>(&self, method: &str, body: &B) -> Result<R, FirebaseError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await?;

        // Handle error responses first
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            let error = error_from_body(status, &body);
            tracing::debug!(method, %status, error = %error, "identity toolkit rejected request");
            return Err(error.into());
        }

        Ok(response.json().await?)
    }

    /// Run a token-issuing call and make its user current
    async fn sign_in_via(&self, method: &str, body: serde_json::Value, anonymous: bool) -> Result<Arc<User>, FirebaseError> {
        let response: SignInResponse = self.post(method, &body).await?;
        let mut user = response.into_user();
        user.is_anonymous = anonymous;

        let user = Arc::new(user);
        self.set_current_user(Some(Arc::clone(&user))).await;
        tracing::debug!(method, uid = %user.uid, "identity toolkit sign-in");
        Ok(user)
    }

    /// Link call: the result keeps the profile of the current user and adds
    /// the new provider
    async fn link_via(&self, method: &str, mut body: serde_json::Value, provider_id: &str) -> Result<Arc<User>, FirebaseError> {
        let current = self.require_user().await?;
        body["idToken"] = json!(id_token_of(&current)?);

        let response: SignInResponse = self.post(method, &body).await?;
        let mut user = (*current).clone();
        user.is_anonymous = false;
        if user.email.is_none() {
            user.email = response.email.clone();
        }
        if user.phone_number.is_none() {
            user.phone_number = response.phone_number.clone();
        }
        if !user.is_linked_to(provider_id) {
            user = user.with_provider(provider_id);
        }
        if let Some(token) = response.id_token {
            user.id_token = Some(token);
        }
        if let Some(token) = response.refresh_token {
            user.refresh_token = Some(token);
        }

        let user = Arc::new(user);
        self.set_current_user(Some(Arc::clone(&user))).await;
        Ok(user)
    }

    async fn pending_phone_session(&self) -> Result<String, FirebaseError> {
        self.phone_session
            .read()
            .await
            .clone()
            .ok_or_else(|| AuthError::MissingVerificationId.into())
    }

    /// Drop the session once a code was accepted, unless a newer
    /// verification replaced it meanwhile
    async fn finish_phone_session(&self, session_info: &str) {
        let mut pending = self.phone_session.write().await;
        if pending.as_deref() == Some(session_info) {
            *pending = None;
        }
    }
}

/// Map an error response to an [`AuthError`]; bodies that are not the
/// Identity Toolkit JSON envelope (proxy pages, empty bodies) keep the status
fn error_from_body(status: reqwest::StatusCode, body: &str) -> AuthError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string));
    match message {
        Some(code) => AuthError::from_error_code(&code),
        None => AuthError::Unknown(status.to_string()),
    }
}

fn id_token_of(user: &User) -> Result<String, AuthError> {
    user.id_token.clone().ok_or(AuthError::InvalidUserToken)
}

fn validate_email_password(email: &str, password: &str) -> Result<(), AuthError> {
    // Validate email (error case first)
    if email.is_empty() {
        return Err(AuthError::InvalidEmail);
    }
    if password.is_empty() {
        return Err(AuthError::InvalidPassword);
    }
    Ok(())
}

/// `postBody` of a `signInWithIdp` request
fn idp_post_body(credential: &Credential) -> Result<String, AuthError> {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    match credential {
        // Error-first: unsupported credential types
        Credential::EmailPassword { .. } => {
            return Err(AuthError::InvalidCredential(
                "Use sign_in_with_email_and_password() for email/password auth".to_string(),
            ));
        }
        Credential::Google { id_token, access_token } => {
            if id_token.is_none() && access_token.is_none() {
                return Err(AuthError::InvalidCredential(
                    "Google credential requires id_token or access_token".to_string(),
                ));
            }
            params.append_pair("providerId", provider_ids::GOOGLE);
            if let Some(t) = id_token {
                params.append_pair("id_token", t);
            }
            if let Some(t) = access_token {
                params.append_pair("access_token", t);
            }
        }
        Credential::Facebook { access_token } => {
            params.append_pair("providerId", provider_ids::FACEBOOK);
            params.append_pair("access_token", access_token);
        }
        Credential::OAuth { provider_id, id_token, access_token, raw_nonce } => {
            if id_token.is_none() && access_token.is_none() {
                return Err(AuthError::InvalidCredential(
                    "OAuth credential requires id_token or access_token".to_string(),
                ));
            }
            params.append_pair("providerId", provider_id);
            if let Some(t) = id_token {
                params.append_pair("id_token", t);
            }
            if let Some(t) = access_token {
                params.append_pair("access_token", t);
            }
            if let Some(n) = raw_nonce {
                params.append_pair("nonce", n);
            }
        }
    }
    Ok(params.finish())
}

/// Query parameter `name` of `link`, looking inside a nested `link` or
/// `deep_link_id` parameter when it is not at the top level
fn link_param(link: &str, name: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == name) {
        return Some(v.into_owned());
    }

    let nested = url
        .query_pairs()
        .filter(|(k, _)| k == "link" || k == "deep_link_id")
        .filter_map(|(_, nested)| Url::parse(&nested).ok())
        .find_map(|nested| {
            nested
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        });
    nested
}

fn oob_code(link: &str) -> Option<String> {
    match link_param(link, "mode").as_deref() {
        Some("signIn") => link_param(link, "oobCode").filter(|c| !c.is_empty()),
        _ => None,
    }
}

#[async_trait]
impl NativeAuth for RestAuth {
    async fn current_user(&self) -> Option<Arc<User>> {
        self.current_user.read().await.clone()
    }

    async fn sign_in_anonymously(&self) -> Result<Arc<User>, FirebaseError> {
        // signUp with no email/password creates anonymous user
        self.sign_in_via("accounts:signUp", json!({ "returnSecureToken": true }), true)
            .await
    }

    async fn sign_in_with_email_and_password(&self, email: &str, password: &str) -> Result<Arc<User>, FirebaseError> {
        validate_email_password(email, password)?;
        self.sign_in_via(
            "accounts:signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
            false,
        )
        .await
    }

    async fn sign_in_with_email_link(&self, email: &str, link: &str) -> Result<Arc<User>, FirebaseError> {
        if email.is_empty() {
            return Err(AuthError::InvalidEmail.into());
        }
        let Some(code) = oob_code(link) else {
            return Err(AuthError::InvalidActionCode.into());
        };

        self.sign_in_via(
            "accounts:signInWithEmailLink",
            json!({ "email": email, "oobCode": code, "returnSecureToken": true }),
            false,
        )
        .await
    }

    async fn sign_in_with_apple(&self) -> Result<Arc<User>, FirebaseError> {
        let Some(apple) = &self.apple else {
            return Err(AuthError::OperationNotAllowed.into());
        };
        let credential = apple.fetch_credential().await?;
        self.sign_in_with_credential(credential).await
    }

    async fn sign_in_with_credential(&self, credential: Credential) -> Result<Arc<User>, FirebaseError> {
        let post_body = idp_post_body(&credential)?;
        self.sign_in_via(
            "accounts:signInWithIdp",
            json!({
                "postBody": post_body,
                "requestUri": IDP_REQUEST_URI,
                "returnSecureToken": true,
                "returnIdpCredential": true
            }),
            false,
        )
        .await
    }

    async fn verify_phone_number(&self, phone_number: &str) -> Result<(), FirebaseError> {
        if phone_number.is_empty() {
            return Err(AuthError::InvalidPhoneNumber.into());
        }

        let mut body = json!({ "phoneNumber": phone_number });
        if let Some(token) = self.recaptcha_token.read().await.clone() {
            body["recaptchaToken"] = json!(token);
        }

        let response: VerificationResponse = self.post("accounts:sendVerificationCode", &body).await?;
        *self.phone_session.write().await = Some(response.session_info);
        Ok(())
    }

    async fn sign_in_with_phone_number_verification_code(&self, code: &str) -> Result<Arc<User>, FirebaseError> {
        if code.is_empty() {
            return Err(AuthError::InvalidVerificationCode.into());
        }
        let session_info = self.pending_phone_session().await?;

        let user = self
            .sign_in_via(
                "accounts:signInWithPhoneNumber",
                json!({ "sessionInfo": session_info, "code": code }),
                false,
            )
            .await?;
        self.finish_phone_session(&session_info).await;
        Ok(user)
    }

    async fn link_with_email_and_password(&self, email: &str, password: &str) -> Result<Arc<User>, FirebaseError> {
        validate_email_password(email, password)?;
        self.link_via(
            "accounts:update",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
            provider_ids::PASSWORD,
        )
        .await
    }

    async fn link_with_phone_number_verification_code(&self, code: &str) -> Result<Arc<User>, FirebaseError> {
        if code.is_empty() {
            return Err(AuthError::InvalidVerificationCode.into());
        }
        // Error-first: linking needs a signed-in user
        self.require_user().await?;
        let session_info = self.pending_phone_session().await?;

        let user = self
            .link_via(
                "accounts:signInWithPhoneNumber",
                json!({ "sessionInfo": session_info, "code": code }),
                provider_ids::PHONE,
            )
            .await?;
        self.finish_phone_session(&session_info).await;
        Ok(user)
    }

    async fn link_with_credential(&self, credential: Credential) -> Result<Arc<User>, FirebaseError> {
        let post_body = idp_post_body(&credential)?;
        self.link_via(
            "accounts:signInWithIdp",
            json!({
                "postBody": post_body,
                "requestUri": IDP_REQUEST_URI,
                "returnSecureToken": true,
                "returnIdpCredential": true
            }),
            credential.provider_id(),
        )
        .await
    }

    async fn unlink(&self, provider_id: &str) -> Result<(), FirebaseError> {
        let current = self.require_user().await?;
        if !current.provider_data.is_empty() && !current.is_linked_to(provider_id) {
            return Err(AuthError::NoSuchProvider(provider_id.to_string()).into());
        }

        let _: serde_json::Value = self
            .post(
                "accounts:update",
                &json!({ "idToken": id_token_of(&current)?, "deleteProvider": [provider_id] }),
            )
            .await?;

        // Reflect the removal locally; `reload` refreshes the full profile.
        let mut user = (*current).clone();
        user.provider_data.retain(|p| p.provider_id != provider_id);
        self.set_current_user(Some(Arc::new(user))).await;
        Ok(())
    }

    async fn send_sign_in_link(&self, email: &str, settings: &ActionCodeSettings) -> Result<(), FirebaseError> {
        if email.is_empty() {
            return Err(AuthError::InvalidEmail.into());
        }

        let mut body = json!({
            "requestType": "EMAIL_SIGNIN",
            "email": email,
            "continueUrl": settings.url,
            "canHandleCodeInApp": settings.handle_code_in_app,
            "androidInstallApp": settings.android_install_app,
        });
        if let Some(id) = &settings.ios_bundle_id {
            body["iOSBundleId"] = json!(id);
        }
        if let Some(package) = &settings.android_package_name {
            body["androidPackageName"] = json!(package);
        }
        if let Some(version) = &settings.android_minimum_version {
            body["androidMinimumVersion"] = json!(version);
        }
        if let Some(domain) = &settings.dynamic_link_domain {
            body["dynamicLinkDomain"] = json!(domain);
        }

        let _: serde_json::Value = self.post("accounts:sendOobCode", &body).await?;
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), FirebaseError> {
        self.set_current_user(None).await;
        *self.phone_session.write().await = None;
        Ok(())
    }

    async fn fetch_sign_in_methods(&self, email: &str) -> Result<Vec<String>, FirebaseError> {
        if email.is_empty() {
            return Err(AuthError::InvalidEmail.into());
        }

        let response: CreateAuthUriResponse = self
            .post(
                "accounts:createAuthUri",
                &json!({ "identifier": email, "continueUri": IDP_REQUEST_URI }),
            )
            .await?;
        Ok(response.signin_methods)
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), FirebaseError> {
        // Validate email (error case first)
        if email.is_empty() {
            return Err(AuthError::InvalidEmail.into());
        }

        let _: serde_json::Value = self
            .post(
                "accounts:sendOobCode",
                &json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        Ok(())
    }

    fn is_sign_in_with_email_link(&self, link: &str) -> bool {
        oob_code(link).is_some()
    }
}

impl std::fmt::Debug for RestAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestAuth")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Token-issuing response (signUp, signInWith*)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    #[serde(default)]
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    phone_number: Option<String>,
    provider_id: Option<String>,
    #[serde(default)]
    email_verified: bool,
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<String>,
}

impl SignInResponse {
    fn into_user(self) -> User {
        // expires_in is in seconds; default 1 hour
        let now = chrono::Utc::now();
        let token_expiration = self
            .expires_in
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .map(|seconds| now.timestamp() + seconds)
            .or(Some(now.timestamp() + 3600));

        let provider_data = self
            .provider_id
            .iter()
            .map(|provider_id| UserInfo {
                uid: self.local_id.clone(),
                display_name: self.display_name.clone(),
                email: self.email.clone(),
                phone_number: self.phone_number.clone(),
                photo_url: self.photo_url.clone(),
                provider_id: provider_id.clone(),
            })
            .collect();

        User {
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
            phone_number: self.phone_number,
            email_verified: self.email_verified,
            is_anonymous: false,
            metadata: UserMetadata {
                creation_timestamp: now.timestamp_millis(),
                last_sign_in_timestamp: now.timestamp_millis(),
            },
            provider_data,
            id_token: self.id_token,
            refresh_token: self.refresh_token,
            token_expiration,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationResponse {
    session_info: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAuthUriResponse {
    #[serde(default)]
    signin_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<AccountInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountInfo {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    phone_number: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    provider_user_info: Vec<ProviderUserInfo>,
    created_at: Option<String>,
    last_login_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderUserInfo {
    provider_id: String,
    raw_id: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    phone_number: Option<String>,
}

impl AccountInfo {
    fn into_user(self) -> User {
        let millis = |s: Option<String>| s.and_then(|v| v.parse::<i64>().ok()).unwrap_or_default();
        let provider_data = self
            .provider_user_info
            .into_iter()
            .map(|p| UserInfo {
                uid: p.raw_id.unwrap_or_else(|| self.local_id.clone()),
                display_name: p.display_name,
                email: p.email,
                phone_number: p.phone_number,
                photo_url: p.photo_url,
                provider_id: p.provider_id,
            })
            .collect::<Vec<_>>();

        User {
            is_anonymous: provider_data.is_empty() && self.email.is_none() && self.phone_number.is_none(),
            uid: self.local_id,
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
            phone_number: self.phone_number,
            email_verified: self.email_verified,
            metadata: UserMetadata {
                creation_timestamp: millis(self.created_at),
                last_sign_in_timestamp: millis(self.last_login_at),
            },
            provider_data,
            id_token: None,
            refresh_token: None,
            token_expiration: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> RestAuth {
        RestAuth::with_client(reqwest::Client::new(), "test_key", "http://127.0.0.1:9/v1").unwrap()
    }

    const LINK: &str = "https://playground-24cec.firebaseapp.com/__/auth/action?apiKey=k&mode=signIn&oobCode=ABC123&continueUrl=https%3A%2F%2Fexample.com";

    #[test]
    fn test_empty_api_key_error() {
        let result = RestAuth::with_client(reqwest::Client::new(), "", DEFAULT_BASE_URL);
        assert!(matches!(result, Err(FirebaseError::Config(_))));
    }

    #[test]
    fn test_endpoint_format() {
        let auth = RestAuth::with_client(reqwest::Client::new(), "k", "http://host/v1/").unwrap();
        assert_eq!(auth.endpoint("accounts:signUp"), "http://host/v1/accounts:signUp?key=k");
    }

    #[test]
    fn test_sign_in_link_detection() {
        let auth = backend();
        assert!(auth.is_sign_in_with_email_link(LINK));
        assert!(!auth.is_sign_in_with_email_link("https://example.com/?mode=resetPassword&oobCode=X"));
        assert!(!auth.is_sign_in_with_email_link("https://example.com/?mode=signIn"));
        assert!(!auth.is_sign_in_with_email_link("not a url"));
    }

    #[test]
    fn test_sign_in_link_nested_in_dynamic_link() {
        let auth = backend();
        let wrapped = format!(
            "https://example.page.link/?link={}",
            url::form_urlencoded::byte_serialize(LINK.as_bytes()).collect::<String>()
        );
        assert!(auth.is_sign_in_with_email_link(&wrapped));
        assert_eq!(oob_code(&wrapped).as_deref(), Some("ABC123"));
    }

    #[test]
    fn test_idp_post_body() {
        let google = Credential::Google {
            id_token: Some("id tok".to_string()),
            access_token: None,
        };
        assert_eq!(idp_post_body(&google).unwrap(), "providerId=google.com&id_token=id+tok");

        let apple = Credential::OAuth {
            provider_id: "apple.com".to_string(),
            id_token: Some("jwt".to_string()),
            access_token: None,
            raw_nonce: Some("n".to_string()),
        };
        assert_eq!(idp_post_body(&apple).unwrap(), "providerId=apple.com&id_token=jwt&nonce=n");
    }

    #[test]
    fn test_idp_post_body_rejects_email_password() {
        let cred = Credential::EmailPassword {
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
        };
        assert!(matches!(idp_post_body(&cred), Err(AuthError::InvalidCredential(_))));
    }

    #[tokio::test]
    async fn test_sign_in_validates_email() {
        let auth = backend();
        let result = auth.sign_in_with_email_and_password("", "password").await;
        assert!(matches!(result, Err(FirebaseError::Auth(AuthError::InvalidEmail))));
    }

    #[tokio::test]
    async fn test_sign_in_validates_password() {
        let auth = backend();
        let result = auth.sign_in_with_email_and_password("test@example.com", "").await;
        assert!(matches!(result, Err(FirebaseError::Auth(AuthError::InvalidPassword))));
    }

    #[tokio::test]
    async fn test_email_link_requires_valid_link() {
        let auth = backend();
        let result = auth
            .sign_in_with_email_link("user@example.com", "https://example.com/")
            .await;
        assert!(matches!(result, Err(FirebaseError::Auth(AuthError::InvalidActionCode))));
    }

    #[tokio::test]
    async fn test_link_requires_signed_in_user() {
        let auth = backend();
        let result = auth.link_with_email_and_password("a@b.c", "secret").await;
        assert!(matches!(result, Err(FirebaseError::Auth(AuthError::NoSignedInUser))));
    }

    #[tokio::test]
    async fn test_phone_code_requires_verification() {
        let auth = backend();
        let result = auth.sign_in_with_phone_number_verification_code("123456").await;
        assert!(matches!(result, Err(FirebaseError::Auth(AuthError::MissingVerificationId))));
    }

    #[tokio::test]
    async fn test_apple_without_token_source() {
        let auth = backend();
        let result = auth.sign_in_with_apple().await;
        assert!(matches!(result, Err(FirebaseError::Auth(AuthError::OperationNotAllowed))));
    }

    #[tokio::test]
    async fn test_unlink_unknown_provider() {
        let auth = backend();
        let user = User::new("u1").with_provider(provider_ids::GOOGLE);
        auth.set_current_user(Some(Arc::new(user))).await;

        let result = auth.unlink(provider_ids::FACEBOOK).await;
        assert!(matches!(result, Err(FirebaseError::Auth(AuthError::NoSuchProvider(_)))));
    }

    #[tokio::test]
    async fn test_sign_out_clears_user() {
        let auth = backend();
        auth.set_current_user(Some(Arc::new(User::new("u1")))).await;
        assert!(auth.current_user().await.is_some());

        auth.sign_out().await.unwrap();
        assert!(auth.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_password_reset_validates_email() {
        let auth = backend();
        let result = auth.send_password_reset_email("").await;
        assert!(matches!(result, Err(FirebaseError::Auth(AuthError::InvalidEmail))));
    }

    #[test]
    fn test_sign_in_response_into_user() {
        let response: SignInResponse = serde_json::from_value(json!({
            "localId": "uid1",
            "email": "user@example.com",
            "idToken": "tok",
            "refreshToken": "ref",
            "expiresIn": "3600",
            "providerId": "google.com"
        }))
        .unwrap();

        let user = response.into_user();
        assert_eq!(user.uid, "uid1");
        assert_eq!(user.id_token(), Some("tok"));
        assert!(user.is_linked_to("google.com"));
        assert!(!user.token_expires_within(300));
    }

    #[test]
    fn test_lookup_account_into_user() {
        let response: LookupResponse = serde_json::from_value(json!({
            "users": [{
                "localId": "uid1",
                "email": "user@example.com",
                "emailVerified": true,
                "providerUserInfo": [{"providerId": "password", "email": "user@example.com"}],
                "createdAt": "1700000000000",
                "lastLoginAt": "1700000001000"
            }]
        }))
        .unwrap();

        let user = response.users.into_iter().next().unwrap().into_user();
        assert!(user.email_verified);
        assert!(!user.is_anonymous);
        assert!(user.is_linked_to("password"));
        assert_eq!(user.metadata.creation_timestamp, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_failed_code_keeps_phone_session() {
        let auth = backend();
        *auth.phone_session.write().await = Some("session-1".to_string());

        // Nothing listens on the backend port, so the request fails
        let result = auth.sign_in_with_phone_number_verification_code("123456").await;

        assert!(result.is_err());
        assert_eq!(auth.phone_session.read().await.as_deref(), Some("session-1"));
    }

    #[tokio::test]
    async fn test_failed_phone_link_keeps_phone_session() {
        let auth = backend();
        let mut user = User::new("u1");
        user.id_token = Some("tok".to_string());
        auth.set_current_user(Some(Arc::new(user))).await;
        *auth.phone_session.write().await = Some("session-1".to_string());

        let result = auth.link_with_phone_number_verification_code("123456").await;

        assert!(result.is_err());
        assert_eq!(auth.phone_session.read().await.as_deref(), Some("session-1"));
    }

    #[tokio::test]
    async fn test_finish_phone_session_keeps_newer_session() {
        let auth = backend();
        *auth.phone_session.write().await = Some("session-2".to_string());

        auth.finish_phone_session("session-1").await;
        assert_eq!(auth.phone_session.read().await.as_deref(), Some("session-2"));

        auth.finish_phone_session("session-2").await;
        assert!(auth.phone_session.read().await.is_none());
    }

    #[test]
    fn test_error_body_maps_identity_toolkit_code() {
        let body = r#"{"error": {"code": 400, "message": "INVALID_CODE : bad code"}}"#;
        assert_eq!(
            error_from_body(reqwest::StatusCode::BAD_REQUEST, body),
            AuthError::InvalidVerificationCode
        );
    }

    #[test]
    fn test_non_json_error_body_keeps_status() {
        let body = "<html><body>502 Bad Gateway</body></html>";
        assert_eq!(
            error_from_body(reqwest::StatusCode::BAD_GATEWAY, body),
            AuthError::Unknown("502 Bad Gateway".to_string())
        );
        assert_eq!(
            error_from_body(reqwest::StatusCode::SERVICE_UNAVAILABLE, ""),
            AuthError::Unknown("503 Service Unavailable".to_string())
        );
    }
}
