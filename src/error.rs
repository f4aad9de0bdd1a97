//! Firebase plugin error types
//!
//! Provides a unified error type for every façade in the crate.
//!
//! # Design
//! Uses thiserror for ergonomic error definitions. All errors implement
//! std::error::Error and can be converted to FirebaseError via From trait.
//! Callers treat `FirebaseError` as a single failure category; the variants
//! only carry diagnostic detail.

use std::backtrace::Backtrace;
use std::error::Error as StdError;
use thiserror::Error;

/// Top-level Firebase plugin error type
///
/// # Example
/// ```
/// use firebase_plugin::{FirebaseError, AuthError};
///
/// let auth_err: FirebaseError = AuthError::InvalidEmail.into();
/// ```
#[derive(Debug, Error)]
pub enum FirebaseError {
    /// Authentication-related errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cloud messaging payload errors
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    /// Preferences store errors
    #[error("Preferences error: {0}")]
    Preferences(String),

    /// Network/HTTP errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Authentication errors
///
/// Maps Firebase Auth error codes to Rust enum variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Email address is invalid
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password is invalid
    #[error("Invalid password")]
    InvalidPassword,

    /// Email already in use by another account
    #[error("Email already in use")]
    EmailAlreadyInUse,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Wrong password
    #[error("Wrong password")]
    WrongPassword,

    /// User account has been disabled
    #[error("User account disabled")]
    UserDisabled,

    /// Too many failed login attempts
    #[error("Too many requests, try again later")]
    TooManyRequests,

    /// Operation not allowed (e.g., provider disabled)
    #[error("Operation not allowed")]
    OperationNotAllowed,

    /// Invalid credential
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),

    /// User token has expired
    #[error("User token expired")]
    UserTokenExpired,

    /// Invalid user token
    #[error("Invalid user token")]
    InvalidUserToken,

    /// Network error
    #[error("Network error: {0}")]
    NetworkRequestFailed(String),

    /// No signed-in user
    #[error("No user is currently signed in")]
    NoSignedInUser,

    /// Requires recent login
    #[error("This operation requires recent authentication")]
    RequiresRecentLogin,

    /// Invalid API key
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Account exists with different credential
    #[error("Account exists with different credential")]
    AccountExistsWithDifferentCredential,

    /// Credential is already linked to another account
    #[error("Credential already in use by another account")]
    CredentialAlreadyInUse,

    /// Provider is already linked to the current user
    #[error("Provider already linked")]
    ProviderAlreadyLinked,

    /// Provider is not linked to the current user
    #[error("No such provider: {0}")]
    NoSuchProvider(String),

    /// Invalid action code (sign-in link, password reset)
    #[error("Invalid action code")]
    InvalidActionCode,

    /// Action code expired
    #[error("Action code expired")]
    ExpiredActionCode,

    /// Phone number is malformed
    #[error("Invalid phone number")]
    InvalidPhoneNumber,

    /// SMS code is invalid
    #[error("Invalid verification code")]
    InvalidVerificationCode,

    /// No phone verification is in progress
    #[error("Phone number verification has not been started")]
    MissingVerificationId,

    /// Interactive provider flow was aborted by the user
    #[error("Sign-in cancelled")]
    Cancelled,

    /// Unknown error with the raw backend code
    #[error("Unknown auth error: {0}")]
    Unknown(String),
}

/// Cloud messaging payload errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessagingError {
    /// A required bundle entry is missing
    #[error("Missing bundle entry: {0}")]
    MissingBundle(String),

    /// The payload does not have the expected shape
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl FirebaseError {
    /// Create an internal error from a string
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a configuration error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Check if error indicates authentication is required
    pub fn requires_auth(&self) -> bool {
        matches!(
            self,
            Self::Auth(AuthError::NoSignedInUser)
                | Self::Auth(AuthError::RequiresRecentLogin)
                | Self::Auth(AuthError::UserTokenExpired)
                | Self::Auth(AuthError::InvalidUserToken)
        )
    }
}

impl AuthError {
    /// Create from Firebase Auth REST API error code
    ///
    /// The backend sometimes appends a human readable detail after the code
    /// (`"INVALID_OOB_CODE : The action code is invalid"`); only the code is
    /// considered.
    pub fn from_error_code(code: &str) -> Self {
        let code = code.split(" : ").next().unwrap_or(code).trim();
        match code {
            "EMAIL_NOT_FOUND" => Self::UserNotFound,
            "USER_NOT_FOUND" => Self::UserNotFound,
            "INVALID_PASSWORD" => Self::WrongPassword,
            "INVALID_LOGIN_CREDENTIALS" => Self::WrongPassword,
            "USER_DISABLED" => Self::UserDisabled,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyRequests,
            "EMAIL_EXISTS" => Self::EmailAlreadyInUse,
            "OPERATION_NOT_ALLOWED" => Self::OperationNotAllowed,
            "INVALID_EMAIL" => Self::InvalidEmail,
            "MISSING_EMAIL" => Self::InvalidEmail,
            "WEAK_PASSWORD" => Self::InvalidPassword,
            "MISSING_PASSWORD" => Self::InvalidPassword,
            "INVALID_ID_TOKEN" => Self::InvalidUserToken,
            "TOKEN_EXPIRED" => Self::UserTokenExpired,
            "INVALID_API_KEY" => Self::InvalidApiKey,
            "CREDENTIAL_TOO_OLD_LOGIN_AGAIN" => Self::RequiresRecentLogin,
            "FEDERATED_USER_ID_ALREADY_LINKED" => Self::CredentialAlreadyInUse,
            "PROVIDER_ALREADY_LINKED" => Self::ProviderAlreadyLinked,
            "NO_SUCH_PROVIDER" => Self::NoSuchProvider(String::new()),
            "INVALID_OOB_CODE" => Self::InvalidActionCode,
            "EXPIRED_OOB_CODE" => Self::ExpiredActionCode,
            "INVALID_PHONE_NUMBER" => Self::InvalidPhoneNumber,
            "INVALID_CODE" => Self::InvalidVerificationCode,
            "MISSING_CODE" => Self::InvalidVerificationCode,
            "INVALID_SESSION_INFO" => Self::MissingVerificationId,
            "SESSION_EXPIRED" => Self::InvalidVerificationCode,
            "INVALID_IDP_RESPONSE" => Self::InvalidCredential("identity provider rejected the token".to_string()),
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Log an error together with its full `source()` chain.
///
/// Each nested cause is emitted as its own record so that log aggregation
/// keeps the chain readable. A backtrace of the logging site is attached to
/// the top-level record (captured only when `RUST_BACKTRACE` is set).
pub fn log_error_chain(context: &str, err: &(dyn StdError + 'static)) {
    let backtrace = Backtrace::capture();
    tracing::error!(context, error = %err, backtrace = %backtrace, "operation failed");

    let mut depth = 0usize;
    let mut source = err.source();
    while let Some(cause) = source {
        depth += 1;
        tracing::error!(context, depth, cause = %cause, "caused by");
        source = cause.source();
    }
}
