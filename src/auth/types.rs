//! Authentication types

use serde::{Deserialize, Serialize};

/// Well-known provider ids
pub mod provider_ids {
    /// Email and password / email link
    pub const PASSWORD: &str = "password";
    /// Phone number
    pub const PHONE: &str = "phone";
    /// Google Sign-In
    pub const GOOGLE: &str = "google.com";
    /// Facebook Login
    pub const FACEBOOK: &str = "facebook.com";
    /// Sign in with Apple
    pub const APPLE: &str = "apple.com";
}

/// User metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Timestamp when user was created (Unix timestamp in milliseconds)
    pub creation_timestamp: i64,

    /// Timestamp of last sign-in (Unix timestamp in milliseconds)
    pub last_sign_in_timestamp: i64,
}

/// User information returned from identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// User ID from the provider
    pub uid: String,

    /// Display name
    pub display_name: Option<String>,

    /// Email address
    pub email: Option<String>,

    /// Phone number
    pub phone_number: Option<String>,

    /// Photo URL
    pub photo_url: Option<String>,

    /// Provider ID (e.g., "password", "google.com")
    pub provider_id: String,
}

/// Credential obtained from an identity provider
#[derive(Debug, Clone)]
pub enum Credential {
    /// Email and password credential
    EmailPassword {
        /// Email address
        email: String,
        /// Password
        password: String,
    },

    /// Google OAuth credential
    Google {
        /// Google Sign-In ID token
        id_token: Option<String>,
        /// Google Sign-In access token
        access_token: Option<String>,
    },

    /// Facebook OAuth credential
    Facebook {
        /// Facebook access token
        access_token: String,
    },

    /// Generic OAuth2 / OIDC credential (Apple, Microsoft, ...)
    OAuth {
        /// Provider ID (e.g., "apple.com")
        provider_id: String,
        /// ID token (OIDC)
        id_token: Option<String>,
        /// Access token
        access_token: Option<String>,
        /// Raw nonce used to mint the ID token
        raw_nonce: Option<String>,
    },
}

impl Credential {
    /// Get the provider ID for this credential
    pub fn provider_id(&self) -> &str {
        match self {
            Credential::EmailPassword { .. } => provider_ids::PASSWORD,
            Credential::Google { .. } => provider_ids::GOOGLE,
            Credential::Facebook { .. } => provider_ids::FACEBOOK,
            Credential::OAuth { provider_id, .. } => provider_id,
        }
    }
}

/// Firebase user account
///
/// Shared as `Arc<User>`; a new value is published whenever the account
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique Firebase user ID
    pub uid: String,

    /// Email address (if available)
    pub email: Option<String>,

    /// Display name (if available)
    pub display_name: Option<String>,

    /// Photo URL (if available)
    pub photo_url: Option<String>,

    /// Phone number (if available)
    pub phone_number: Option<String>,

    /// Whether email is verified
    pub email_verified: bool,

    /// Whether user is anonymous
    pub is_anonymous: bool,

    /// User metadata
    pub metadata: UserMetadata,

    /// Provider data for this user
    pub provider_data: Vec<UserInfo>,

    /// ID token (JWT) - internal use
    #[serde(skip)]
    pub(crate) id_token: Option<String>,

    /// Refresh token - internal use
    #[serde(skip)]
    pub(crate) refresh_token: Option<String>,

    /// Token expiration timestamp (seconds since epoch) - internal use
    #[serde(skip)]
    pub(crate) token_expiration: Option<i64>,
}

impl User {
    /// Minimal user with only a uid; used by collaborators that do not
    /// expose profile data
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
            phone_number: None,
            email_verified: false,
            is_anonymous: false,
            metadata: UserMetadata::default(),
            provider_data: vec![],
            id_token: None,
            refresh_token: None,
            token_expiration: None,
        }
    }

    /// Builder-style email setter
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder-style anonymous flag
    pub fn anonymous(mut self) -> Self {
        self.is_anonymous = true;
        self
    }

    /// Builder-style linked provider
    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_data.push(UserInfo {
            uid: self.uid.clone(),
            display_name: None,
            email: self.email.clone(),
            phone_number: None,
            photo_url: None,
            provider_id: provider_id.into(),
        });
        self
    }

    /// Provider ids linked to this account
    pub fn provider_ids(&self) -> impl Iterator<Item = &str> {
        self.provider_data.iter().map(|p| p.provider_id.as_str())
    }

    /// Whether `provider_id` is linked to this account
    pub fn is_linked_to(&self, provider_id: &str) -> bool {
        self.provider_ids().any(|p| p == provider_id)
    }

    /// ID token of the last sign-in, if issued by a REST backend
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    /// Whether the cached ID token expires within `leeway_secs`
    pub fn token_expires_within(&self, leeway_secs: i64) -> bool {
        match self.token_expiration {
            Some(expiration) => chrono::Utc::now().timestamp() >= expiration - leeway_secs,
            None => false,
        }
    }
}
