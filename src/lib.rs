//! Firebase plugin
//!
//! One async interface over Firebase Authentication, Cloud Messaging
//! payloads and Analytics. Vendor SDKs are reached through traits; REST
//! implementations are included for desktop use and the Auth emulator.
//!
//! # Example (anonymous sign-in)
//! ```no_run
//! # async fn example(google: impl firebase_plugin::auth::TokenSource + 'static,
//! #                  facebook: impl firebase_plugin::auth::TokenSource + 'static)
//! #     -> Result<(), Box<dyn std::error::Error>> {
//! use firebase_plugin::{App, AppOptions, AuthServiceConfig, MemoryPreferences};
//! use std::sync::Arc;
//!
//! let app = App::new(AppOptions::from_env()?)?;
//! let auth = Arc::new(app.rest_auth()?);
//! let service = app
//!     .auth_service(auth, google, facebook, Arc::new(MemoryPreferences::new()), AuthServiceConfig::default())
//!     .await;
//!
//! let user = service.sign_in_anonymously().await?;
//! println!("Signed in: {}", user.uid);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analytics;
pub mod app;
pub mod auth;
pub mod bundle;
pub mod config;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod preferences;
pub mod subject;

// Re-exports for convenience
pub use analytics::{Analytics, AnalyticsSink};
pub use app::App;
pub use auth::{AuthService, Credential, User};
pub use bundle::{Bundle, BundleValue};
pub use config::{ActionCodeSettings, AppOptions, AuthServiceConfig};
pub use error::{AuthError, FirebaseError, MessagingError};
pub use messaging::{FcmNotification, Intent, RemoteMessage};
pub use preferences::{JsonFilePreferences, MemoryPreferences, Preferences};
