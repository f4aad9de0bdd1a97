//! Firebase Authentication
//!
//! [`AuthService`] is the façade applications talk to. The backends it
//! drives are traits ([`NativeAuth`], [`SocialAuth`]) so platform SDKs can be
//! plugged in; [`RestAuth`] and [`IdpAuth`] are REST-based implementations.

pub mod native;
pub mod rest;
pub mod service;
pub mod social;
pub mod types;

pub use native::{NativeAuth, SocialAuth, TokenSource};
pub use rest::RestAuth;
pub use service::AuthService;
pub use social::IdpAuth;
pub use types::{provider_ids, Credential, User, UserInfo, UserMetadata};
