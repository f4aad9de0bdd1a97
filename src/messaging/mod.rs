//! Cloud Messaging payload adapter
//!
//! Converts between the native message shapes ([`RemoteMessage`],
//! [`Bundle`](crate::bundle::Bundle), [`Intent`]) and the canonical
//! [`FcmNotification`]. Pure structural mapping, no delivery.

pub mod message;
pub mod notification;

pub use message::{Intent, RemoteMessage, RemoteNotification};
pub use notification::FcmNotification;
