//! Canonical notification value

use crate::bundle::Bundle;
use crate::error::{FirebaseError, MessagingError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) const KEY_TITLE: &str = "title";
pub(crate) const KEY_BODY: &str = "body";
pub(crate) const KEY_DATA: &str = "data";

/// Platform independent push notification
///
/// Constructed from native messages, bundles and intents and convertible
/// back to a bundle. Plain immutable value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FcmNotification {
    body: Option<String>,
    title: Option<String>,
    #[serde(default)]
    data: HashMap<String, String>,
}

impl FcmNotification {
    /// Create a notification; argument order follows the native plugin
    /// (body first)
    pub fn new(
        body: Option<String>,
        title: Option<String>,
        data: HashMap<String, String>,
    ) -> Self {
        Self { body, title, data }
    }

    /// Notification body text
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Notification title
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Custom key-value payload
    pub fn data(&self) -> &HashMap<String, String> {
        &self.data
    }

    /// Read a notification from its bundle form.
    ///
    /// A bundle without a nested `data` entry yields an empty data map.
    pub fn from_bundle(bundle: &Bundle) -> Self {
        Self {
            body: bundle.get_string(KEY_BODY).map(str::to_string),
            title: bundle.get_string(KEY_TITLE).map(str::to_string),
            data: bundle
                .get_bundle(KEY_DATA)
                .map(Bundle::to_string_map)
                .unwrap_or_default(),
        }
    }

    /// Like [`from_bundle`](Self::from_bundle) but rejects a bundle whose
    /// `data` entry is missing or has the wrong type
    pub fn try_from_bundle(bundle: &Bundle) -> Result<Self, FirebaseError> {
        match bundle.get(KEY_DATA) {
            None => Err(MessagingError::MissingBundle(KEY_DATA.to_string()).into()),
            Some(_) if bundle.get_bundle(KEY_DATA).is_none() => Err(MessagingError::InvalidPayload(
                "`data` is not a bundle".to_string(),
            )
            .into()),
            Some(_) => Ok(Self::from_bundle(bundle)),
        }
    }

    /// Bundle form, readable by [`from_bundle`](Self::from_bundle)
    pub fn to_bundle(&self) -> Bundle {
        let mut bundle = Bundle::new();
        bundle.put_string(KEY_BODY, self.body.as_deref());
        bundle.put_string(KEY_TITLE, self.title.as_deref());
        bundle.put_bundle(KEY_DATA, Some(Bundle::from_string_map(&self.data)));
        bundle
    }
}
