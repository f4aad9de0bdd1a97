//! Native message and intent representations

use crate::bundle::Bundle;
use crate::error::{FirebaseError, MessagingError};
use crate::messaging::notification::{FcmNotification, KEY_BODY, KEY_TITLE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Display part of a remote message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteNotification {
    /// Title text
    pub title: Option<String>,
    /// Body text
    pub body: Option<String>,
}

/// Message as delivered by Firebase Cloud Messaging
///
/// Deserializes from the FCM JSON message shape
/// (`{"notification": {...}, "data": {...}}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMessage {
    /// Server assigned message id
    #[serde(default)]
    pub message_id: Option<String>,
    /// Sender id or topic
    #[serde(default)]
    pub from: Option<String>,
    /// Display notification, absent for data-only messages
    #[serde(default)]
    pub notification: Option<RemoteNotification>,
    /// Custom payload
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl RemoteMessage {
    /// Parse an FCM JSON payload
    pub fn from_json(json: &str) -> Result<Self, FirebaseError> {
        serde_json::from_str(json)
            .map_err(|e| MessagingError::InvalidPayload(e.to_string()).into())
    }
}

impl From<&RemoteMessage> for FcmNotification {
    fn from(message: &RemoteMessage) -> Self {
        let notification = message.notification.as_ref();
        FcmNotification::new(
            notification.and_then(|n| n.body.clone()),
            notification.and_then(|n| n.title.clone()),
            message.data.clone(),
        )
    }
}

/// Launch intent carrying notification extras
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Extras attached to the intent
    pub extras: Bundle,
}

impl Intent {
    /// Wrap a set of extras
    pub fn new(extras: Bundle) -> Self {
        Self { extras }
    }

    /// Whether an extra named `name` is attached
    pub fn has_extra(&self, name: &str) -> bool {
        self.extras.contains_key(name)
    }

    /// Nested bundle extra
    pub fn get_bundle_extra(&self, name: &str) -> Option<&Bundle> {
        self.extras.get_bundle(name)
    }

    /// Recover the notification that launched this intent.
    ///
    /// When `extra_name` is attached it must hold the notification bundle.
    /// Otherwise the notification is rebuilt from the flat extras: `title`
    /// and `body` are read directly and every extra (including those two)
    /// becomes part of the data map. Some producers deliver notifications
    /// only in the flat form, so both shapes are accepted.
    pub fn notification_from_extras(&self, extra_name: &str) -> Result<FcmNotification, FirebaseError> {
        if self.has_extra(extra_name) {
            let bundle = self.get_bundle_extra(extra_name).ok_or_else(|| {
                MessagingError::InvalidPayload(format!("extra `{}` is not a bundle", extra_name))
            })?;
            return Ok(FcmNotification::from_bundle(bundle));
        }

        tracing::debug!(extra_name, "notification extra absent, reading flat extras");
        Ok(FcmNotification::new(
            self.extras.get_string(KEY_BODY).map(str::to_string),
            self.extras.get_string(KEY_TITLE).map(str::to_string),
            self.extras.to_string_map(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTRA: &str = "fcm_notification";

    #[test]
    fn test_remote_message_to_notification() {
        let message = RemoteMessage::from_json(
            r#"{
                "messageId": "0:123",
                "notification": {"title": "Hi", "body": "There"},
                "data": {"k": "v"}
            }"#,
        )
        .unwrap();

        let notification = FcmNotification::from(&message);
        assert_eq!(notification.title(), Some("Hi"));
        assert_eq!(notification.body(), Some("There"));
        assert_eq!(notification.data().get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn test_data_only_message() {
        let message = RemoteMessage::from_json(r#"{"data": {"silent": "1"}}"#).unwrap();
        let notification = FcmNotification::from(&message);
        assert!(notification.title().is_none());
        assert!(notification.body().is_none());
        assert_eq!(notification.data().len(), 1);
    }

    #[test]
    fn test_malformed_message_is_invalid_payload() {
        let result = RemoteMessage::from_json(r#"{"data": 5}"#);
        assert!(matches!(
            result,
            Err(FirebaseError::Messaging(MessagingError::InvalidPayload(_)))
        ));
    }

    #[test]
    fn test_intent_with_embedded_bundle() {
        let mut data = HashMap::new();
        data.insert("k".to_string(), "v".to_string());
        let notification = FcmNotification::new(Some("b".into()), Some("t".into()), data);

        let mut extras = Bundle::new();
        extras.put_bundle(EXTRA, Some(notification.to_bundle()));
        extras.put("unrelated", "x");
        let intent = Intent::new(extras);

        assert_eq!(intent.notification_from_extras(EXTRA).unwrap(), notification);
    }

    #[test]
    fn test_intent_flat_fallback() {
        let mut extras = Bundle::new();
        extras.put("title", "Flat title");
        extras.put("body", "Flat body");
        extras.put("order_id", "7");
        let intent = Intent::new(extras);

        let notification = intent.notification_from_extras(EXTRA).unwrap();
        assert_eq!(notification.title(), Some("Flat title"));
        assert_eq!(notification.body(), Some("Flat body"));
        assert_eq!(notification.data().get("order_id").map(String::as_str), Some("7"));
        // Flat extras are carried into the data map verbatim.
        assert_eq!(notification.data().get("title").map(String::as_str), Some("Flat title"));
        assert_eq!(notification.data().len(), 3);
    }

    #[test]
    fn test_intent_extra_of_wrong_type() {
        let mut extras = Bundle::new();
        extras.put(EXTRA, "oops");
        let intent = Intent::new(extras);

        assert!(matches!(
            intent.notification_from_extras(EXTRA),
            Err(FirebaseError::Messaging(MessagingError::InvalidPayload(_)))
        ));
    }
}
