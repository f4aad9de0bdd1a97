//! Configuration
//!
//! Project options, the action-code settings attached to sign-in links and
//! the auth service knobs. Everything deserializes from JSON so the
//! composition root can load it from a file; `AppOptions` can also be read
//! from the environment.

use crate::error::FirebaseError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Firebase project configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppOptions {
    /// Firebase Web API key
    pub api_key: String,
    /// Google Cloud project ID
    pub project_id: String,
    /// Firebase app id (`1:1234:android:abcd`), needed for analytics
    #[serde(default)]
    pub app_id: Option<String>,
    /// Measurement Protocol API secret, needed for analytics
    #[serde(default)]
    pub measurement_api_secret: Option<String>,
    /// `host:port` of a local Auth emulator
    #[serde(default)]
    pub auth_emulator_host: Option<String>,
}

impl AppOptions {
    /// Read options from `FIREBASE_*` environment variables
    pub fn from_env() -> Result<Self, FirebaseError> {
        let api_key = std::env::var("FIREBASE_API_KEY")
            .map_err(|_| FirebaseError::config("FIREBASE_API_KEY is not set"))?;
        let project_id = std::env::var("FIREBASE_PROJECT_ID")
            .map_err(|_| FirebaseError::config("FIREBASE_PROJECT_ID is not set"))?;

        let options = Self {
            api_key,
            project_id,
            app_id: std::env::var("FIREBASE_APP_ID").ok(),
            measurement_api_secret: std::env::var("FIREBASE_MEASUREMENT_API_SECRET").ok(),
            auth_emulator_host: std::env::var("FIREBASE_AUTH_EMULATOR_HOST").ok(),
        };
        options.validate()?;
        Ok(options)
    }

    /// Parse options from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, FirebaseError> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FirebaseError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check required fields
    pub fn validate(&self) -> Result<(), FirebaseError> {
        if self.api_key.is_empty() {
            return Err(FirebaseError::config("API key not configured"));
        }
        if self.project_id.is_empty() {
            return Err(FirebaseError::config("Project ID cannot be empty"));
        }
        Ok(())
    }

    /// Base URL of the Identity Toolkit API, honouring the emulator host
    pub fn identity_toolkit_url(&self) -> String {
        match &self.auth_emulator_host {
            Some(host) => format!("http://{}/identitytoolkit.googleapis.com/v1", host),
            None => "https://identitytoolkit.googleapis.com/v1".to_string(),
        }
    }
}

/// Settings attached to out-of-band emails (sign-in links)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCodeSettings {
    /// Continue URL embedded in the link
    pub url: String,
    /// Open the link in the app instead of a browser
    pub handle_code_in_app: bool,
    /// iOS bundle id that should handle the link
    pub ios_bundle_id: Option<String>,
    /// Android package that should handle the link
    pub android_package_name: Option<String>,
    /// Offer to install the Android app when missing
    pub android_install_app: bool,
    /// Minimum Android app version able to handle the link
    pub android_minimum_version: Option<String>,
    /// Custom dynamic link domain
    #[serde(default)]
    pub dynamic_link_domain: Option<String>,
}

impl Default for ActionCodeSettings {
    fn default() -> Self {
        Self {
            url: "https://playground-24cec.firebaseapp.com".to_string(),
            handle_code_in_app: true,
            ios_bundle_id: Some("com.me.real_estate".to_string()),
            android_package_name: Some("com.me.real_estate".to_string()),
            android_install_app: true,
            android_minimum_version: Some("21".to_string()),
            dynamic_link_domain: None,
        }
    }
}

/// Auth façade settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthServiceConfig {
    /// Settings for `send_sign_in_link`
    pub action_code_settings: ActionCodeSettings,
    /// Run at most one sign-in/link operation at a time
    pub serialize_sign_in: bool,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            action_code_settings: ActionCodeSettings::default(),
            serialize_sign_in: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_json() {
        let options = AppOptions::from_json_str(
            r#"{"apiKey": "key", "projectId": "proj", "appId": "1:2:android:3"}"#,
        )
        .unwrap();
        assert_eq!(options.api_key, "key");
        assert_eq!(options.project_id, "proj");
        assert_eq!(options.app_id.as_deref(), Some("1:2:android:3"));
        assert!(options.auth_emulator_host.is_none());
    }

    #[test]
    fn test_empty_api_key_error() {
        let result = AppOptions::from_json_str(r#"{"apiKey": "", "projectId": "proj"}"#);
        assert!(matches!(result, Err(FirebaseError::Config(_))));
    }

    #[test]
    fn test_empty_project_id_error() {
        let options = AppOptions {
            api_key: "key".to_string(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_emulator_url() {
        let options = AppOptions {
            api_key: "key".to_string(),
            project_id: "proj".to_string(),
            auth_emulator_host: Some("127.0.0.1:9099".to_string()),
            ..Default::default()
        };
        assert_eq!(
            options.identity_toolkit_url(),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1"
        );
    }

    #[test]
    fn test_default_action_code_settings() {
        let settings = ActionCodeSettings::default();
        assert_eq!(settings.url, "https://playground-24cec.firebaseapp.com");
        assert!(settings.handle_code_in_app);
        assert_eq!(settings.ios_bundle_id.as_deref(), Some("com.me.real_estate"));
        assert_eq!(settings.android_package_name.as_deref(), Some("com.me.real_estate"));
        assert!(settings.android_install_app);
        assert_eq!(settings.android_minimum_version.as_deref(), Some("21"));
    }

    #[test]
    fn test_service_config_defaults_when_fields_missing() {
        let config: AuthServiceConfig = serde_json::from_str("{}").unwrap();
        assert!(config.serialize_sign_in);
        assert_eq!(config.action_code_settings, ActionCodeSettings::default());
    }
}
