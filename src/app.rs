//! Firebase App
//!
//! The composition root. An [`App`] holds the project options and the shared
//! HTTP client and builds every façade explicitly; nothing is kept in
//! process-wide state, so two apps (or two tests) never share handles.

use crate::analytics::{Analytics, AnalyticsSink, MeasurementProtocolSink, TracingSink};
use crate::auth::{AuthService, IdpAuth, NativeAuth, RestAuth, TokenSource};
use crate::config::{AppOptions, AuthServiceConfig};
use crate::error::FirebaseError;
use crate::preferences::Preferences;
use std::sync::Arc;

/// Firebase App instance
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

struct AppInner {
    options: AppOptions,
    http_client: reqwest::Client,
}

impl App {
    /// Create an app from validated options
    ///
    /// # Example
    /// ```no_run
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// use firebase_plugin::{App, AppOptions};
    ///
    /// let options = AppOptions {
    ///     api_key: "YOUR_API_KEY".to_string(),
    ///     project_id: "your-project-id".to_string(),
    ///     ..Default::default()
    /// };
    /// let app = App::new(options)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(options: AppOptions) -> Result<Self, FirebaseError> {
        // Validate options (error case first)
        options.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| FirebaseError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        tracing::debug!(project_id = %options.project_id, "firebase app created");
        Ok(Self {
            inner: Arc::new(AppInner {
                options,
                http_client,
            }),
        })
    }

    /// Get the app options
    pub fn options(&self) -> &AppOptions {
        &self.inner.options
    }

    /// HTTP client shared by the REST backends
    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.http_client
    }

    /// Identity Toolkit backend for this project
    pub fn rest_auth(&self) -> Result<RestAuth, FirebaseError> {
        RestAuth::from_options(self.inner.http_client.clone(), &self.inner.options)
    }

    /// Analytics façade.
    ///
    /// Events go to the Measurement Protocol when both `app_id` and
    /// `measurement_api_secret` are configured, otherwise they are only
    /// logged.
    pub fn analytics(&self) -> Analytics {
        let options = &self.inner.options;
        let sink: Arc<dyn AnalyticsSink> = match (&options.app_id, &options.measurement_api_secret) {
            (Some(app_id), Some(secret)) => Arc::new(MeasurementProtocolSink::new(
                self.inner.http_client.clone(),
                app_id.clone(),
                secret.clone(),
            )),
            _ => {
                tracing::info!("analytics not configured, events are logged only");
                Arc::new(TracingSink)
            }
        };
        Analytics::new(sink)
    }

    /// Auth façade over `auth`, with Google and Facebook flows driven by the
    /// given token sources
    pub async fn auth_service<G, F>(
        &self,
        auth: Arc<dyn NativeAuth>,
        google: G,
        facebook: F,
        preferences: Arc<dyn Preferences>,
        config: AuthServiceConfig,
    ) -> AuthService
    where
        G: TokenSource + 'static,
        F: TokenSource + 'static,
    {
        let google = Arc::new(IdpAuth::new(google, Arc::clone(&auth)));
        let facebook = Arc::new(IdpAuth::new(facebook, Arc::clone(&auth)));
        AuthService::new(auth, facebook, google, preferences, config).await
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("project_id", &self.inner.options.project_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
