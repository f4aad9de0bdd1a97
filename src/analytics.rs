//! Analytics façade
//!
//! Forwards named events to an [`AnalyticsSink`], converting parameter maps
//! and tuple lists into a [`Bundle`]. No validation, batching or retry: a
//! call is forwarded once and the sink's result returned.
//!
//! The sink is an explicit handle owned by the composition root
//! ([`App`](crate::app::App)); there is no process-wide instance.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), firebase_plugin::FirebaseError> {
//! use firebase_plugin::analytics::{Analytics, TracingSink};
//! use std::sync::Arc;
//!
//! let analytics = Analytics::new(Arc::new(TracingSink));
//! analytics.log_event_with("purchase", &[("value", 9.99.into()), ("currency", "EUR".into())]).await?;
//! # Ok(())
//! # }
//! ```

use crate::bundle::{Bundle, BundleValue};
use crate::error::FirebaseError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Native analytics backend
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Record one event
    async fn log_event(&self, name: &str, params: Option<Bundle>) -> Result<(), FirebaseError>;
}

/// Event forwarding façade
#[derive(Clone)]
pub struct Analytics {
    sink: Arc<dyn AnalyticsSink>,
}

impl Analytics {
    /// Wrap a sink
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink }
    }

    /// Log an event with an optional parameter map
    pub async fn log_event(
        &self,
        name: &str,
        params: Option<HashMap<String, BundleValue>>,
    ) -> Result<(), FirebaseError> {
        let bundle = params.map(|p| p.into_iter().collect::<Bundle>());
        self.sink.log_event(name, bundle).await
    }

    /// Log an event with `(name, value)` pairs; later duplicates win
    pub async fn log_event_with(
        &self,
        name: &str,
        params: &[(&str, BundleValue)],
    ) -> Result<(), FirebaseError> {
        let map = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<HashMap<_, _>>();
        self.log_event(name, Some(map)).await
    }
}

impl std::fmt::Debug for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analytics").finish_non_exhaustive()
    }
}

/// Sink that only emits a `tracing` event per analytics event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl AnalyticsSink for TracingSink {
    async fn log_event(&self, name: &str, params: Option<Bundle>) -> Result<(), FirebaseError> {
        let params = match params {
            Some(bundle) => serde_json::to_string(&bundle)?,
            None => "{}".to_string(),
        };
        tracing::info!(event = name, %params, "analytics event");
        Ok(())
    }
}

/// Sink posting events to the GA4 Measurement Protocol
pub struct MeasurementProtocolSink {
    http_client: reqwest::Client,
    endpoint: String,
    firebase_app_id: String,
    api_secret: String,
    app_instance_id: String,
}

#[derive(Serialize)]
struct CollectRequest<'a> {
    app_instance_id: &'a str,
    events: [CollectEvent<'a>; 1],
}

#[derive(Serialize)]
struct CollectEvent<'a> {
    name: &'a str,
    params: Bundle,
}

impl MeasurementProtocolSink {
    /// Default collection endpoint
    pub const DEFAULT_ENDPOINT: &'static str = "https://www.google-analytics.com/mp/collect";

    /// Create a sink with a fresh random app instance id
    pub fn new(
        http_client: reqwest::Client,
        firebase_app_id: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            firebase_app_id: firebase_app_id.into(),
            api_secret: api_secret.into(),
            app_instance_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    /// Use a known app instance id (32 hex characters)
    pub fn with_app_instance_id(mut self, app_instance_id: impl Into<String>) -> Self {
        self.app_instance_id = app_instance_id.into();
        self
    }

    /// Override the collection endpoint (debug endpoint, proxies)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// App instance id sent with every event
    pub fn app_instance_id(&self) -> &str {
        &self.app_instance_id
    }
}

#[async_trait]
impl AnalyticsSink for MeasurementProtocolSink {
    async fn log_event(&self, name: &str, params: Option<Bundle>) -> Result<(), FirebaseError> {
        let body = CollectRequest {
            app_instance_id: &self.app_instance_id,
            events: [CollectEvent {
                name,
                params: params.unwrap_or_default(),
            }],
        };

        let response = self
            .http_client
            .post(&self.endpoint)
            .query(&[
                ("firebase_app_id", self.firebase_app_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FirebaseError::Internal(format!(
                "analytics collect returned {}",
                response.status()
            )));
        }

        tracing::debug!(event = name, "analytics event sent");
        Ok(())
    }
}

impl std::fmt::Debug for MeasurementProtocolSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementProtocolSink")
            .field("endpoint", &self.endpoint)
            .field("app_instance_id", &self.app_instance_id)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
