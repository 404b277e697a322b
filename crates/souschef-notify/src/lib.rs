//! Fire-and-forget action notifications.
//!
//! Posts a short action log for conversation events. Without a configured
//! endpoint the client is silently disabled; send failures are logged at
//! warn and never reach the turn handler.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, warn};

use souschef_core::{NotifyConfig, Result};

/// Anchor context attached to a notification: the ingredient or cuisine
/// driving the current conversation, if any.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorRef<'a> {
    pub ingredient: Option<&'a str>,
    pub cuisine: Option<&'a str>,
}

struct Endpoint {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

pub struct NotificationClient {
    endpoint: Option<Endpoint>,
}

impl NotificationClient {
    /// Build from optional configuration; `None` disables the sink.
    pub fn new(config: Option<&NotifyConfig>, timeout: Duration) -> Result<Self> {
        let endpoint = match config {
            Some(config) => {
                let http = reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(|e| souschef_core::Error::Http(e.to_string()))?;
                Some(Endpoint {
                    http,
                    url: config.url.trim_end_matches('/').to_string(),
                    api_key: config.api_key.clone(),
                })
            }
            None => None,
        };
        Ok(Self { endpoint })
    }

    pub fn disabled() -> Self {
        Self { endpoint: None }
    }

    pub async fn start(&self, user: &str) {
        let message = format!("{} started a new conversation.", user);
        self.post("start", user, AnchorRef::default(), None, message).await;
    }

    pub async fn favorites(&self, user: &str) {
        let message = format!("{} requested their favorite recipes.", user);
        self.post("favorites", user, AnchorRef::default(), None, message).await;
    }

    pub async fn ingredient(&self, user: &str, anchor: AnchorRef<'_>, text: &str) {
        let message = format!("{} requested recipes for ingredient '{}'.", user, text);
        self.post("ingredient", user, anchor, None, message).await;
    }

    pub async fn cuisine(&self, user: &str, anchor: AnchorRef<'_>, text: &str) {
        let message = format!("{} requested recipes for cuisine '{}'.", user, text);
        self.post("cuisine", user, anchor, None, message).await;
    }

    pub async fn recipe(&self, user: &str, anchor: AnchorRef<'_>, recipe_id: &str, title: &str) {
        let message = format!("{} selected recipe '{}'.", user, title);
        self.post("recipe", user, anchor, Some(recipe_id), message).await;
    }

    async fn post(
        &self,
        action: &str,
        user: &str,
        anchor: AnchorRef<'_>,
        recipe_id: Option<&str>,
        message: String,
    ) {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint,
            None => return,
        };
        let body = json!({
            "userQuery": { "type": "action" },
            "notification": {
                "action": action,
                "message": message,
                "state": {
                    "user": user,
                    "ingredient": anchor.ingredient,
                    "cuisine": anchor.cuisine,
                    "recipe": recipe_id,
                },
            },
        });
        let url = format!("{}/{}/notification", endpoint.url, endpoint.api_key);
        debug!(action, "posting notification");
        match endpoint.http.post(&url).json(&body).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!("notification returned status {}", response.status());
            }
            Ok(_) => {}
            Err(e) => warn!("notification failed: {}", e),
        }
    }
}
