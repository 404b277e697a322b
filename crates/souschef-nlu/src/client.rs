//! HTTP client for the hosted dialogue service.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::types::DialogueResponse;
use souschef_core::{Error, NluConfig, Result};

/// API version pinned to the dialogue workspace this bot was built against.
const API_VERSION: &str = "2016-07-01";

/// One dialogue turn. Behind a trait so tests can script responses.
#[async_trait]
pub trait DialogueService: Send + Sync {
    /// Send user text plus the previous turn's opaque context; `None`
    /// starts a fresh conversation.
    async fn message(&self, text: &str, context: Option<&Value>) -> Result<DialogueResponse>;
}

pub struct WatsonDialogue {
    http: reqwest::Client,
    url: String,
    username: String,
    password: String,
    workspace_id: String,
}

impl WatsonDialogue {
    pub fn new(config: &NluConfig, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            workspace_id: config.workspace_id.clone(),
        })
    }
}

#[async_trait]
impl DialogueService for WatsonDialogue {
    async fn message(&self, text: &str, context: Option<&Value>) -> Result<DialogueResponse> {
        let url = format!("{}/v1/workspaces/{}/message", self.url, self.workspace_id);
        debug!(%url, "dialogue request");
        let mut body = json!({ "input": { "text": text } });
        if let Some(context) = context {
            body["context"] = context.clone();
        }
        let response = self
            .http
            .post(&url)
            .query(&[("version", API_VERSION)])
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }
        response
            .json::<DialogueResponse>()
            .await
            .map_err(|e| Error::Nlu(e.to_string()))
    }
}
