//! Slack wire types.

use serde::Deserialize;

/// An inbound direct message from a human user.
#[derive(Debug, Clone)]
pub struct DirectMessage {
    pub user: String,
    pub channel: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RtmConnectResponse {
    pub ok: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "self", default)]
    pub self_info: Option<RtmSelf>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RtmSelf {
    pub id: String,
}

/// RTM event frame. Only `message` events are interesting; everything else
/// decodes with `kind` set to something we ignore.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RtmEvent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub bot_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}
