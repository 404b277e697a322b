//! Slack RTM connection and web API calls.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::types::{DirectMessage, PostMessageResponse, RtmConnectResponse, RtmEvent};
use souschef_core::{Error, Result};

const SLACK_API_URL: &str = "https://slack.com/api";
/// Keepalive interval for the RTM socket.
const PING_INTERVAL: Duration = Duration::from_secs(30);

pub struct SlackClient {
    http: reqwest::Client,
    token: String,
}

/// A live RTM connection: the bot's own user id plus the inbound
/// direct-message stream. The stream closes when the socket drops.
pub struct SlackConnection {
    pub bot_id: String,
    pub events: mpsc::Receiver<DirectMessage>,
}

impl SlackClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            http,
            token: token.to_string(),
        })
    }

    /// Open the RTM websocket and start forwarding direct messages.
    pub async fn connect(&self) -> Result<SlackConnection> {
        let response = self
            .http
            .post(format!("{}/rtm.connect", SLACK_API_URL))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }
        let connect: RtmConnectResponse = response
            .json()
            .await
            .map_err(|e| Error::Chat(e.to_string()))?;
        if !connect.ok {
            return Err(Error::Chat(format!(
                "rtm.connect failed: {}",
                connect.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        let socket_url = connect
            .url
            .ok_or_else(|| Error::Chat("rtm.connect returned no socket url".to_string()))?;
        let bot_id = connect
            .self_info
            .map(|s| s.id)
            .ok_or_else(|| Error::Chat("rtm.connect returned no self id".to_string()))?;

        let (socket, _) = connect_async(socket_url.as_str())
            .await
            .map_err(|e| Error::Chat(e.to_string()))?;
        info!("connected to Slack RTM as {}", bot_id);

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(read_loop(socket, bot_id.clone(), tx));

        Ok(SlackConnection {
            bot_id,
            events: rx,
        })
    }

    /// Post a reply into a channel.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/chat.postMessage", SLACK_API_URL))
            .bearer_auth(&self.token)
            .json(&json!({ "channel": channel, "text": text }))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }
        let posted: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| Error::Chat(e.to_string()))?;
        if !posted.ok {
            return Err(Error::Chat(format!(
                "chat.postMessage failed: {}",
                posted.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        Ok(())
    }
}

/// Decode RTM frames and forward qualifying direct messages: `message`
/// events in a DM channel, not sent by this bot or any other bot.
fn direct_message(event: RtmEvent, own_id: &str) -> Option<DirectMessage> {
    if event.kind.as_deref() != Some("message") || event.bot_id.is_some() {
        return None;
    }
    let channel = event.channel?;
    if !channel.starts_with('D') {
        return None;
    }
    let user = event.user?;
    if user == own_id {
        return None;
    }
    Some(DirectMessage {
        user,
        channel,
        text: event.text?,
    })
}

type RtmSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn read_loop(socket: RtmSocket, own_id: String, tx: mpsc::Sender<DirectMessage>) {
    let (mut write, mut read) = socket.split();
    let mut keepalive = tokio::time::interval(PING_INTERVAL);
    keepalive.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(raw))) => {
                        let event: RtmEvent = match serde_json::from_str(&raw) {
                            Ok(event) => event,
                            Err(_) => continue,
                        };
                        if let Some(message) = direct_message(event, &own_id) {
                            debug!(user = %message.user, "inbound direct message");
                            if tx.send(message).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("Slack RTM socket closed");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Slack RTM socket error: {}", e);
                        return;
                    }
                }
            }
            _ = keepalive.tick() => {
                if write.send(Message::Ping(Vec::new())).await.is_err() {
                    warn!("Slack RTM keepalive failed");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: &str, channel: &str, user: &str, bot_id: Option<&str>) -> RtmEvent {
        RtmEvent {
            kind: Some(kind.to_string()),
            channel: Some(channel.to_string()),
            user: Some(user.to_string()),
            text: Some("hello".to_string()),
            bot_id: bot_id.map(str::to_string),
        }
    }

    #[test]
    fn forwards_human_direct_messages() {
        let message = direct_message(event("message", "D123", "U1", None), "B1").unwrap();
        assert_eq!(message.user, "U1");
        assert_eq!(message.channel, "D123");
    }

    #[test]
    fn ignores_non_dm_channels_and_bots() {
        assert!(direct_message(event("message", "C123", "U1", None), "B1").is_none());
        assert!(direct_message(event("message", "D123", "U1", Some("B9")), "B1").is_none());
        assert!(direct_message(event("message", "D123", "B1", None), "B1").is_none());
        assert!(direct_message(event("presence_change", "D123", "U1", None), "B1").is_none());
    }
}
