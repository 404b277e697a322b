//! Slack transport.
//!
//! Connects over RTM, forwards inbound direct messages from humans on an
//! mpsc channel, and posts replies via the web API. Everything else about
//! the chat platform stays behind this crate.

pub mod client;
pub mod types;

pub use client::{SlackClient, SlackConnection};
pub use types::DirectMessage;
