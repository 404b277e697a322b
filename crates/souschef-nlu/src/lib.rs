//! Dialogue/NLU service client.
//!
//! Sends user text plus the opaque conversation context to the hosted
//! dialogue service and classifies the returned turn signal. The context
//! blob is owned by the service: it is echoed back unmodified and nothing
//! else in this codebase writes into it.

pub mod client;
pub mod types;

pub use client::{DialogueService, WatsonDialogue};
pub use types::{DialogueEntity, DialogueOutput, DialogueResponse, TurnSignal};
