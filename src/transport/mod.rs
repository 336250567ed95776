//! The chat transport seam: inbound message events plus the outbound
//! reply/react capability and on-demand lookups.

pub mod bridge;

use crate::Result;
use serde::Deserialize;

/// An inbound chat message as delivered by the transport.
///
/// Field presence is validated by the dispatcher, not here: a payload missing
/// its sender or body is discarded, never a crash.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageEvent {
    /// Transport identifier of the message itself, used to react or reply.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// The transport's own opinion of whether this is a group chat. Only
    /// consulted when the authoritative chat lookup fails.
    #[serde(default)]
    pub is_group_hint: bool,
}

/// Chat metadata from an on-demand transport lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    pub is_group: bool,
    pub name: String,
}

/// The outcome of resolving which group a message came from. `Unresolved`
/// always routes to discard: we never respond when the group identity cannot
/// be confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupIdentity {
    Resolved(String),
    Unresolved,
}

/// Outbound capabilities and lookups the dispatcher needs from the chat
/// transport.
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Resolves chat metadata for an inbound message. Fallible: the
    /// dispatcher degrades to an id-suffix heuristic when this fails.
    async fn chat(&self, chat_id: &str) -> Result<ChatInfo>;

    /// The phone-number-like identifier behind a sender id.
    async fn contact_number(&self, sender_id: &str) -> Result<String>;

    /// Sends a text reply to the given message.
    async fn reply(&self, message_id: &str, text: &str) -> Result<()>;

    /// Attaches an emoji reaction to the given message.
    async fn react(&self, message_id: &str, emoji: &str) -> Result<()>;
}
