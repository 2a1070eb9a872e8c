// common/src/messages.rs
//
// Wire events exchanged over the chat WebSocket. Every frame is a JSON text
// frame shaped as `{"event": "<name>", "data": <payload>}`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::models::connection::UserId;

/// Event pushed from the server to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full roster of online users, sent to every connection on each presence change.
    GetOnlineUsers(Vec<UserId>),
    NewMessage(ChatMessage),
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error { message: message.into() }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A chat message relayed in real time to its participants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Event sent from a client to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    SendMessage(OutgoingMessage),
}

impl ClientEvent {
    /// Parse and validate an inbound text frame.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let event: ClientEvent = serde_json::from_str(frame)?;
        match &event {
            ClientEvent::SendMessage(msg) => msg.validate()?,
        }
        Ok(event)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    pub receiver_id: UserId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl OutgoingMessage {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.receiver_id.as_str().is_empty() {
            return Err(ProtocolError::Invalid("receiverId is required"));
        }

        let has_text = self.text.as_deref().map_or(false, |t| !t.trim().is_empty());
        let has_image = self.image.as_deref().map_or(false, |i| !i.is_empty());
        if !has_text && !has_image {
            return Err(ProtocolError::Invalid("message needs text or an image"));
        }

        Ok(())
    }

    /// Stamp the message with its sender and the current time.
    pub fn into_chat_message(self, sender_id: UserId) -> ChatMessage {
        ChatMessage {
            sender_id,
            receiver_id: self.receiver_id,
            text: self.text,
            image: self.image,
            created_at: Utc::now(),
        }
    }
}
