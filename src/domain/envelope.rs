//! Wire envelopes exchanged over the chat WebSocket.
//!
//! Outbound frames are [`OutboundEnvelope`]s; inbound frames decode into
//! [`InboundFrame`], whose three keys are optional and independent.

use serde::{Deserialize, Serialize};

use super::ConversationId;

/// Client → server frame.
///
/// ```json
/// { "conversation_id": "amber-apple-arrow-atlas", "init": false, "message": "hi" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEnvelope {
    /// Session identifier, identical on every frame of a client.
    pub conversation_id: ConversationId,
    /// `true` only on the handshake sent once per transport connection.
    pub init: bool,
    /// User text. Absent on the handshake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OutboundEnvelope {
    /// Builds the handshake frame sent right after a transport opens.
    #[must_use]
    pub fn handshake(conversation_id: &ConversationId) -> Self {
        Self {
            conversation_id: conversation_id.clone(),
            init: true,
            message: None,
        }
    }

    /// Builds a chat frame carrying one user message.
    #[must_use]
    pub fn chat(conversation_id: &ConversationId, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.clone(),
            init: false,
            message: Some(message.into()),
        }
    }

    /// Serializes to the JSON text sent on the wire.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; with string-only fields this does not
    /// happen in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Server → client frame.
///
/// ```json
/// { "on_chat_model_stream": "Hel", "on_chat_model_end": true, "on_easter_egg": true }
/// ```
///
/// Unknown keys are ignored. Signals only fire when truthy, so
/// `"on_chat_model_end": false` and an empty token are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct InboundFrame {
    /// Partial bot-reply token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_chat_model_stream: Option<String>,
    /// End-of-turn marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_chat_model_end: Option<bool>,
    /// Side-channel trigger, unrelated to the chat text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_easter_egg: Option<bool>,
}

impl InboundFrame {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the text is not an object of this shape.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Returns the token to append, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.on_chat_model_stream
            .as_deref()
            .filter(|token| !token.is_empty())
    }

    /// Returns `true` if this frame ends the bot turn.
    #[must_use]
    pub fn ends_turn(&self) -> bool {
        self.on_chat_model_end == Some(true)
    }

    /// Returns `true` if this frame fires the side-channel trigger.
    #[must_use]
    pub fn triggers_easter_egg(&self) -> bool {
        self.on_easter_egg == Some(true)
    }
}
