//! Server-initiated events and the internal messages the chat widget reacts to.

use serde::Deserialize;
use serde_json::Value;

use crate::api::ChatReply;
use crate::error::ApiError;

/// A push event delivered over the persistent channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// The channel finished its handshake. Diagnostic only.
    Connected,
    /// The assistant's reply to an earlier chat request.
    NewMessage { assistant_response: String },
    /// Authoritative voice/processing state from the server.
    VoiceStatus { status: String },
    /// Free-form server status. Diagnostic only.
    Status(Value),
    /// The channel closed; no more events will arrive.
    Disconnected,
}

#[derive(Deserialize)]
struct NewMessagePayload {
    assistant_response: String,
}

#[derive(Deserialize)]
struct VoiceStatusPayload {
    status: String,
}

impl PushEvent {
    /// Map a named Socket.IO event to a push event. Returns `None` for events
    /// this client does not consume or whose payload has the wrong shape.
    pub fn from_named(name: &str, data: Option<&Value>) -> Option<Self> {
        match name {
            "connect" => Some(PushEvent::Connected),
            "new_message" => {
                let payload: NewMessagePayload = serde_json::from_value(data?.clone()).ok()?;
                Some(PushEvent::NewMessage {
                    assistant_response: payload.assistant_response,
                })
            }
            "voice_status" => {
                let payload: VoiceStatusPayload = serde_json::from_value(data?.clone()).ok()?;
                Some(PushEvent::VoiceStatus {
                    status: payload.status,
                })
            }
            "status" => Some(PushEvent::Status(data.cloned().unwrap_or(Value::Null))),
            _ => None,
        }
    }
}

/// Everything that can change a [`ChatWidget`](crate::chat::ChatWidget) after
/// construction arrives as one of these, in the order it happened.
#[derive(Debug)]
pub enum WidgetEvent {
    Push(PushEvent),
    /// Outcome of a `/api/chat` request
    ChatCompleted(Result<ChatReply, ApiError>),
    /// Outcome of a voice start (`start == true`) or stop request
    VoiceToggled { start: bool, result: Result<(), ApiError> },
    /// The post-send delay elapsed
    ReplySettled,
    StatusChecked(Result<Value, ApiError>),
}

impl From<PushEvent> for WidgetEvent {
    fn from(event: PushEvent) -> Self {
        WidgetEvent::Push(event)
    }
}
