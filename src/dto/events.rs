use serde::Serialize;
use utoipa::ToSchema;

#[derive(Clone, Debug)]
/// Dispatched payload carried across a room's broadcast hub.
pub struct ServerEvent {
    /// Event name (`state_updated`, `final_results`, ...).
    pub event: String,
    /// JSON payload attached to the event.
    pub payload: serde_json::Value,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the event body.
    pub fn json<T>(event: impl Into<String>, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            payload: serde_json::to_value(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Greeting sent to a WebSocket client right after it connects.
pub struct ConnectedPayload {
    /// Code of the room the socket subscribed to.
    pub room_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Game-rule error reported back to the single caller that issued an action.
pub struct ErrorPayload {
    /// Human-readable error message.
    pub message: String,
}
