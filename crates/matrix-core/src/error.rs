use thiserror::Error;

/// Failure talking to the chat/voice REST endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure or a body that could not be decoded
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered, but not with a success status
    #[error("request failed with status: {0}")]
    Status(reqwest::StatusCode),

    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Malformed Engine.IO / Socket.IO text frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("empty frame")]
    Empty,

    #[error("unknown {layer} packet type '{kind}'")]
    UnknownType { layer: &'static str, kind: char },

    #[error("binary packets are not supported")]
    Binary,

    #[error("invalid packet payload: {0}")]
    Payload(String),
}

/// Failure of the push channel connection.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid push url: {0}")]
    Url(String),
}
