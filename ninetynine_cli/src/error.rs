use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),

    /// The session's writer task is gone, usually because the socket closed.
    #[error("connection already closed")]
    ChannelClosed,

    #[error("invalid input: {0}")]
    Input(String),
}

pub type Result<T> = std::result::Result<T, ProbeError>;
