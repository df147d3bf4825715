use std::time::Duration;

/// An inbound frame that could not be turned into an event.
/// Always recovered locally: logged and dropped.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("frame is not an event object: {0}")]
    InvalidShape(#[source] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("failed to encode control frame: {0}")]
pub struct CodecError(#[from] pub serde_json::Error);

/// Socket-level failure. Surfaces only through the connection state stream.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("connect timed out after {0:?}")]
    Timeout(Duration),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::ConnectFailed(_) => "connect_failed",
            Self::Timeout(_) => "timeout",
            Self::SendFailed(_) => "send_failed",
            Self::Protocol(_) => "protocol",
        }
    }
}
