use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("Failed to connect to bus at {endpoint}: {source}")]
    ConnectFailed { endpoint: String, source: std::io::Error },

    #[error("Connection is not established")]
    NotConnected,

    #[error("Failed to send message: {0}")]
    SendFailed(std::io::Error),

    #[error("Failed to receive message: {0}")]
    ReceiveFailed(std::io::Error),

    #[error("Bus connection closed")]
    Disconnected,

    #[error("Truncated frame: needed {needed} bytes, got {got}")]
    TruncatedFrame { needed: usize, got: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BusError>;
