/// Shared error type used across all fieldlink crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid or missing configuration, detected before any network activity.
    #[error("config: {0}")]
    Config(String),

    /// Transport establishment or handshake failure.
    #[error("connect: {0}")]
    Connect(String),

    /// A received frame or message violates the wire contract.
    #[error("protocol: {0}")]
    Protocol(String),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("sensor channel {channel}: {message}")]
    Sensor { channel: u8, message: String },
}

impl Error {
    /// Shorthand for the `Io` variant built from an [`std::io::ErrorKind`].
    pub fn io(kind: std::io::ErrorKind, message: impl Into<String>) -> Self {
        Error::Io(std::io::Error::new(kind, message.into()))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
