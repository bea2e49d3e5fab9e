//! Failures of the submission client.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The socket failed underneath the session.
    #[error("Network error: {0}")]
    Io(#[from] io::Error),

    /// A reply line did not follow the SMTP grammar.
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    /// A positive reply, but not the one this step of the exchange expects.
    #[error("Unexpected reply {code}: {message}")]
    UnexpectedReply { code: u16, message: String },

    /// A 4xx or 5xx reply.
    #[error("Server rejected command with {code}: {message}")]
    Rejected { code: u16, message: String },

    #[error("TLS failure: {0}")]
    Tls(String),

    /// The message could not be assembled from the supplied parts.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// The server hung up mid-exchange.
    #[error("Connection closed by server")]
    ConnectionClosed,

    #[error("Reply is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}

impl ClientError {
    /// The SMTP reply code carried by this error, if any.
    #[must_use]
    pub const fn code(&self) -> Option<u16> {
        match self {
            Self::Rejected { code, .. } | Self::UnexpectedReply { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// A 5xx rejection; retrying the same command will not help.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected { code, .. } if *code >= 500)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
