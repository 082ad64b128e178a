use std::error::Error as StdError;

use nextcal_common::FromMessage;

/// Failure classes a caller can act on.
///
/// `Conflict` means "re-fetch and retry", `NotFound` means the resource is
/// gone, `MalformedInput` never reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedInput,
    Conflict,
    NotFound,
    TransportFailure,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed input: {message}")]
    MalformedInput { message: String },
    #[error(
        "conflict: {href} was modified since its etag was read; fetch the event again before retrying"
    )]
    Conflict { href: String },
    #[error("not found: {href}")]
    NotFound { href: String },
    #[error("{message}")]
    Message { message: String },
    #[error("{context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transport<E>(context: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Message { .. } | Self::Transport { .. } => ErrorKind::TransportFailure,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

nextcal_common::impl_context!();
