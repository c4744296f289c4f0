use std::io;

use thiserror::Error;

use crate::message::ParseError;

/// Boxed cause carried by [`Error::Crypto`].
pub type CryptoSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Parse(#[from] ParseError<nom::error::ErrorKind>),

    /// Applying a message to the connection state failed. The handler
    /// recovers from this locally.
    #[error("Adjustment failed: {0}")]
    Adjustment(String),

    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Crypto failure: {message}")]
    Crypto {
        message: String,
        #[source]
        source: Option<CryptoSource>,
    },

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Field too long: {0} ({1} bytes)")]
    FieldTooLong(&'static str, usize),

    #[error("Compression failure: {0}")]
    Compression(String),

    #[error("Reassembly failed: {0}")]
    Reassembly(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] io::Error),
}

impl Error {
    pub(crate) fn crypto<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Crypto {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn crypto_msg(message: impl Into<String>) -> Self {
        Error::Crypto {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
