use std::fmt;
use std::io;

use thiserror::Error;

/// Errors raised on the call paths of the crate.
///
/// Parsing a request or a response never produces one of these: those
/// operations store a [`Fault`](crate::Fault) instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A native value could not be represented as the requested wire type.
    #[error("{0}")]
    Value(String),

    /// The remote HTTP server answered with a non-success status.
    #[error("{reason}")]
    Http { status: u16, reason: String },

    /// The remote XML-RPC server answered with a fault.
    #[error("{message}")]
    Fault { code: i32, message: String },

    /// Signatures returned by the remote introspection methods are unusable.
    #[error("{0}")]
    Introspect(String),

    /// The transport failed before any HTTP status was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// XML that should have been well-formed was not.
    #[error("{0}")]
    Xml(String),

    /// Method registration was refused by the server.
    #[error("{message}")]
    Server { code: i32, message: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn value<S: Into<String>>(message: S) -> Error {
        Error::Value(message.into())
    }

    /// Fault code carried by this error, if any.
    pub fn code(&self) -> Option<i32> {
        match *self {
            Error::Fault { code, .. } | Error::Server { code, .. } => Some(code),
            Error::Http { status, .. } => Some(i32::from(status)),
            _ => None,
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Value(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Error {
        Error::Value(msg.to_string())
    }
}

pub type Result<T> = ::std::result::Result<T, Error>;
