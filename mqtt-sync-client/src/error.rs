//! Hand-rolled error type distinguishing transport failures, decode/encode
//! failures, protocol violations by the remote end, and misuse of the
//! client's state machine.

use std::fmt;
use std::io;

use mqtt_core::{ConnectReturnCode, DecodeError, EncodeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The underlying socket failed.
    Io,
    /// A packet could not be encoded (topic/string/payload too large).
    Encode,
    /// A packet received from the broker could not be decoded.
    Decode,
    /// The broker sent a well-formed but unexpected or disallowed packet.
    Protocol,
    /// The client was asked to do something its current state forbids.
    State,
    /// `recv_timeout`, `socket_timeout` or the keep-alive window elapsed.
    Timeout,
    /// The broker refused the connection with a CONNACK return code.
    ConnectRefused(ConnectReturnCode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
        }
    }

    pub fn state(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::State, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Protocol, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Error::new(ErrorKind::Timeout, message)
    }

    pub fn connect_refused(code: ConnectReturnCode) -> Self {
        Error::new(ErrorKind::ConnectRefused(code), code.to_string())
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// The CONNACK return code, when this error came from a refused connect.
    pub fn connect_return_code(&self) -> Option<ConnectReturnCode> {
        match self.kind {
            ErrorKind::ConnectRefused(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
                Error::new(ErrorKind::Timeout, err.to_string())
            }
            _ => Error::new(ErrorKind::Io, err.to_string()),
        }
    }
}

impl From<EncodeError> for Error {
    fn from(err: EncodeError) -> Self {
        Error::new(ErrorKind::Encode, err.to_string())
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::new(ErrorKind::Decode, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeout_maps_to_timeout_kind() {
        let err: Error = io::Error::from(io::ErrorKind::TimedOut).into();
        assert!(err.is_timeout());
    }

    #[test]
    fn connect_refused_carries_the_return_code() {
        let err = Error::connect_refused(ConnectReturnCode::NotAuthorized);
        assert_eq!(
            err.connect_return_code(),
            Some(ConnectReturnCode::NotAuthorized)
        );
    }
}
