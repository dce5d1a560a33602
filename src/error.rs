// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The crate-wide error type.

use crate::protocol::ResponseCode;
use std::{fmt, io};

/// Everything that can make an opening handshake fail to reach `OK`.
#[derive(Debug)]
pub enum Error {
    /// The underlying socket returned an I/O error.
    Io(io::Error),
    /// The peer closed the connection before the handshake completed.
    Closed,
    /// The handshake-wide timeout elapsed before completion.
    Timeout,
    /// The receive buffer filled up before a `CRLF CRLF` terminator appeared.
    BufferFull,
    /// The server rejected the request; carries the reason it replied with.
    Rejected(ResponseCode),
    /// The client received something other than a valid `101` response.
    RemoteRejected {
        /// The HTTP status code the server sent, or `None` if the status
        /// line itself could not be parsed.
        status_code: Option<u16>,
    },
    /// The `Sec-WebSocket-Accept` value did not match what this client
    /// computed from its own nonce.
    AcceptMismatch,
    /// The output buffer passed to a codec routine was too small.
    NoBufs,
    /// The owner called [`crate::handshake::machine::Handshake::stop_handle`]
    /// and requested cancellation before the handshake reached a terminal
    /// state on its own.
    Cancelled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {}", e),
            Error::Closed => f.write_str("peer closed the connection during the handshake"),
            Error::Timeout => f.write_str("handshake timed out"),
            Error::BufferFull => f.write_str("opening handshake too long"),
            Error::Rejected(code) => write!(f, "server rejected handshake: {}", code.reason()),
            Error::RemoteRejected { status_code } => match status_code {
                Some(c) => write!(f, "server responded with unexpected status {}", c),
                None => f.write_str("server response was not a valid HTTP status line"),
            },
            Error::AcceptMismatch => f.write_str("Sec-WebSocket-Accept value did not match"),
            Error::NoBufs => f.write_str("output buffer too small"),
            Error::Cancelled => f.write_str("handshake was cancelled by its owner"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
