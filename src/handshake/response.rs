// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The server's reply: client-side parsing and server-side encoding
//! (spec.md §4.D, §4.E).

use super::{has_terminator, match_header, skip_unknown_header, CRLF};
use crate::{
    protocol::ResponseCode,
    scan::{Cursor, Match},
};

/// A successfully parsed `101` server response.
#[derive(Debug)]
pub struct ServerAccept<'a> {
    /// The `Sec-WebSocket-Protocol` value the server echoed back, if any.
    pub protocol: Option<&'a [u8]>,
}

/// Why a server response was rejected client-side.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The status line itself did not parse (not `HTTP/1.1 <code> ...`).
    MalformedStatusLine,
    /// A required header (`Upgrade`, `Connection`, `Sec-WebSocket-Accept`)
    /// was missing, or `Upgrade`/`Connection` held the wrong value.
    MissingOrBadHeaders,
    /// The status code was present and well-formed but not `101`.
    UnexpectedStatus(u16),
    /// `Sec-WebSocket-Accept` did not match this client's expected value.
    AcceptMismatch,
}

/// The result of attempting to parse a buffered server response.
#[derive(Debug)]
pub enum ParseServerResponse<'a> {
    /// The server accepted the handshake.
    Valid(ServerAccept<'a>),
    /// The server's response was present but unacceptable.
    Invalid(RejectReason),
    /// The `CRLF CRLF` terminator has not appeared yet.
    RecvMore,
}

/// Parse a server response out of `buf`, checking its `Sec-WebSocket-Accept`
/// value against `expected_accept_key` (computed at request-build time,
/// spec.md §3 invariant 6).
///
/// Recognizes the non-standard `Sec-WebSocket-Version-Server` and
/// `Sec-WebSocket-Protocol-Server` header names rather than the RFC 6455
/// names, matching the reference implementation's behavior verbatim
/// (spec.md §9, preserved for bug-compatibility with extant peers).
pub fn parse_server_response<'a>(buf: &'a [u8], expected_accept_key: &[u8; 28]) -> ParseServerResponse<'a> {
    if !has_terminator(buf) {
        return ParseServerResponse::RecvMore;
    }

    let mut c = Cursor::new(buf);

    if c.match_token(b"HTTP/1.1 ", false, false) != Match::Matched {
        return ParseServerResponse::Invalid(RejectReason::MalformedStatusLine);
    }
    let status_code = match c.match_value(b" ", false, false) {
        Some(v) => v,
        None => return ParseServerResponse::Invalid(RejectReason::MalformedStatusLine),
    };
    if c.match_value(CRLF, false, true).is_none() {
        return ParseServerResponse::Invalid(RejectReason::MalformedStatusLine);
    }

    let mut server = None;
    let mut accept = None;
    let mut upgrade = None;
    let mut connection = None;
    let mut version_server = None;
    let mut protocol_server = None;
    let mut extensions = None;

    loop {
        if c.match_token(CRLF, false, false) == Match::Matched {
            break;
        }
        if let Some(v) = match_header(&mut c, b"Server:") {
            server = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Sec-WebSocket-Accept:") {
            accept = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Upgrade:") {
            upgrade = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Connection:") {
            connection = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Sec-WebSocket-Version-Server:") {
            version_server = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Sec-WebSocket-Protocol-Server:") {
            protocol_server = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Sec-WebSocket-Extensions:") {
            extensions = Some(v);
        } else if !skip_unknown_header(&mut c) {
            return ParseServerResponse::Invalid(RejectReason::MalformedStatusLine);
        }
    }
    let _ = (server, version_server, extensions);

    if Cursor::validate_value(b"101", status_code, false) != Match::Matched {
        let code = std::str::from_utf8(status_code).ok().and_then(|s| s.parse().ok());
        return match code {
            Some(code) => ParseServerResponse::Invalid(RejectReason::UnexpectedStatus(code)),
            None => ParseServerResponse::Invalid(RejectReason::MalformedStatusLine),
        };
    }

    let (upgrade, connection, accept) = match (upgrade, connection, accept) {
        (Some(u), Some(conn), Some(a)) => (u, conn, a),
        _ => return ParseServerResponse::Invalid(RejectReason::MissingOrBadHeaders),
    };

    if Cursor::validate_value(b"websocket", upgrade, true) != Match::Matched {
        return ParseServerResponse::Invalid(RejectReason::MissingOrBadHeaders);
    }
    if Cursor::validate_value(b"Upgrade", connection, true) != Match::Matched {
        return ParseServerResponse::Invalid(RejectReason::MissingOrBadHeaders);
    }
    if Cursor::validate_value(expected_accept_key, accept, true) != Match::Matched {
        return ParseServerResponse::Invalid(RejectReason::AcceptMismatch);
    }

    ParseServerResponse::Valid(ServerAccept { protocol: protocol_server })
}

/// Render a successful (`101`) server reply into `out` (spec.md §4.E).
///
/// `protocol`, if given, is the raw `Sec-WebSocket-Protocol` token value
/// from the client's request, echoed back verbatim.
pub fn encode_accept(out: &mut Vec<u8>, server_banner: &str, accept_key: &[u8], protocol: Option<&[u8]>) {
    out.extend_from_slice(b"HTTP/1.1 101 Switching Protocols\r\n");
    out.extend_from_slice(b"Server: ");
    out.extend_from_slice(server_banner.as_bytes());
    out.extend_from_slice(b"\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n");
    out.extend_from_slice(b"Sec-WebSocket-Accept: ");
    out.extend_from_slice(accept_key);
    if let Some(p) = protocol {
        out.extend_from_slice(b"\r\nSec-WebSocket-Protocol: ");
        out.extend_from_slice(p);
    }
    out.extend_from_slice(b"\r\n\r\n");
}

/// Render a `400` rejection reply into `out` (spec.md §4.E).
///
/// `client_version`, if the client's `Sec-WebSocket-Version` value had
/// already been captured before the rejection was decided, is echoed back.
pub fn encode_reject(out: &mut Vec<u8>, code: ResponseCode, client_version: Option<&[u8]>) {
    out.extend_from_slice(b"HTTP/1.1 400 ");
    out.extend_from_slice(code.reason().as_bytes());
    out.extend_from_slice(b"\r\n");
    if let Some(v) = client_version {
        out.extend_from_slice(b"Sec-WebSocket-Version: ");
        out.extend_from_slice(v);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
}

/// Minimum length of a syntactically valid server response, used as the
/// initial dribble-read size on the client side (spec.md §4.H).
pub const MIN_RESPONSE_LEN: usize = b"HTTP/1.1 101\r\n\r\n".len();
