// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The client's opening request: server-side parsing (spec.md §4.D) and
//! client-side encoding (spec.md §4.E).

use super::{has_terminator, match_header, skip_unknown_header, ParseStatus, CRLF};
use crate::{
    protocol::{ResponseCode, SpType},
    scan::{Cursor, Match},
};

/// The client's opening request, successfully parsed.
///
/// Every field borrows from the receive buffer it was parsed out of
/// (spec.md §3, "Parsed header view"); it cannot outlive that buffer.
#[derive(Debug)]
pub struct ClientOpening<'a> {
    /// The request-target from the `GET` line.
    pub uri: &'a [u8],
    /// `Host` header value.
    pub host: &'a [u8],
    /// `Origin` header value, if sent.
    pub origin: Option<&'a [u8]>,
    /// `Sec-WebSocket-Key` header value, still Base64-encoded.
    pub key: &'a [u8],
    /// `Sec-WebSocket-Version` header value (already validated as `"13"`).
    pub version: &'a [u8],
    /// Raw `Sec-WebSocket-Protocol` header value, if the client sent one.
    pub protocol: Option<&'a [u8]>,
    /// Raw `Sec-WebSocket-Extensions` header value, if any (unused beyond
    /// being captured — permessage extensions are a non-goal, spec.md §1).
    pub extensions: Option<&'a [u8]>,
    /// The SP socket type this request negotiates the connection to, taking
    /// an absent `Sec-WebSocket-Protocol` header to mean `PAIR`
    /// (spec.md §4.D step 7).
    pub negotiated: SpType,
}

/// Parse a client opening request out of `buf`.
///
/// `local` is the SP socket type of the server end of this connection,
/// used to decide SP compatibility (spec.md §4.D step 7). Returns
/// [`ParseStatus::RecvMore`] until a `CRLF CRLF` terminator is present.
pub fn parse_client_opening<'a>(buf: &'a [u8], local: SpType) -> ParseStatus<ClientOpening<'a>> {
    if !has_terminator(buf) {
        return ParseStatus::RecvMore;
    }

    let mut c = Cursor::new(buf);

    if c.match_token(b"GET ", false, false) != Match::Matched {
        return ParseStatus::Invalid(ResponseCode::WsProto);
    }
    let uri = match c.match_value(b" ", false, false) {
        Some(v) => v,
        None => return ParseStatus::Invalid(ResponseCode::WsProto),
    };
    if c.match_token(b"HTTP/1.1", false, false) != Match::Matched {
        return ParseStatus::Invalid(ResponseCode::WsProto);
    }
    if c.match_token(CRLF, false, false) != Match::Matched {
        return ParseStatus::Invalid(ResponseCode::WsProto);
    }

    let mut host = None;
    let mut origin = None;
    let mut key = None;
    let mut upgrade = None;
    let mut connection = None;
    let mut version = None;
    let mut protocol = None;
    let mut extensions = None;

    loop {
        if c.match_token(CRLF, false, false) == Match::Matched {
            break;
        }
        if let Some(v) = match_header(&mut c, b"Host:") {
            host = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Origin:") {
            origin = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Sec-WebSocket-Key:") {
            key = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Upgrade:") {
            upgrade = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Connection:") {
            connection = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Sec-WebSocket-Version:") {
            version = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Sec-WebSocket-Protocol:") {
            protocol = Some(v);
        } else if let Some(v) = match_header(&mut c, b"Sec-WebSocket-Extensions:") {
            extensions = Some(v);
        } else if !skip_unknown_header(&mut c) {
            return ParseStatus::Invalid(ResponseCode::WsProto);
        }
    }

    let (host, upgrade, connection, key, version) = match (host, upgrade, connection, key, version) {
        (Some(h), Some(u), Some(conn), Some(k), Some(v)) => (h, u, conn, k, v),
        _ => return ParseStatus::Invalid(ResponseCode::WsProto),
    };

    if Cursor::validate_value(b"13", version, true) != Match::Matched {
        return ParseStatus::Invalid(ResponseCode::WsVersion);
    }
    if Cursor::validate_value(b"websocket", upgrade, true) != Match::Matched {
        return ParseStatus::Invalid(ResponseCode::WsProto);
    }
    if Cursor::validate_value(b"Upgrade", connection, true) != Match::Matched {
        return ParseStatus::Invalid(ResponseCode::WsProto);
    }

    let negotiated = match protocol {
        Some(token) => match SpType::from_token(token) {
            Some(sp) if local.is_peer(sp) => sp,
            Some(_) => return ParseStatus::Invalid(ResponseCode::NotPeer),
            None => return ParseStatus::Invalid(ResponseCode::UnknownType),
        },
        None if local.is_peer(SpType::Pair) => SpType::Pair,
        None => return ParseStatus::Invalid(ResponseCode::NotPeer),
    };

    ParseStatus::Valid(ClientOpening { uri, host, origin, key, version, protocol, extensions, negotiated })
}

/// Render the client's opening request into `out` (spec.md §4.E).
///
/// `key` is the already Base64-encoded 16-byte nonce (24 characters
/// including its `=` pad); `local` names the SP socket type advertised via
/// `Sec-WebSocket-Protocol`.
pub fn encode_request(out: &mut Vec<u8>, host: &str, resource: &str, key: &[u8], local: SpType) {
    out.extend_from_slice(b"GET ");
    out.extend_from_slice(resource.as_bytes());
    out.extend_from_slice(b" HTTP/1.1\r\n");
    out.extend_from_slice(b"Host: ");
    out.extend_from_slice(host.as_bytes());
    out.extend_from_slice(b"\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n");
    out.extend_from_slice(b"Sec-WebSocket-Key: ");
    out.extend_from_slice(key);
    out.extend_from_slice(b"\r\nSec-WebSocket-Version: 13\r\n");
    out.extend_from_slice(b"Sec-WebSocket-Protocol: ");
    out.extend_from_slice(local.token().as_bytes());
    out.extend_from_slice(b"\r\n\r\n");
}

/// Minimum length of a syntactically valid `GET` opening request: a
/// request line plus the required headers with empty values, used as the
/// initial dribble-read size (spec.md §4.H, "Next-read-length computation").
pub const MIN_REQUEST_LEN: usize = {
    // "GET / HTTP/1.1\r\n" + 5 required header names each with ": \r\n" +
    // the final blank line. This is a deliberately conservative floor: any
    // real request is longer, so the first read will virtually always be
    // followed immediately by a dribble read rather than an exact hit.
    16 + "Host: \r\n".len()
        + "Sec-WebSocket-Key: \r\n".len()
        + "Upgrade: \r\n".len()
        + "Connection: \r\n".len()
        + "Sec-WebSocket-Version: \r\n".len()
        + 2
};
