// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! End-to-end scenarios from spec.md §8, driven over an in-memory duplex
//! (`support::Half`) rather than a real socket.

mod support;

use sp_ws_handshake::{
    error::Error,
    handshake::{
        io::{Deadline, FixedPipe},
        machine::{Config, Handshake, Mode},
    },
    protocol::SpType,
};
use std::time::Duration;

fn client_mode() -> Mode {
    Mode::Client { host: "example.com".into(), resource: "/sp".into() }
}

#[test]
fn happy_path_req_client_rep_server() {
    let (client_half, server_half) = support::duplex();
    let mut client = Handshake::new(client_mode(), Deadline::new(), FixedPipe(SpType::Req), Config::default());
    let mut server = Handshake::new(Mode::Server, Deadline::new(), FixedPipe(SpType::Rep), Config::default());

    let (client_res, server_res) =
        futures::executor::block_on(futures::future::join(client.start(client_half), server.start(server_half)));
    let (_client_sock, client_result) = client_res;
    let (_server_sock, server_result) = server_res;

    let client_outcome = client_result.expect("client should reach OK");
    let server_outcome = server_result.expect("server should reach OK");
    assert_eq!(client_outcome.negotiated, SpType::Req);
    assert_eq!(server_outcome.negotiated, SpType::Req);
    assert_eq!(server_outcome.protocol.as_deref(), Some("x-nanomsg-req"));
}

#[test]
fn incompatible_peer_is_rejected_on_both_sides() {
    let (client_half, server_half) = support::duplex();
    let pub_mode = client_mode();
    let mut client = Handshake::new(pub_mode, Deadline::new(), FixedPipe(SpType::Pub), Config::default());
    let mut server = Handshake::new(Mode::Server, Deadline::new(), FixedPipe(SpType::Req), Config::default());

    let (client_res, server_res) =
        futures::executor::block_on(futures::future::join(client.start(client_half), server.start(server_half)));
    let client_result = client_res.1;
    let server_result = server_res.1;

    assert!(matches!(server_result, Err(Error::Rejected(sp_ws_handshake::protocol::ResponseCode::NotPeer))));
    assert!(matches!(client_result, Err(Error::RemoteRejected { status_code: Some(400) })));
}

#[test]
fn absent_protocol_header_defaults_to_pair() {
    // A hand-written request (no Sec-WebSocket-Protocol) pushed directly
    // onto the wire, standing in for a minimal PAIR-only peer.
    let raw = b"GET /sp HTTP/1.1\r\n\
                Host: example.com\r\n\
                Upgrade: websocket\r\n\
                Connection: Upgrade\r\n\
                Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
                Sec-WebSocket-Version: 13\r\n\r\n";

    let (client_half, server_half) = support::duplex();
    client_half.push_raw(raw);
    let mut server = Handshake::new(Mode::Server, Deadline::new(), FixedPipe(SpType::Pair), Config::default());
    let (_sock, result) = futures::executor::block_on(server.start(server_half));
    assert!(matches!(result, Ok(ref outcome) if outcome.negotiated == SpType::Pair));

    let (client_half, server_half) = support::duplex();
    client_half.push_raw(raw);
    let mut server = Handshake::new(Mode::Server, Deadline::new(), FixedPipe(SpType::Req), Config::default());
    let (_sock, result) = futures::executor::block_on(server.start(server_half));
    assert!(matches!(result, Err(Error::Rejected(sp_ws_handshake::protocol::ResponseCode::NotPeer))));
}

#[test]
fn client_drops_connection_on_oversized_response() {
    let (client_half, server_half) = support::duplex();
    // A non-conforming peer that floods the client with header bytes and
    // never sends a CRLF CRLF terminator.
    server_half.push_raw(&vec![b'a'; 256]);

    let config = Config { recv_capacity: 64, ..Config::default() };
    let mut client = Handshake::new(client_mode(), Deadline::new(), FixedPipe(SpType::Req), config);
    let (_sock, result) = futures::executor::block_on(client.start(client_half));
    assert!(matches!(result, Err(Error::BufferFull)));
}

#[test]
fn dribble_fed_request_still_completes_within_read_bounds() {
    // Stands in for "one byte every 10ms" (spec.md §8 scenario 5): since
    // `Half::push_raw` bypasses `AsyncWrite` entirely, all the bytes are
    // already queued before `start` runs, so the real property under test
    // is purely the parser's own next-read-length bookkeeping rather than
    // wall-clock pacing.
    let (client_half, server_half) = support::duplex();
    let raw = b"GET /sp HTTP/1.1\r\n\
                Host: example.com\r\n\
                Upgrade: websocket\r\n\
                Connection: Upgrade\r\n\
                Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
                Sec-WebSocket-Version: 13\r\n\
                Sec-WebSocket-Protocol: x-nanomsg-req\r\n\r\n";
    for byte in raw {
        client_half.push_raw(std::slice::from_ref(byte));
    }

    let mut server = Handshake::new(Mode::Server, Deadline::new(), FixedPipe(SpType::Rep), Config::default());
    let (_sock, result) = futures::executor::block_on(server.start(server_half));
    let outcome = result.expect("dribble-fed request should still complete");
    assert_eq!(outcome.negotiated, SpType::Req);
    assert!(server.read_calls() <= raw.len(), "should never issue more reads than bytes available");
}

#[test]
fn handshake_times_out_when_peer_never_replies() {
    let (_client_half, server_half) = support::duplex();
    let config = Config { timeout: Duration::from_millis(30), ..Config::default() };
    let mut server = Handshake::new(Mode::Server, Deadline::new(), FixedPipe(SpType::Pair), config);
    let (_sock, result) = futures::executor::block_on(server.start(server_half));
    assert!(matches!(result, Err(Error::Timeout)));
}
