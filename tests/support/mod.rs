// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! A minimal in-memory duplex socket for driving [`Handshake::start`]
//! end-to-end without a real network connection, built purely on the
//! crate's public API.
//!
//! [`Handshake::start`]: sp_ws_handshake::handshake::machine::Handshake::start

use futures::io::{AsyncRead, AsyncWrite};
use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Context, Poll},
};

/// One end of an in-memory duplex connection.
///
/// Reads never return `Ok(0)` for "no data yet" — an empty queue reports
/// `Pending` (waking itself immediately, since there is no real I/O
/// readiness source to hook into) rather than signalling end-of-stream,
/// matching how a real non-blocking socket with nothing to offer behaves.
#[derive(Clone)]
pub struct Half {
    inbound: Arc<Mutex<VecDeque<u8>>>,
    outbound: Arc<Mutex<VecDeque<u8>>>,
}

impl Half {
    /// Push bytes directly onto this end's outbound queue, bypassing
    /// `AsyncWrite` — useful for standing in as a raw, non-conforming peer
    /// in tests that only exercise one side's [`Handshake`].
    ///
    /// [`Handshake`]: sp_ws_handshake::handshake::machine::Handshake
    pub fn push_raw(&self, bytes: &[u8]) {
        self.outbound.lock().unwrap().extend(bytes.iter().copied());
    }
}

/// Create a connected pair: bytes written to one side are read from the
/// other.
pub fn duplex() -> (Half, Half) {
    let a_to_b = Arc::new(Mutex::new(VecDeque::new()));
    let b_to_a = Arc::new(Mutex::new(VecDeque::new()));
    let a = Half { inbound: b_to_a.clone(), outbound: a_to_b.clone() };
    let b = Half { inbound: a_to_b, outbound: b_to_a };
    (a, b)
}

impl AsyncRead for Half {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut [u8]) -> Poll<io::Result<usize>> {
        let mut q = self.inbound.lock().unwrap();
        if q.is_empty() {
            cx.waker().wake_by_ref();
            return Poll::Pending;
        }
        let n = buf.len().min(q.len());
        for slot in buf.iter_mut().take(n) {
            *slot = q.pop_front().expect("n bounded by queue length");
        }
        Poll::Ready(Ok(n))
    }
}

impl AsyncWrite for Half {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.outbound.lock().unwrap().extend(buf.iter().copied());
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
