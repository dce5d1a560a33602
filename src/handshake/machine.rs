// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The handshake state machine (spec.md §4.H): coordinates the parser, the
//! message builders, and an externally owned socket/timer into a terminal
//! `Ok(Outcome)` / `Err(Error)` result.
//!
//! Rather than a table-driven dispatcher sitting on top of a separate pure
//! transition function, the states below are the `match` arms of
//! [`Handshake::run_client`] / [`Handshake::run_server`] directly — the
//! "generic FSM dispatch scaffolding" spec.md §1 calls out of scope is a
//! multi-instance event-loop concern, not the internal control flow of one
//! handshake.

use super::{
    io::{AsyncSocket, PipeBase, Timer},
    request::{self, ClientOpening},
    response::{self, ParseServerResponse, RejectReason},
    ParseStatus, CRLFCRLF,
};
use crate::{
    accept,
    error::Error,
    protocol::{ResponseCode, SpType},
};
use futures::{
    future::{self, Either},
    io::{AsyncReadExt, AsyncWriteExt},
};
use rand::RngCore;
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

/// The server identifies itself with this in the `Server:` response header.
const SERVER_BANNER: &str = concat!("sp-ws/", env!("CARGO_PKG_VERSION"));

/// The states of spec.md §3/§4.H, occupied one at a time.
///
/// `HandshakeSent` is carried for fidelity with the reference state set but
/// is never entered by any transition here — see DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    ServerRecv,
    ServerReply,
    ClientSend,
    ClientRecv,
    #[allow(dead_code)]
    HandshakeSent,
    StoppingTimerError,
    StoppingTimerDone,
    Stopping,
    Done,
}

/// Which role this instance plays, and the parameters only the client side
/// needs to build its request line (spec.md §3, §6 `start`).
#[derive(Debug, Clone)]
pub enum Mode {
    /// Act as the party issuing the `GET` request.
    Client {
        /// Value of the `Host` header.
        host: String,
        /// Request target, e.g. `"/"`. Must be non-empty (spec.md §6).
        resource: String,
    },
    /// Act as the party replying with `101` or `400`.
    Server,
}

/// In-memory tunables for one handshake (spec.md §3 "added" `Config`).
///
/// Unlike the rest of the crate's ambient state this is never read from the
/// environment or a file — spec.md §6 is explicit that the subsystem has no
/// persistent configuration surface beyond what its owner passes to `start`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Capacity of the receive buffer. The reference implementation fixes
    /// this at a few KiB; here it is a constructor parameter.
    pub recv_capacity: usize,
    /// Handshake-wide deadline (spec.md §5). Covers the entire exchange,
    /// not any single read or write.
    pub timeout: Duration,
    /// How many consecutive zero-progress writes a send may absorb before
    /// giving up with an I/O error (spec.md §3 "a retry counter").
    pub max_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config { recv_capacity: 4096, timeout: Duration::from_secs(5), max_retries: 3 }
    }
}

/// The result of a handshake that reached `OK` (spec.md §4.H `leave(rc)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The SP socket type this connection was negotiated for.
    pub negotiated: SpType,
    /// The raw `Sec-WebSocket-Protocol` token the peer echoed, if any.
    pub protocol: Option<String>,
}

/// A cooperative cancellation flag, shareable across tasks.
///
/// Cloning shares the same underlying flag; calling [`StopHandle::request`]
/// from any clone is observed by the handshake at its next suspension point
/// (spec.md §5: "Cancellation ... a `stop` event at any non-terminal
/// state").
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    fn new() -> Self {
        StopHandle(Arc::new(AtomicBool::new(false)))
    }

    /// Request that the handshake abandon its work and return `IDLE`.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives one RFC 6455 opening handshake, client or server role, to
/// completion over an externally owned socket.
///
/// `T` is the deadline timer, `P` the SP-compatibility oracle (spec.md §6).
/// The socket itself is not stored on the instance: it is borrowed for the
/// duration of [`Handshake::start`] and handed back by value when that
/// future resolves, the direct analogue of the reference implementation's
/// `swap_owner`.
pub struct Handshake<T, P> {
    state: State,
    timer: T,
    pipe: P,
    config: Config,
    mode: Mode,
    stop: StopHandle,
    read_calls: usize,
}

impl<T: Timer, P: PipeBase> Handshake<T, P> {
    /// Construct a new instance in `IDLE` (spec.md §6 `init`).
    ///
    /// Panics if `mode` is [`Mode::Client`] with an empty `resource` —
    /// spec.md §6 requires a non-empty resource for client mode, and
    /// nothing downstream can recover from one.
    pub fn new(mode: Mode, timer: T, pipe: P, config: Config) -> Self {
        if let Mode::Client { resource, .. } = &mode {
            assert!(!resource.is_empty(), "client mode requires a non-empty resource");
        }
        Handshake { state: State::Idle, timer, pipe, config, mode, stop: StopHandle::new(), read_calls: 0 }
    }

    /// Whether this instance is currently `IDLE` and safe to [`Handshake::start`].
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// The number of read calls issued so far by the most recent (or
    /// current) [`Handshake::start`] call. Exposed for the dribble-read
    /// testable property in spec.md §8.
    pub fn read_calls(&self) -> usize {
        self.read_calls
    }

    /// Obtain a cloneable handle that can request cancellation of an
    /// in-flight [`Handshake::start`] from another task (spec.md §6 `stop`).
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the opening handshake to completion, taking ownership of
    /// `socket` for the duration and returning it alongside the result
    /// (spec.md §4.H `leave(rc)` / §5 `swap_owner`).
    ///
    /// Precondition: `self.is_idle()`. On return the instance is once again
    /// `IDLE` only if the handshake was cancelled via [`StopHandle::request`];
    /// otherwise it has reached its one-and-only terminal transition
    /// (spec.md §3 invariant 5) and must not be started again.
    pub async fn start<S: AsyncSocket>(&mut self, mut socket: S) -> (S, Result<Outcome, Error>) {
        debug_assert!(self.is_idle(), "Handshake::start called on a non-idle instance");
        self.read_calls = 0;
        self.timer.reset(self.config.timeout);
        log::trace!("handshake starting: {:?}", self.mode);

        let result = match self.mode {
            Mode::Client { .. } => self.run_client(&mut socket).await,
            Mode::Server => self.run_server(&mut socket).await,
        };
        let result = self.finish(result).await;
        (socket, result)
    }

    /// Stop the timer (spec.md §4.H's universal "stop timer" action) and
    /// settle the final state: `DONE` on any real outcome, back to `IDLE`
    /// only after an [`Error::Cancelled`] (spec.md §5).
    async fn finish(&mut self, result: Result<Outcome, Error>) -> Result<Outcome, Error> {
        self.state = match &result {
            Err(Error::Cancelled) => State::Stopping,
            Ok(_) => State::StoppingTimerDone,
            Err(_) => State::StoppingTimerError,
        };
        self.timer.stop().await;
        self.state = if matches!(result, Err(Error::Cancelled)) { State::Idle } else { State::Done };
        log::trace!("handshake finished: {:?}", result);
        result
    }

    async fn run_server<S: AsyncSocket>(&mut self, socket: &mut S) -> Result<Outcome, Error> {
        let local = self.pipe.local_type();
        self.state = State::ServerRecv;

        let mut buf = vec![0u8; self.config.recv_capacity];
        let mut pos = 0usize;
        let mut want = request::MIN_REQUEST_LEN.min(self.config.recv_capacity);

        loop {
            if self.stop.requested() {
                return Err(Error::Cancelled);
            }
            if pos + want > self.config.recv_capacity {
                log::warn!("opening request exceeded {} bytes before a terminator appeared", self.config.recv_capacity);
                return self.server_reply(socket, ResponseCode::TooBig, None).await;
            }

            let n = read_or_timeout(socket, &mut self.timer, &mut buf[pos..pos + want]).await?;
            self.read_calls += 1;
            if n == 0 {
                log::warn!("peer closed the connection mid-handshake");
                return Err(Error::Closed);
            }
            pos += n;

            match request::parse_client_opening(&buf[..pos], local) {
                ParseStatus::Valid(opening) => {
                    return self.server_reply(socket, ResponseCode::Ok, Some(&opening)).await;
                }
                ParseStatus::Invalid(code) => {
                    return self.server_reply(socket, code, None).await;
                }
                ParseStatus::RecvMore => {
                    want = next_read_len(&buf[..pos]);
                }
            }
        }
    }

    async fn server_reply<S: AsyncSocket>(
        &mut self,
        socket: &mut S,
        code: ResponseCode,
        opening: Option<&ClientOpening<'_>>,
    ) -> Result<Outcome, Error> {
        self.state = State::ServerReply;
        let mut out = Vec::new();
        let outcome = match code {
            ResponseCode::Ok => {
                let opening = opening.expect("OK reply always carries the parsed request");
                let accept_key = accept::derive(opening.key);
                response::encode_accept(&mut out, SERVER_BANNER, &accept_key, opening.protocol);
                Ok(Outcome {
                    negotiated: opening.negotiated,
                    protocol: opening.protocol.map(|p| String::from_utf8_lossy(p).into_owned()),
                })
            }
            other => {
                log::debug!("rejecting opening handshake: {}", other.reason());
                response::encode_reject(&mut out, other, None);
                Err(Error::Rejected(other))
            }
        };
        send_all(socket, &mut self.timer, &out, self.config.max_retries).await?;
        outcome
    }

    async fn run_client<S: AsyncSocket>(&mut self, socket: &mut S) -> Result<Outcome, Error> {
        let (host, resource) = match &self.mode {
            Mode::Client { host, resource } => (host.clone(), resource.clone()),
            Mode::Server => unreachable!("run_client is only invoked in client mode"),
        };
        let local = self.pipe.local_type();
        let key = random_key(&mut rand::thread_rng());
        let expected_accept = accept::derive(&key);

        self.state = State::ClientSend;
        let mut out = Vec::new();
        request::encode_request(&mut out, &host, &resource, &key, local);
        send_all(socket, &mut self.timer, &out, self.config.max_retries).await?;

        self.state = State::ClientRecv;
        let mut buf = vec![0u8; self.config.recv_capacity];
        let mut pos = 0usize;
        let mut want = response::MIN_RESPONSE_LEN.min(self.config.recv_capacity);

        loop {
            if self.stop.requested() {
                return Err(Error::Cancelled);
            }
            if pos + want > self.config.recv_capacity {
                log::warn!("server response exceeded {} bytes before a terminator appeared", self.config.recv_capacity);
                return Err(Error::BufferFull);
            }

            let n = read_or_timeout(socket, &mut self.timer, &mut buf[pos..pos + want]).await?;
            self.read_calls += 1;
            if n == 0 {
                log::warn!("peer closed the connection mid-handshake");
                return Err(Error::Closed);
            }
            pos += n;

            match response::parse_server_response(&buf[..pos], &expected_accept) {
                ParseServerResponse::Valid(accepted) => {
                    return Ok(Outcome {
                        negotiated: local,
                        protocol: accepted.protocol.map(|p| String::from_utf8_lossy(p).into_owned()),
                    });
                }
                ParseServerResponse::Invalid(reason) => {
                    log::debug!("server rejected handshake: {:?}", reason);
                    return Err(match reason {
                        RejectReason::UnexpectedStatus(code) => Error::RemoteRejected { status_code: Some(code) },
                        RejectReason::AcceptMismatch => Error::AcceptMismatch,
                        RejectReason::MalformedStatusLine | RejectReason::MissingOrBadHeaders => {
                            Error::RemoteRejected { status_code: None }
                        }
                    });
                }
                ParseServerResponse::RecvMore => {
                    want = next_read_len(&buf[..pos]);
                }
            }
        }
    }
}

/// Race a single `read` against the deadline timer.
async fn read_or_timeout<S: AsyncSocket, T: Timer>(
    socket: &mut S,
    timer: &mut T,
    buf: &mut [u8],
) -> Result<usize, Error> {
    let read_fut = socket.read(buf);
    let timer_fut = timer.fired();
    futures::pin_mut!(read_fut);
    futures::pin_mut!(timer_fut);
    match future::select(read_fut, timer_fut).await {
        Either::Left((res, _)) => Ok(res?),
        Either::Right(((), _)) => Err(Error::Timeout),
    }
}

/// Send the whole of `buf`, racing each partial write against the deadline
/// timer and tolerating up to `max_retries` consecutive zero-progress
/// writes before giving up (spec.md §3 "a retry counter").
async fn send_all<S: AsyncSocket, T: Timer>(
    socket: &mut S,
    timer: &mut T,
    buf: &[u8],
    max_retries: usize,
) -> Result<(), Error> {
    let mut sent = 0;
    let mut stalls = 0;
    while sent < buf.len() {
        let write_fut = socket.write(&buf[sent..]);
        let timer_fut = timer.fired();
        futures::pin_mut!(write_fut);
        futures::pin_mut!(timer_fut);
        match future::select(write_fut, timer_fut).await {
            Either::Left((Ok(0), _)) => {
                stalls += 1;
                if stalls > max_retries {
                    return Err(Error::Io(io::Error::new(io::ErrorKind::WriteZero, "write returned zero")));
                }
            }
            Either::Left((Ok(n), _)) => {
                sent += n;
                stalls = 0;
            }
            Either::Left((Err(e), _)) => return Err(e.into()),
            Either::Right(((), _)) => return Err(Error::Timeout),
        }
    }
    socket.flush().await?;
    Ok(())
}

/// Generate a 16-byte nonce and Base64-encode it into the 24-character
/// `Sec-WebSocket-Key` value (spec.md §4.E).
fn random_key(rng: &mut impl RngCore) -> [u8; 24] {
    let mut nonce = [0u8; 16];
    rng.fill_bytes(&mut nonce);
    let mut scratch = [0u8; 25];
    let n = crate::base64::encode(&nonce, &mut scratch).expect("24-byte key always fits");
    debug_assert_eq!(n, 24);
    let mut key = [0u8; 24];
    key.copy_from_slice(&scratch[..24]);
    key
}

/// The dribble-read length computation (spec.md §4.H): find the longest
/// suffix of `buf` that is a prefix of `CRLF CRLF`, and request exactly
/// enough more bytes to complete it if that suffix continues unbroken.
fn next_read_len(buf: &[u8]) -> usize {
    let max_check = CRLFCRLF.len() - 1;
    let check_len = max_check.min(buf.len());
    for suffix_len in (1..=check_len).rev() {
        if CRLFCRLF.starts_with(&buf[buf.len() - suffix_len..]) {
            return CRLFCRLF.len() - suffix_len;
        }
    }
    CRLFCRLF.len()
}
