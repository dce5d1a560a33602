// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Trait seams to the collaborators spec.md §6 declares external to this
//! subsystem: the byte-stream socket, the timer, and the "pipe base" that
//! exposes local SP socket-type compatibility.

use crate::protocol::SpType;
use futures::{
    future,
    io::{AsyncRead, AsyncWrite},
};
use std::time::Duration;

/// An already-connected, asynchronous, ordered byte-stream socket.
///
/// Blanket-implemented for anything satisfying the bound — there is
/// nothing handshake-specific about it, it is exactly the "event-driven
/// async socket" collaborator spec.md §6 leaves external.
pub trait AsyncSocket: AsyncRead + AsyncWrite + Unpin + Send {}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> AsyncSocket for S {}

/// The handshake-wide deadline timer (spec.md §6).
///
/// Implementations must be cancel-safe: dropping a [`Timer::fired`] future
/// before it resolves must not cause a spurious fire later, and
/// [`Timer::stop`] must guarantee no future [`Timer::fired`] call
/// completes for the previous deadline (spec.md §5, "at-most-one timer in
/// flight").
pub trait Timer: Unpin + Send {
    /// (Re)arm the timer to fire `dur` from now.
    fn reset(&mut self, dur: Duration);

    /// Resolve once the deadline set by the last [`Timer::reset`] elapses.
    /// Never resolves if the timer has been stopped and not reset again.
    fn fired(&mut self) -> impl std::future::Future<Output = ()> + Send + '_;

    /// Stop the timer, awaiting confirmation that it is idle — the Rust
    /// analogue of waiting for the `timer_stopped` event before a terminal
    /// transition (spec.md §4.H, §5).
    fn stop(&mut self) -> impl std::future::Future<Output = ()> + Send + '_;
}

/// The SP-compatibility oracle exposed by the upper "pipe base"
/// abstraction (spec.md §6): the local socket's SP type, and whether a
/// candidate peer type may interoperate with it.
pub trait PipeBase {
    /// This end's own SP socket type.
    fn local_type(&self) -> SpType;

    /// Whether `other` is a compatible peer of [`PipeBase::local_type`].
    fn is_peer(&self, other: SpType) -> bool {
        self.local_type().is_peer(other)
    }
}

/// The default [`Timer`], built on [`futures_timer::Delay`].
///
/// Sufficient for production use and for tests that need a real-time
/// deadline; callers with their own event-loop-integrated timer wheel can
/// implement [`Timer`] directly instead.
#[derive(Debug, Default)]
pub struct Deadline {
    delay: Option<futures_timer::Delay>,
}

impl Deadline {
    /// A timer with nothing armed; [`Timer::fired`] never resolves until
    /// [`Timer::reset`] is called.
    pub fn new() -> Self {
        Deadline { delay: None }
    }
}

impl Timer for Deadline {
    fn reset(&mut self, dur: Duration) {
        self.delay = Some(futures_timer::Delay::new(dur));
    }

    fn fired(&mut self) -> impl std::future::Future<Output = ()> + Send + '_ {
        async move {
            match &mut self.delay {
                Some(delay) => delay.await,
                None => future::pending().await,
            }
        }
    }

    fn stop(&mut self) -> impl std::future::Future<Output = ()> + Send + '_ {
        self.delay = None;
        future::ready(())
    }
}

/// A [`PipeBase`] that simply wraps a fixed [`SpType`]. Sufficient for
/// callers with no richer pipe abstraction to plug in.
#[derive(Debug, Clone, Copy)]
pub struct FixedPipe(pub SpType);

impl PipeBase for FixedPipe {
    fn local_type(&self) -> SpType {
        self.0
    }
}
