// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The RFC 6455 WebSocket opening handshake, specialized for bootstrapping
//! a Scalability-Protocol (SP) message stream over the upgraded connection.
//!
//! Given an already-connected, asynchronous byte-stream socket, this crate
//! performs the opening handshake in either [client][handshake::machine::Mode::Client]
//! or [server][handshake::machine::Mode::Server] role, negotiates an SP
//! sub-protocol token (`x-<family>-<role>`, see [`protocol`]), and hands the
//! socket back to its caller in either an upgraded-and-ready or a failed
//! state — there is no partial success.
//!
//! What this crate does *not* do: general HTTP parsing, TLS, permessage
//! extensions, or anything past the opening handshake itself. Framing SP
//! traffic over the now-upgraded socket is the caller's job.
//!
//! # Example
//!
//! ```no_run
//! # use sp_ws_handshake::{
//! #     error::Error,
//! #     handshake::{
//! #         io::{Deadline, FixedPipe},
//! #         machine::{Config, Handshake, Mode},
//! #     },
//! #     protocol::SpType,
//! # };
//! # use futures::io::{AsyncRead, AsyncWrite};
//! # async fn connect_upstream() -> impl AsyncRead + AsyncWrite + Unpin + Send { todo!() }
//! # async fn run() -> Result<(), Error> {
//! let socket = connect_upstream().await;
//! let mode = Mode::Client { host: "example.com".into(), resource: "/sp".into() };
//! let mut handshake = Handshake::new(mode, Deadline::new(), FixedPipe(SpType::Req), Config::default());
//!
//! let (socket, outcome) = handshake.start(socket).await;
//! let outcome = outcome?;
//! log::info!("negotiated {:?}, protocol {:?}", outcome.negotiated, outcome.protocol);
//! // `socket` is now ready for framed SP traffic.
//! # let _ = socket;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handshake;
pub mod protocol;

mod accept;
mod base64;
mod scan;
mod sha1;

pub use error::Error;
