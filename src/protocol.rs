// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! The static table binding SP socket types to `x-<family>-<role>`
//! sub-protocol tokens, and the server-side response codes that steer
//! which reply the handshake sends.

/// An SP (Scalability Protocol) socket type.
///
/// The set is closed: these are exactly the ten socket types the reference
/// sub-protocol map recognizes. Two types are peer-compatible per
/// [`SpType::is_peer`] — e.g. `Req`/`Rep`, `Pub`/`Sub`, `Pair`/`Pair`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SpType {
    Pair,
    Req,
    Rep,
    Pub,
    Sub,
    Surveyor,
    Respondent,
    Push,
    Pull,
    Bus,
}

struct Entry {
    id: SpType,
    token: &'static str,
}

// Static, closed table — kept as a linear array rather than a map since
// its size (10) never changes and a linear scan is cheaper to reason about
// than hashing for a table this small.
static SP_MAP: &[Entry] = &[
    Entry { id: SpType::Pair, token: "x-nanomsg-pair" },
    Entry { id: SpType::Req, token: "x-nanomsg-req" },
    Entry { id: SpType::Rep, token: "x-nanomsg-rep" },
    Entry { id: SpType::Pub, token: "x-nanomsg-pub" },
    Entry { id: SpType::Sub, token: "x-nanomsg-sub" },
    Entry { id: SpType::Surveyor, token: "x-nanomsg-surveyor" },
    Entry { id: SpType::Respondent, token: "x-nanomsg-respondent" },
    Entry { id: SpType::Push, token: "x-nanomsg-push" },
    Entry { id: SpType::Pull, token: "x-nanomsg-pull" },
    Entry { id: SpType::Bus, token: "x-nanomsg-bus" },
];

impl SpType {
    /// Look up the `x-<family>-<role>` token for this socket type.
    ///
    /// Every variant of `SpType` has an entry in the static table, so this
    /// never fails; a missing entry for a locally configured socket type
    /// would be a programmer error (spec.md §7.6).
    pub fn token(self) -> &'static str {
        SP_MAP
            .iter()
            .find(|e| e.id == self)
            .map(|e| e.token)
            .expect("SP_MAP has an entry for every SpType variant")
    }

    /// Look up the socket type for a `Sec-WebSocket-Protocol` token,
    /// case-insensitively.
    pub fn from_token(token: &[u8]) -> Option<SpType> {
        SP_MAP
            .iter()
            .find(|e| e.token.as_bytes().eq_ignore_ascii_case(token))
            .map(|e| e.id)
    }

    /// Whether `self` and `other` may interoperate over one connection.
    pub fn is_peer(self, other: SpType) -> bool {
        use SpType::*;
        match (self, other) {
            (Pair, Pair) => true,
            (Req, Rep) | (Rep, Req) => true,
            (Pub, Sub) | (Sub, Pub) => true,
            (Surveyor, Respondent) | (Respondent, Surveyor) => true,
            (Push, Pull) | (Pull, Push) => true,
            (Bus, Bus) => true,
            _ => false,
        }
    }
}

/// Server-side reason for the handshake outcome, mirroring the reference
/// implementation's response code discriminant (spec.md §3).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResponseCode {
    /// The request is valid and compatible; reply with `101`.
    Ok,
    /// The opening handshake exceeded the receive buffer before a
    /// terminator appeared.
    TooBig,
    /// Required headers are missing, or `Upgrade`/`Connection` mismatched.
    WsProto,
    /// `Sec-WebSocket-Version` was not `13`.
    WsVersion,
    /// Reserved: the reference parser never produces this value (see
    /// DESIGN.md — an open question in spec.md §9 left it unreachable).
    NnProto,
    /// The `Sec-WebSocket-Protocol` token names a known SP type that is
    /// not a compatible peer of the local socket type.
    NotPeer,
    /// The `Sec-WebSocket-Protocol` token does not name any known SP type.
    UnknownType,
}

impl ResponseCode {
    /// The human-readable reason phrase used in the `400` reply
    /// (spec.md §4.E).
    pub fn reason(self) -> &'static str {
        match self {
            ResponseCode::Ok => "OK",
            ResponseCode::TooBig => "Opening Handshake Too Long",
            ResponseCode::WsProto => "Cannot Have Body",
            ResponseCode::WsVersion => "Unsupported WebSocket Version",
            ResponseCode::NnProto => "Missing nanomsg Required Headers",
            ResponseCode::NotPeer => "Incompatible Socket Type",
            ResponseCode::UnknownType => "Unrecognized Socket Type",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_round_trips_through_its_token() {
        let all = [
            SpType::Pair,
            SpType::Req,
            SpType::Rep,
            SpType::Pub,
            SpType::Sub,
            SpType::Surveyor,
            SpType::Respondent,
            SpType::Push,
            SpType::Pull,
            SpType::Bus,
        ];
        for t in all {
            let token = t.token();
            assert_eq!(SpType::from_token(token.as_bytes()), Some(t));
        }
    }

    #[test]
    fn token_lookup_is_case_insensitive() {
        assert_eq!(SpType::from_token(b"X-NANOMSG-REQ"), Some(SpType::Req));
    }

    #[test]
    fn unknown_token_is_none() {
        assert_eq!(SpType::from_token(b"x-nanomsg-frobnicate"), None);
    }

    #[test]
    fn peer_compatibility_is_symmetric_for_known_pairs() {
        assert!(SpType::Req.is_peer(SpType::Rep));
        assert!(SpType::Rep.is_peer(SpType::Req));
        assert!(SpType::Pub.is_peer(SpType::Sub));
        assert!(SpType::Pair.is_peer(SpType::Pair));
        assert!(!SpType::Pub.is_peer(SpType::Req));
        assert!(!SpType::Pair.is_peer(SpType::Req));
    }
}
