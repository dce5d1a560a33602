// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or http://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. All files in the project carrying such notice may not be copied,
// modified, or distributed except according to those terms.

//! Derivation of the `Sec-WebSocket-Accept` value from a client nonce
//! (RFC 6455 §4.2.2, spec.md §4.F).

use crate::{base64, sha1::Sha1};

/// The GUID RFC 6455 mandates concatenating to the client's
/// `Sec-WebSocket-Key` before hashing.
pub const MAGIC_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Compute the `Sec-WebSocket-Accept` value for a client's raw (still
/// Base64-encoded, *not* decoded) `Sec-WebSocket-Key` header value.
///
/// The result is always 28 bytes: a Base64 encoding of a 20-byte SHA-1
/// digest, including exactly one `=` pad character.
pub fn derive(client_key: &[u8]) -> [u8; 28] {
    let mut hasher = Sha1::new();
    hasher.update(client_key);
    hasher.update(MAGIC_GUID);
    let digest = hasher.finalize();

    let mut out = [0u8; 28];
    let mut scratch = [0u8; 29];
    let n = base64::encode(&digest, &mut scratch).expect("28-byte output always fits");
    debug_assert_eq!(n, 28);
    out.copy_from_slice(&scratch[..28]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc6455_example() {
        // RFC 6455 §1.3's worked example.
        let key = b"dGhlIHNhbXBsZSBub25jZQ==";
        let accept = derive(key);
        assert_eq!(&accept[..], b"s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }
}
