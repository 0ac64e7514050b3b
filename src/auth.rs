//! Authentication of inbound order submissions.
//!
//! The chat client's embedded mini-app signs its payload with a key derived
//! from the bot credential; this module re-derives the key and checks the
//! client digest. A failed check aborts order submission before any state is
//! touched.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation constant of the mini-app signing protocol.
const KEY_DOMAIN: &[u8] = b"WebAppData";

#[derive(Clone)]
pub struct Authenticator {
    derived_key: Vec<u8>,
}

impl Authenticator {
    /// Derives the verification key from the long-lived bot credential.
    pub fn new(bot_credential: &str) -> Self {
        let mut mac =
            HmacSha256::new_from_slice(KEY_DOMAIN).expect("HMAC accepts any key length");
        mac.update(bot_credential.as_bytes());
        Self {
            derived_key: mac.finalize().into_bytes().to_vec(),
        }
    }

    /// Computes the hex digest the client is expected to present for
    /// `payload`.
    pub fn seal(&self, payload: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.derived_key)
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Returns true only when `digest_hex` is the keyed hash of `payload`
    /// under the derived key. Never errors: malformed input is a failed
    /// check. The comparison is constant time.
    pub fn verify(&self, payload: &str, digest_hex: &str) -> bool {
        let Ok(digest) = hex::decode(digest_hex) else {
            return false;
        };
        let mut mac = match HmacSha256::new_from_slice(&self.derived_key) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload.as_bytes());
        mac.verify_slice(&digest).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDENTIAL: &str = "0123456789:long-lived-bot-credential";

    #[test]
    fn seal_is_deterministic() {
        let auth = Authenticator::new(CREDENTIAL);
        assert_eq!(auth.seal("query=1&user=2"), auth.seal("query=1&user=2"));
    }

    #[test]
    fn verify_accepts_a_sealed_payload() {
        let auth = Authenticator::new(CREDENTIAL);
        let digest = auth.seal("query=1&user=2");
        assert!(auth.verify("query=1&user=2", &digest));
    }

    #[test]
    fn any_payload_change_invalidates_the_digest() {
        let auth = Authenticator::new(CREDENTIAL);
        let digest = auth.seal("query=1&user=2");
        assert!(!auth.verify("query=1&user=3", &digest));
        assert!(!auth.verify("query=1&user=2 ", &digest));
    }

    #[test]
    fn different_credentials_produce_different_digests() {
        let auth = Authenticator::new(CREDENTIAL);
        let other = Authenticator::new("another-bot-credential-entirely");
        let payload = "query=1&user=2";
        assert_ne!(auth.seal(payload), other.seal(payload));
        assert!(!other.verify(payload, &auth.seal(payload)));
    }

    #[test]
    fn malformed_digests_are_rejected_not_errors() {
        let auth = Authenticator::new(CREDENTIAL);
        assert!(!auth.verify("payload", "zz-not-hex"));
        assert!(!auth.verify("payload", ""));
        assert!(!auth.verify("payload", "deadbeef"));
    }
}
