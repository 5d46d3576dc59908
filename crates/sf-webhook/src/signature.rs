//! `X-Tracker-Signature: sha256=<hex>` verification for inbound webhooks.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Returns `true` when `header_value` is a valid `sha256=<hex>` HMAC of
/// `body` under `secret`. Any malformed header (missing prefix, odd-length
/// hex, wrong digest length) is treated as a mismatch, not an error.
pub fn verify(secret: &[u8], body: &[u8], header_value: &str) -> bool {
    let Some(hex_digest) = header_value.strip_prefix("sha256=") else {
        return false;
    };
    let Some(expected) = decode_hex(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.ct_eq(&expected[..]).into()
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &[u8], body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(body);
        let digest = mac.finalize().into_bytes();
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        format!("sha256={hex}")
    }

    #[test]
    fn accepts_a_correctly_signed_body() {
        let header = sign(b"topsecret", b"{\"event\":\"issue_updated\"}");
        assert!(verify(b"topsecret", b"{\"event\":\"issue_updated\"}", &header));
    }

    #[test]
    fn rejects_wrong_secret() {
        let header = sign(b"topsecret", b"payload");
        assert!(!verify(b"othersecret", b"payload", &header));
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign(b"topsecret", b"payload");
        assert!(!verify(b"topsecret", b"different", &header));
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(!verify(b"topsecret", b"payload", "not-a-signature"));
        assert!(!verify(b"topsecret", b"payload", "sha256=zz"));
    }
}
