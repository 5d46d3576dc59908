//! Encryption for tracker credentials and OAuth tokens at rest.
//!
//! Uses ChaCha20-Poly1305 AEAD for authenticated encryption. Keys are zeroed
//! from memory on drop via the `zeroize` crate.

use ring::aead::{
    Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey, CHACHA20_POLY1305,
};
use ring::error::Unspecified;
use ring::rand::{SecureRandom, SystemRandom};
use std::error::Error as StdError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug)]
pub enum CryptoError {
    RandomGeneration,
    Encryption,
    Decryption,
    InvalidFormat(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::RandomGeneration => write!(f, "failed to generate random bytes"),
            CryptoError::Encryption => write!(f, "encryption failed"),
            CryptoError::Decryption => write!(f, "decryption failed"),
            CryptoError::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
        }
    }
}

impl StdError for CryptoError {}

impl From<Unspecified> for CryptoError {
    fn from(_: Unspecified) -> Self {
        CryptoError::Encryption
    }
}

/// The credential-at-rest encryption key. Zeroed from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    #[zeroize(skip)]
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    pub fn generate() -> Result<Self, CryptoError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; KEY_LEN];
        rng.fill(&mut bytes).map_err(|_| CryptoError::RandomGeneration)?;
        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidFormat(format!(
                "key must be {} bytes, got {}",
                KEY_LEN,
                bytes.len()
            )));
        }
        let mut key_bytes = [0u8; KEY_LEN];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let bytes = (0..hex.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|_| CryptoError::InvalidFormat("invalid hex".into()))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

struct OneNonceSequence {
    nonce: Option<Nonce>,
}

impl OneNonceSequence {
    fn new(nonce: Nonce) -> Self {
        Self { nonce: Some(nonce) }
    }
}

impl NonceSequence for OneNonceSequence {
    fn advance(&mut self) -> Result<Nonce, Unspecified> {
        self.nonce.take().ok_or(Unspecified)
    }
}

/// Encrypt plaintext; returns `[nonce(12) || ciphertext || tag(16)]`.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let rng = SystemRandom::new();

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rng.fill(&mut nonce_bytes).map_err(|_| CryptoError::RandomGeneration)?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let unbound_key =
        UnboundKey::new(&CHACHA20_POLY1305, key.as_bytes()).map_err(|_| CryptoError::Encryption)?;
    let nonce_sequence = OneNonceSequence::new(nonce);
    let mut sealing_key = SealingKey::new(unbound_key, nonce_sequence);

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Encryption)?;

    let mut result = nonce_bytes.to_vec();
    result.extend_from_slice(&in_out);
    Ok(result)
}

/// Decrypt data produced by [`encrypt`].
pub fn decrypt(key: &EncryptionKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::InvalidFormat(format!(
            "ciphertext too short: expected at least {} bytes, got {}",
            NONCE_LEN + TAG_LEN,
            ciphertext.len()
        )));
    }

    let nonce_bytes: [u8; NONCE_LEN] = ciphertext[..NONCE_LEN]
        .try_into()
        .map_err(|_| CryptoError::InvalidFormat("failed to extract nonce".into()))?;
    let nonce = Nonce::assume_unique_for_key(nonce_bytes);

    let unbound_key =
        UnboundKey::new(&CHACHA20_POLY1305, key.as_bytes()).map_err(|_| CryptoError::Decryption)?;
    let nonce_sequence = OneNonceSequence::new(nonce);
    let mut opening_key = OpeningKey::new(unbound_key, nonce_sequence);

    let mut in_out = ciphertext[NONCE_LEN..].to_vec();
    let plaintext = opening_key
        .open_in_place(Aad::empty(), &mut in_out)
        .map_err(|_| CryptoError::Decryption)?;

    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let key = EncryptionKey::generate().unwrap();
        let plaintext = b"jira-api-token-xyz";
        let ciphertext = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &ciphertext).unwrap();
        assert_eq!(plaintext, &decrypted[..]);
    }

    #[test]
    fn different_nonces_produce_different_ciphertexts() {
        let key = EncryptionKey::generate().unwrap();
        let plaintext = b"same credential";
        let c1 = encrypt(&key, plaintext).unwrap();
        let c2 = encrypt(&key, plaintext).unwrap();
        assert_ne!(c1, c2);
    }

    #[test]
    fn wrong_key_fails() {
        let key1 = EncryptionKey::generate().unwrap();
        let key2 = EncryptionKey::generate().unwrap();
        let ciphertext = encrypt(&key1, b"secret").unwrap();
        assert!(decrypt(&key2, &ciphertext).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = EncryptionKey::generate().unwrap();
        let mut ciphertext = encrypt(&key, b"original data").unwrap();
        let mid = ciphertext.len() / 2;
        ciphertext[mid] ^= 0xFF;
        assert!(decrypt(&key, &ciphertext).is_err());
    }

    #[test]
    fn too_short_fails() {
        let key = EncryptionKey::generate().unwrap();
        assert!(decrypt(&key, &[0u8; 10]).is_err());
    }

    #[test]
    fn from_hex_roundtrip() {
        let key = EncryptionKey::generate().unwrap();
        let hex: String = key.as_bytes().iter().map(|b| format!("{:02x}", b)).collect();
        let restored = EncryptionKey::from_hex(&hex).unwrap();
        assert_eq!(key.as_bytes(), restored.as_bytes());
    }
}
