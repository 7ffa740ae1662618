//! Secret Sealing Codec
//!
//! Reversible protective transform for sensitive credential fields.
//! Sealed values are AES-256-GCM encrypted and carried as
//! `base64(nonce || ciphertext || tag)`; opening a value that was never
//! sealed fails instead of returning garbage.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroize;

/// AES-256-GCM nonce size in bytes.
const NONCE_SIZE: usize = 12;

/// AES-256-GCM tag size in bytes.
const TAG_SIZE: usize = 16;

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Secret codec error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// The configured master key does not decode to 256 bits.
    #[error("invalid sealing key: {message}")]
    InvalidKey {
        /// What was wrong with the key material.
        message: String,
    },

    /// Sealing failed. Does not include the plaintext.
    #[error("sealing failed")]
    Encrypt,

    /// The value is not a well-formed sealed secret, or fails
    /// authentication. Deliberately carries no detail: the input may be a
    /// plaintext secret that was stored before sealing was applied.
    #[error("sealed value could not be decoded")]
    Decode,
}

/// A nonce sequence that uses a single nonce.
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        self.nonce
            .take()
            .map(Nonce::assume_unique_for_key)
            .ok_or(ring::error::Unspecified)
    }
}

/// AES-256-GCM codec for credential fields at rest.
///
/// The key is zeroed from memory when the codec is dropped.
pub struct SecretCodec {
    key: [u8; KEY_SIZE],
}

impl SecretCodec {
    /// Create a codec with the given key.
    #[must_use]
    pub const fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Create a codec from a base64-encoded 256-bit master key, the form
    /// the configuration carries.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` when the value is not base64 or not 32 bytes.
    pub fn from_base64_key(encoded: &str) -> Result<Self, CodecError> {
        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| CodecError::InvalidKey {
                message: format!("not base64: {e}"),
            })?;
        let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|b: Vec<u8>| CodecError::InvalidKey {
            message: format!("expected {KEY_SIZE} bytes, got {}", b.len()),
        })?;
        Ok(Self::new(key))
    }

    /// Create a codec with a random key that lives only as long as the
    /// process. Suitable for the in-memory store, where records do not
    /// outlive the process either.
    ///
    /// # Errors
    ///
    /// Returns an error if the system random source fails.
    pub fn ephemeral() -> Result<Self, CodecError> {
        let rng = SystemRandom::new();
        let mut key = [0u8; KEY_SIZE];
        rng.fill(&mut key).map_err(|_| CodecError::Encrypt)?;
        Ok(Self::new(key))
    }

    /// Seal a sensitive field for persistence.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption or nonce generation fails.
    pub fn seal(&self, plaintext: &str) -> Result<String, CodecError> {
        let rng = SystemRandom::new();
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill(&mut nonce).map_err(|_| CodecError::Encrypt)?;

        let unbound_key =
            UnboundKey::new(&aead::AES_256_GCM, &self.key).map_err(|_| CodecError::Encrypt)?;
        let mut sealing_key = SealingKey::new(unbound_key, SingleNonce::new(nonce));

        let mut buffer = Vec::with_capacity(NONCE_SIZE + plaintext.len() + TAG_SIZE);
        buffer.extend_from_slice(&nonce);
        let mut ciphertext = plaintext.as_bytes().to_vec();
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut ciphertext)
            .map_err(|_| CodecError::Encrypt)?;
        buffer.append(&mut ciphertext);

        Ok(BASE64.encode(buffer))
    }

    /// Open a sealed field read back from persistence.
    ///
    /// # Errors
    ///
    /// Returns `Decode` when the value is not base64, is too short to hold
    /// a nonce and tag, or fails GCM authentication.
    pub fn open(&self, sealed: &str) -> Result<String, CodecError> {
        let bytes = BASE64.decode(sealed).map_err(|_| CodecError::Decode)?;
        if bytes.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CodecError::Decode);
        }

        let nonce: [u8; NONCE_SIZE] = bytes[..NONCE_SIZE]
            .try_into()
            .map_err(|_| CodecError::Decode)?;

        let unbound_key =
            UnboundKey::new(&aead::AES_256_GCM, &self.key).map_err(|_| CodecError::Decode)?;
        let mut opening_key = OpeningKey::new(unbound_key, SingleNonce::new(nonce));

        let mut buffer = bytes[NONCE_SIZE..].to_vec();
        let plaintext = opening_key
            .open_in_place(Aad::empty(), &mut buffer)
            .map_err(|_| CodecError::Decode)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| CodecError::Decode)
    }
}

impl Drop for SecretCodec {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}
