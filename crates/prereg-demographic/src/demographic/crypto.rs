use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

const NONCE_LEN: usize = 12;

/// Encrypts applicant payloads before they reach the store.
///
/// `reference_time` is the instant recorded alongside the ciphertext; the same
/// value must be supplied to decrypt it.
pub trait PayloadCipher: Send + Sync {
    fn encrypt(
        &self,
        plaintext: &[u8],
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<u8>, CryptoError>;

    fn decrypt(
        &self,
        ciphertext: &[u8],
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<u8>, CryptoError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("encryption key must be 32 bytes")]
    InvalidKey,
    #[error("payload encryption failed")]
    Encrypt,
    /// Authentication tag did not verify.
    #[error("ciphertext failed authentication")]
    Tampered,
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// AES-256-GCM with a random nonce prepended to each ciphertext.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { cipher })
    }
}

fn associated_data(reference_time: DateTime<Utc>) -> String {
    reference_time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl PayloadCipher for AesGcmCipher {
    fn encrypt(
        &self,
        plaintext: &[u8],
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let aad = associated_data(reference_time);
        let sealed = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce_bytes),
                Payload {
                    msg: plaintext,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::Encrypt)?;

        let mut output = Vec::with_capacity(NONCE_LEN + sealed.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&sealed);
        Ok(output)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        reference_time: DateTime<Utc>,
    ) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() <= NONCE_LEN {
            return Err(CryptoError::Tampered);
        }
        let (nonce_bytes, sealed) = ciphertext.split_at(NONCE_LEN);
        let aad = associated_data(reference_time);
        self.cipher
            .decrypt(
                Nonce::from_slice(nonce_bytes),
                Payload {
                    msg: sealed,
                    aad: aad.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::Tampered)
    }
}

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
