//! AEAD cipher adapter.
//!
//! Wraps the two AEAD suites the protocol-name grammar can select
//! (`ChaChaPoly`, `AESGCM`) behind one small enum so the rest of the crate
//! dispatches on a value rather than a trait object, per the "instantiate a
//! concrete triple once" design note.

#![forbid(unsafe_code)]

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::ChaCha20Poly1305;
use zeroize::Zeroize;

use crate::error::{NoiseError, Result};

/// Tag length added by either supported AEAD suite.
pub const TAG_LEN: usize = 16;
/// Nonce length used by every Noise AEAD suite.
pub const NONCE_LEN: usize = 12;

/// Which AEAD suite a protocol name selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CipherChoice {
    /// IETF ChaCha20-Poly1305 (RFC 8439).
    ChaChaPoly,
    /// AES-256-GCM.
    #[cfg(feature = "aes-gcm")]
    AesGcm,
}

impl CipherChoice {
    /// Parse the `<Cipher>` token from a protocol name.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "ChaChaPoly" => Ok(CipherChoice::ChaChaPoly),
            #[cfg(feature = "aes-gcm")]
            "AESGCM" => Ok(CipherChoice::AesGcm),
            other => Err(NoiseError::UnknownProtocol(format!(
                "unsupported cipher token: {other}"
            ))),
        }
    }
}

/// 32-byte AEAD key. Zeroized on drop.
#[derive(Clone)]
pub struct CipherKey(pub [u8; 32]);

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Build the Noise-mandated 96-bit nonce: 4 zero bytes followed by the
/// 64-bit counter in little-endian order.
pub fn nonce_from_counter(n: u64) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[4..].copy_from_slice(&n.to_le_bytes());
    nonce
}

/// A keyed AEAD instance for one cipher suite.
pub struct AeadCipher {
    choice: CipherChoice,
    key: CipherKey,
}

impl AeadCipher {
    /// Construct a cipher bound to one key and suite.
    pub fn new(choice: CipherChoice, key: CipherKey) -> Self {
        Self { choice, key }
    }

    /// Encrypt `plaintext` under `(key, nonce, ad)`.
    pub fn seal(&self, nonce: [u8; NONCE_LEN], ad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        match self.choice {
            CipherChoice::ChaChaPoly => {
                let cipher = ChaCha20Poly1305::new_from_slice(&self.key.0)
                    .map_err(|_| NoiseError::DHFailed("bad chachapoly key length"))?;
                cipher
                    .encrypt(
                        (&nonce).into(),
                        Payload {
                            msg: plaintext,
                            aad: ad,
                        },
                    )
                    .map_err(|_| NoiseError::DecryptFailed)
            }
            #[cfg(feature = "aes-gcm")]
            CipherChoice::AesGcm => {
                use aes_gcm::aead::KeyInit as _;
                use aes_gcm::Aes256Gcm;
                let cipher = Aes256Gcm::new_from_slice(&self.key.0)
                    .map_err(|_| NoiseError::DHFailed("bad aes-gcm key length"))?;
                aes_gcm::aead::Aead::encrypt(
                    &cipher,
                    (&nonce).into(),
                    Payload {
                        msg: plaintext,
                        aad: ad,
                    },
                )
                .map_err(|_| NoiseError::DecryptFailed)
            }
        }
    }

    /// Decrypt `ciphertext` under `(key, nonce, ad)`. Tag mismatch surfaces
    /// as [`NoiseError::DecryptFailed`].
    pub fn open(&self, nonce: [u8; NONCE_LEN], ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self.choice {
            CipherChoice::ChaChaPoly => {
                let cipher = ChaCha20Poly1305::new_from_slice(&self.key.0)
                    .map_err(|_| NoiseError::DHFailed("bad chachapoly key length"))?;
                cipher
                    .decrypt(
                        (&nonce).into(),
                        Payload {
                            msg: ciphertext,
                            aad: ad,
                        },
                    )
                    .map_err(|_| NoiseError::DecryptFailed)
            }
            #[cfg(feature = "aes-gcm")]
            CipherChoice::AesGcm => {
                use aes_gcm::aead::KeyInit as _;
                use aes_gcm::Aes256Gcm;
                let cipher = Aes256Gcm::new_from_slice(&self.key.0)
                    .map_err(|_| NoiseError::DHFailed("bad aes-gcm key length"))?;
                aes_gcm::aead::Aead::decrypt(
                    &cipher,
                    (&nonce).into(),
                    Payload {
                        msg: ciphertext,
                        aad: ad,
                    },
                )
                .map_err(|_| NoiseError::DecryptFailed)
            }
        }
    }
}
