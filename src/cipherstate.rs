//! `CipherState`: a key plus a strictly-increasing 64-bit nonce counter,
//! wrapping one AEAD suite.

#![forbid(unsafe_code)]

use crate::cipher::{nonce_from_counter, AeadCipher, CipherChoice, CipherKey};
use crate::error::{NoiseError, Result};

/// Nonce values above this are refused: the next use would reach `2^64 - 1`.
const MAX_NONCE: u64 = u64::MAX - 1;

/// A key (or the absence of one) plus a nonce counter, bound to one cipher suite.
pub struct CipherState {
    choice: CipherChoice,
    cipher: Option<AeadCipher>,
    n: u64,
}

impl core::fmt::Debug for CipherState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CipherState")
            .field("choice", &self.choice)
            .field("has_key", &self.cipher.is_some())
            .field("n", &self.n)
            .finish()
    }
}

impl CipherState {
    /// A `CipherState` with no key set; `has_key()` is false until
    /// [`CipherState::initialize_key`] is called.
    pub fn new(choice: CipherChoice) -> Self {
        Self {
            choice,
            cipher: None,
            n: 0,
        }
    }

    /// Set (or replace) the key and reset the nonce counter to zero.
    pub fn initialize_key(&mut self, key: [u8; 32]) {
        self.cipher = Some(AeadCipher::new(self.choice, CipherKey(key)));
        self.n = 0;
    }

    /// Whether a key has been set.
    pub fn has_key(&self) -> bool {
        self.cipher.is_some()
    }

    /// The AEAD suite this state was constructed with, regardless of
    /// whether a key has been set yet.
    pub fn choice(&self) -> CipherChoice {
        self.choice
    }

    /// Used by rekey flows to jump the nonce counter directly.
    pub fn set_nonce(&mut self, n: u64) {
        self.n = n;
    }

    /// Current nonce value (the one the next `encrypt_with_ad` will use).
    pub fn nonce(&self) -> u64 {
        self.n
    }

    /// Encrypt `plaintext` under the current key/nonce/`ad`, then advance
    /// the nonce. Returns `plaintext` unchanged (no tag) if no key is set.
    pub fn encrypt_with_ad(&mut self, ad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let Some(cipher) = &self.cipher else {
            return Ok(plaintext.to_vec());
        };
        if self.n > MAX_NONCE {
            return Err(NoiseError::NonceExhausted);
        }
        let ct = cipher.seal(nonce_from_counter(self.n), ad, plaintext)?;
        self.n += 1;
        Ok(ct)
    }

    /// Decrypt `ciphertext` under the current key/nonce/`ad`, then advance
    /// the nonce. Returns `ciphertext` unchanged if no key is set. On tag
    /// failure, the nonce is left untouched.
    pub fn decrypt_with_ad(&mut self, ad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let Some(cipher) = &self.cipher else {
            return Ok(ciphertext.to_vec());
        };
        if self.n > MAX_NONCE {
            return Err(NoiseError::NonceExhausted);
        }
        let pt = cipher.open(nonce_from_counter(self.n), ad, ciphertext)?;
        self.n += 1;
        Ok(pt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::CipherChoice;

    #[test]
    fn unkeyed_state_is_pass_through() {
        let mut cs = CipherState::new(CipherChoice::ChaChaPoly);
        assert!(!cs.has_key());
        let pt = b"hello";
        let ct = cs.encrypt_with_ad(b"ad", pt).unwrap();
        assert_eq!(ct, pt);
        let back = cs.decrypt_with_ad(b"ad", &ct).unwrap();
        assert_eq!(back, pt);
        assert_eq!(cs.nonce(), 0, "nonce must not advance while unkeyed");
    }

    #[test]
    fn keyed_roundtrip_advances_nonce() {
        let mut cs = CipherState::new(CipherChoice::ChaChaPoly);
        cs.initialize_key([1u8; 32]);
        let ct0 = cs.encrypt_with_ad(b"ad", b"m0").unwrap();
        assert_eq!(cs.nonce(), 1);
        let _ct1 = cs.encrypt_with_ad(b"ad", b"m1").unwrap();
        assert_eq!(cs.nonce(), 2);

        let mut rx = CipherState::new(CipherChoice::ChaChaPoly);
        rx.initialize_key([1u8; 32]);
        let pt0 = rx.decrypt_with_ad(b"ad", &ct0).unwrap();
        assert_eq!(pt0, b"m0");
    }

    #[test]
    fn decrypt_failure_does_not_advance_nonce() {
        let mut cs = CipherState::new(CipherChoice::ChaChaPoly);
        cs.initialize_key([2u8; 32]);
        let mut ct = cs.encrypt_with_ad(b"ad", b"m").unwrap();
        let before = {
            let mut rx = CipherState::new(CipherChoice::ChaChaPoly);
            rx.initialize_key([2u8; 32]);
            rx.nonce()
        };
        ct[0] ^= 1;
        let mut rx = CipherState::new(CipherChoice::ChaChaPoly);
        rx.initialize_key([2u8; 32]);
        let err = rx.decrypt_with_ad(b"ad", &ct).unwrap_err();
        assert_eq!(err, NoiseError::DecryptFailed);
        assert_eq!(rx.nonce(), before);
    }

    #[test]
    fn refuses_use_at_nonce_exhaustion() {
        let mut cs = CipherState::new(CipherChoice::ChaChaPoly);
        cs.initialize_key([3u8; 32]);
        cs.set_nonce(MAX_NONCE + 1);
        assert_eq!(
            cs.encrypt_with_ad(b"ad", b"m").unwrap_err(),
            NoiseError::NonceExhausted
        );
    }

    #[test]
    fn initialize_key_resets_nonce() {
        let mut cs = CipherState::new(CipherChoice::ChaChaPoly);
        cs.initialize_key([4u8; 32]);
        let _ = cs.encrypt_with_ad(b"", b"x").unwrap();
        assert_eq!(cs.nonce(), 1);
        cs.initialize_key([5u8; 32]);
        assert_eq!(cs.nonce(), 0);
    }
}
