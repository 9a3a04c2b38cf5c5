//! `SymmetricState`: the chaining key / transcript hash pair that every
//! handshake message mixes into, plus the `CipherState` it derives keys for.

#![forbid(unsafe_code)]

use zeroize::Zeroize;

use crate::cipher::CipherChoice;
use crate::cipherstate::CipherState;
use crate::error::Result;
use crate::hash::HashChoice;

/// Chaining key, transcript hash, and the derived cipher state.
pub struct SymmetricState {
    hash: HashChoice,
    cs: CipherState,
    ck: Vec<u8>,
    h: Vec<u8>,
}

impl core::fmt::Debug for SymmetricState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SymmetricState")
            .field("hash", &self.hash)
            .field("cs", &self.cs)
            .field("h", &self.h)
            .finish_non_exhaustive()
    }
}

impl Drop for SymmetricState {
    fn drop(&mut self) {
        self.ck.zeroize();
        // `h` is a transcript hash, not secret key material, but it is
        // derived from key material at points during the handshake.
        self.h.zeroize();
    }
}

impl SymmetricState {
    /// `InitializeSymmetric(protocol_name)`: `h = HASH(protocol_name)` if
    /// longer than HASHLEN, else `protocol_name` zero-padded to HASHLEN;
    /// `ck = h`.
    pub fn initialize(protocol_name: &str, hash: HashChoice, cipher: CipherChoice) -> Self {
        let name_bytes = protocol_name.as_bytes();
        let hashlen = hash.hashlen();
        let h = if name_bytes.len() <= hashlen {
            let mut buf = vec![0u8; hashlen];
            buf[..name_bytes.len()].copy_from_slice(name_bytes);
            buf
        } else {
            hash.hash(name_bytes)
        };
        let ck = h.clone();
        Self {
            hash,
            cs: CipherState::new(cipher),
            ck,
            h,
        }
    }

    /// Current transcript hash, used as associated data for the first AEAD
    /// payload of a handshake message.
    pub fn h(&self) -> &[u8] {
        &self.h
    }

    /// Whether `mix_key`/`mix_key_and_hash` has keyed the cipher state yet,
    /// used to size an encrypted `s` token while reading a message.
    pub fn cipherstate_has_key(&self) -> bool {
        self.cs.has_key()
    }

    /// `MixHash(data)`: `h = HASH(h || data)`.
    pub fn mix_hash(&mut self, data: &[u8]) {
        let mut input = self.h.clone();
        input.extend_from_slice(data);
        self.h = self.hash.hash(&input);
    }

    /// `MixKey(input_key_material)`: derive a new chaining key and a
    /// temporary key, then `InitializeKey` the cipher state with it.
    pub fn mix_key(&mut self, ikm: &[u8]) {
        let (new_ck, temp_k) = self.hash.hkdf2(&self.ck, ikm);
        self.ck = new_ck;
        self.cs.initialize_key(truncate_key(&temp_k, self.hash));
    }

    /// `MixKeyAndHash(input_key_material)`: used only for `psk` tokens.
    /// Derives `ck`, mixes a hash output into `h`, and rekeys the cipher state.
    pub fn mix_key_and_hash(&mut self, ikm: &[u8]) {
        let (new_ck, temp_h, temp_k) = self.hash.hkdf3(&self.ck, ikm);
        self.ck = new_ck;
        self.mix_hash(&temp_h);
        self.cs.initialize_key(truncate_key(&temp_k, self.hash));
    }

    /// `EncryptAndHash(plaintext)`: encrypt under the current cipher state
    /// (pass-through if unkeyed) using `h` as AD, then `MixHash` the result.
    pub fn encrypt_and_hash(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ct = self.cs.encrypt_with_ad(&self.h, plaintext)?;
        self.mix_hash(&ct);
        Ok(ct)
    }

    /// `DecryptAndHash(ciphertext)`: `MixHash` the *ciphertext* before
    /// attempting to decrypt, so both sides advance `h` identically
    /// regardless of whether decryption succeeds.
    pub fn decrypt_and_hash(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let ad = self.h.clone();
        let pt = self.cs.decrypt_with_ad(&ad, ciphertext)?;
        self.mix_hash(ciphertext);
        Ok(pt)
    }

    /// `Split()`: derive the two transport `CipherState`s from the final
    /// chaining key. Consumes `self` since the handshake is now finished.
    pub fn split(self) -> (CipherState, CipherState) {
        let (k1, k2) = self.hash.hkdf2(&self.ck, &[]);
        let choice = self.cs.choice();
        let mut c1 = CipherState::new(choice);
        c1.initialize_key(truncate_key(&k1, self.hash));
        let mut c2 = CipherState::new(choice);
        c2.initialize_key(truncate_key(&k2, self.hash));
        (c1, c2)
    }
}

/// HKDF outputs are always HASHLEN bytes; AEAD keys are always 32 bytes.
/// For SHA-512/BLAKE2b (HASHLEN=64) only the first 32 bytes are used, per
/// the Noise spec's definition of `MixKey`.
fn truncate_key(okm: &[u8], _hash: HashChoice) -> [u8; 32] {
    let mut key = [0u8; 32];
    key.copy_from_slice(&okm[..32]);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_pads_short_name() {
        let st = SymmetricState::initialize("Noise_NN", HashChoice::Sha256, CipherChoice::ChaChaPoly);
        assert_eq!(st.h().len(), 32);
        assert_eq!(&st.h()[..8], b"Noise_NN");
        assert!(st.h()[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn initialize_hashes_long_name() {
        let name = "Noise_XXpsk0psk1psk2_25519_ChaChaPoly_BLAKE2s_with_a_very_long_suffix_added";
        assert!(name.len() > 32);
        let st = SymmetricState::initialize(name, HashChoice::Sha256, CipherChoice::ChaChaPoly);
        assert_eq!(st.h().len(), 32);
        assert_eq!(st.h().to_vec(), HashChoice::Sha256.hash(name.as_bytes()));
    }

    #[test]
    fn mix_hash_changes_h() {
        let mut st = SymmetricState::initialize("Noise_NN", HashChoice::Sha256, CipherChoice::ChaChaPoly);
        let before = st.h().to_vec();
        st.mix_hash(b"some data");
        assert_ne!(before, st.h());
    }

    #[test]
    fn encrypt_and_hash_passes_through_before_mix_key() {
        let mut st = SymmetricState::initialize("Noise_NN", HashChoice::Sha256, CipherChoice::ChaChaPoly);
        let ct = st.encrypt_and_hash(b"hello").unwrap();
        assert_eq!(ct, b"hello");
    }

    #[test]
    fn mix_key_then_roundtrip() {
        let mut a = SymmetricState::initialize("Noise_NN", HashChoice::Sha256, CipherChoice::ChaChaPoly);
        let mut b = SymmetricState::initialize("Noise_NN", HashChoice::Sha256, CipherChoice::ChaChaPoly);
        a.mix_key(b"shared secret");
        b.mix_key(b"shared secret");
        let ct = a.encrypt_and_hash(b"payload").unwrap();
        let pt = b.decrypt_and_hash(&ct).unwrap();
        assert_eq!(pt, b"payload");
        assert_eq!(a.h(), b.h());
    }

    #[test]
    fn split_yields_independent_keys() {
        let mut st = SymmetricState::initialize("Noise_NN", HashChoice::Sha256, CipherChoice::ChaChaPoly);
        st.mix_key(b"ikm");
        let (mut c1, mut c2) = st.split();
        let ct = c1.encrypt_with_ad(b"", b"msg").unwrap();
        assert!(c2.decrypt_with_ad(b"", &ct).is_err());
    }
}
