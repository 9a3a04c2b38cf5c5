//! Hash adapter: digest, HMAC and the two Noise HKDF shapes (2- and 3-output),
//! dispatched over a closed set of hash choices rather than a trait object.

#![forbid(unsafe_code)]

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
#[cfg(feature = "blake2")]
use hkdf::SimpleHkdf;
#[cfg(feature = "blake2")]
use hmac::SimpleHmac;
use sha2::{Digest, Sha256 as Sha256Hasher, Sha512 as Sha512Hasher};

#[cfg(feature = "blake2")]
use blake2::{Blake2b512 as Blake2bHasher, Blake2s256 as Blake2sHasher};

use crate::error::{NoiseError, Result};

/// Which hash (and therefore HMAC/HKDF) a protocol name selected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashChoice {
    /// SHA-256, HASHLEN=32.
    Sha256,
    /// SHA-512, HASHLEN=64.
    Sha512,
    /// BLAKE2s, HASHLEN=32.
    #[cfg(feature = "blake2")]
    Blake2s,
    /// BLAKE2b, HASHLEN=64.
    #[cfg(feature = "blake2")]
    Blake2b,
}

impl HashChoice {
    /// Parse the `<Hash>` token from a protocol name.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "SHA256" => Ok(HashChoice::Sha256),
            "SHA512" => Ok(HashChoice::Sha512),
            #[cfg(feature = "blake2")]
            "BLAKE2s" => Ok(HashChoice::Blake2s),
            #[cfg(feature = "blake2")]
            "BLAKE2b" => Ok(HashChoice::Blake2b),
            other => Err(NoiseError::UnknownProtocol(format!(
                "unsupported hash token: {other}"
            ))),
        }
    }

    /// HASHLEN in bytes: 32 or 64.
    pub fn hashlen(self) -> usize {
        match self {
            HashChoice::Sha256 => 32,
            HashChoice::Sha512 => 64,
            #[cfg(feature = "blake2")]
            HashChoice::Blake2s => 32,
            #[cfg(feature = "blake2")]
            HashChoice::Blake2b => 64,
        }
    }

    /// `HASH(data)`.
    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashChoice::Sha256 => Sha256Hasher::digest(data).to_vec(),
            HashChoice::Sha512 => Sha512Hasher::digest(data).to_vec(),
            #[cfg(feature = "blake2")]
            HashChoice::Blake2s => Blake2sHasher::digest(data).to_vec(),
            #[cfg(feature = "blake2")]
            HashChoice::Blake2b => Blake2bHasher::digest(data).to_vec(),
        }
    }

    /// `HMAC-HASH(key, data)`. HMAC accepts a key of any length, so the
    /// only failure mode here is a primitive bug, not caller input.
    pub fn hmac(self, key: &[u8], data: &[u8]) -> Vec<u8> {
        match self {
            HashChoice::Sha256 => {
                let mut mac = Hmac::<Sha256Hasher>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            HashChoice::Sha512 => {
                let mut mac = Hmac::<Sha512Hasher>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            #[cfg(feature = "blake2")]
            HashChoice::Blake2s => {
                let mut mac = SimpleHmac::<Blake2sHasher>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
            #[cfg(feature = "blake2")]
            HashChoice::Blake2b => {
                let mut mac = SimpleHmac::<Blake2bHasher>::new_from_slice(key)
                    .expect("HMAC accepts keys of any length");
                mac.update(data);
                mac.finalize().into_bytes().to_vec()
            }
        }
    }

    /// The Noise `HKDF(chaining_key, input_key_material, num_outputs)`
    /// construction: HKDF-Extract with `chaining_key` as salt, then
    /// HKDF-Expand with empty info for `num_outputs * HASHLEN` bytes,
    /// split into `num_outputs` chunks.
    fn hkdf_expand(self, salt: &[u8], ikm: &[u8], num_outputs: usize) -> Vec<u8> {
        let mut okm = vec![0u8; num_outputs * self.hashlen()];
        match self {
            HashChoice::Sha256 => {
                let hk = Hkdf::<Sha256Hasher>::new(Some(salt), ikm);
                hk.expand(&[], &mut okm)
                    .expect("okm length bounded by num_outputs * hashlen");
            }
            HashChoice::Sha512 => {
                let hk = Hkdf::<Sha512Hasher>::new(Some(salt), ikm);
                hk.expand(&[], &mut okm)
                    .expect("okm length bounded by num_outputs * hashlen");
            }
            #[cfg(feature = "blake2")]
            HashChoice::Blake2s => {
                let hk = SimpleHkdf::<Blake2sHasher>::new(Some(salt), ikm);
                hk.expand(&[], &mut okm)
                    .expect("okm length bounded by num_outputs * hashlen");
            }
            #[cfg(feature = "blake2")]
            HashChoice::Blake2b => {
                let hk = SimpleHkdf::<Blake2bHasher>::new(Some(salt), ikm);
                hk.expand(&[], &mut okm)
                    .expect("okm length bounded by num_outputs * hashlen");
            }
        }
        okm
    }

    /// 2-output HKDF: used by `mix_key` and `split`.
    pub fn hkdf2(self, chaining_key: &[u8], ikm: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let okm = self.hkdf_expand(chaining_key, ikm, 2);
        let h = self.hashlen();
        (okm[..h].to_vec(), okm[h..2 * h].to_vec())
    }

    /// 3-output HKDF: used by `mix_key_and_hash` (PSK mixing).
    pub fn hkdf3(self, chaining_key: &[u8], ikm: &[u8]) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let okm = self.hkdf_expand(chaining_key, ikm, 3);
        let h = self.hashlen();
        (
            okm[..h].to_vec(),
            okm[h..2 * h].to_vec(),
            okm[2 * h..3 * h].to_vec(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashlens_match_spec() {
        assert_eq!(HashChoice::Sha256.hashlen(), 32);
        assert_eq!(HashChoice::Sha512.hashlen(), 64);
        #[cfg(feature = "blake2")]
        {
            assert_eq!(HashChoice::Blake2s.hashlen(), 32);
            assert_eq!(HashChoice::Blake2b.hashlen(), 64);
        }
    }

    #[test]
    fn hash_is_deterministic() {
        let a = HashChoice::Sha256.hash(b"noise");
        let b = HashChoice::Sha256.hash(b"noise");
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn hkdf2_outputs_are_distinct_and_sized() {
        let ck = [1u8; 32];
        let (a, b) = HashChoice::Sha256.hkdf2(&ck, b"ikm");
        assert_eq!(a.len(), 32);
        assert_eq!(b.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn hkdf3_first_two_outputs_match_hkdf2() {
        // HKDF-Expand with empty info is prefix-stable: asking for more
        // output bytes only appends more T(i) blocks.
        let ck = [9u8; 32];
        let (a2, b2) = HashChoice::Sha256.hkdf2(&ck, b"ikm");
        let (a3, b3, _c3) = HashChoice::Sha256.hkdf3(&ck, b"ikm");
        assert_eq!(a2, a3);
        assert_eq!(b2, b3);
    }

    #[test]
    fn parse_rejects_unknown_hash() {
        assert!(HashChoice::parse("MD5").is_err());
    }
}
