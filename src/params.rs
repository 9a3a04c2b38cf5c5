//! Protocol name parsing: `Noise_<Pattern>_<DH>_<Cipher>_<Hash>` fully
//! determines the primitive triple and the handshake pattern.

use crate::cipher::CipherChoice;
use crate::dh::DhChoice;
use crate::error::{NoiseError, Result};
use crate::hash::HashChoice;
use crate::pattern::Pattern;

/// The fully parsed, primitive-resolved form of a protocol name.
#[derive(Clone)]
pub struct NoiseParams {
    /// The exact string this was parsed from; `SymmetricState::initialize`
    /// hashes (or zero-pads) this, so it must be byte-identical to what the
    /// peer used.
    pub name: String,
    /// The parsed handshake pattern (base name plus `pskN` modifiers applied).
    pub pattern: Pattern,
    /// Selected DH algorithm.
    pub dh: DhChoice,
    /// Selected AEAD cipher.
    pub cipher: CipherChoice,
    /// Selected hash/HKDF family.
    pub hash: HashChoice,
}

impl NoiseParams {
    /// Parse `Noise_<Pattern>_<DH>_<Cipher>_<Hash>`.
    pub fn parse(name: &str) -> Result<Self> {
        let mut parts = name.split('_');
        let prefix = parts
            .next()
            .ok_or_else(|| NoiseError::UnknownProtocol(name.to_string()))?;
        if prefix != "Noise" {
            return Err(NoiseError::UnknownProtocol(name.to_string()));
        }
        let pattern_tok = parts
            .next()
            .ok_or_else(|| NoiseError::UnknownProtocol(name.to_string()))?;
        let dh_tok = parts
            .next()
            .ok_or_else(|| NoiseError::UnknownProtocol(name.to_string()))?;
        let cipher_tok = parts
            .next()
            .ok_or_else(|| NoiseError::UnknownProtocol(name.to_string()))?;
        let hash_tok = parts
            .next()
            .ok_or_else(|| NoiseError::UnknownProtocol(name.to_string()))?;
        if parts.next().is_some() {
            return Err(NoiseError::UnknownProtocol(name.to_string()));
        }

        let pattern = Pattern::parse(pattern_tok)?;
        let dh = DhChoice::parse(dh_tok)?;
        let cipher = CipherChoice::parse(cipher_tok)?;
        let hash = HashChoice::parse(hash_tok)?;

        Ok(Self {
            name: name.to_string(),
            pattern,
            dh,
            cipher,
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_name() {
        let p = NoiseParams::parse("Noise_XX_25519_ChaChaPoly_SHA256").unwrap();
        assert_eq!(p.dh, DhChoice::Curve25519);
        assert_eq!(p.cipher, CipherChoice::ChaChaPoly);
        assert_eq!(p.hash, HashChoice::Sha256);
    }

    #[test]
    fn parses_psk_modifier() {
        let p = NoiseParams::parse("Noise_NNpsk0_25519_ChaChaPoly_SHA256").unwrap();
        assert_eq!(p.pattern.message_patterns[0].first(), Some(&crate::pattern::Token::Psk(0)));
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert!(NoiseParams::parse("Nois_XX_25519_ChaChaPoly_SHA256").is_err());
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(NoiseParams::parse("Noise_XX_25519_ChaChaPoly").is_err());
    }

    #[test]
    fn rejects_trailing_fields() {
        assert!(NoiseParams::parse("Noise_XX_25519_ChaChaPoly_SHA256_extra").is_err());
    }
}
