//! Diffie-Hellman adapter: Curve25519/X25519, the only DH algorithm this
//! crate supports (Curve448 suites are out of scope).

#![forbid(unsafe_code)]

use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::{NoiseError, Result};

/// Length in bytes of an X25519 public key or shared secret.
pub const DH_LEN: usize = 32;

/// Which DH algorithm a protocol name selected. Only one variant exists
/// today; an unrecognized token is rejected at parse time rather than
/// silently falling back to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhChoice {
    /// Curve25519/X25519.
    Curve25519,
}

impl DhChoice {
    /// Parse the `<DH>` token from a protocol name.
    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "25519" => Ok(DhChoice::Curve25519),
            other => Err(NoiseError::UnknownProtocol(format!(
                "unsupported DH token: {other}"
            ))),
        }
    }
}

/// A local DH keypair. The secret half is zeroized on drop.
#[derive(Clone)]
pub struct KeyPair {
    secret: StaticSecret,
    /// The public half, exposed directly since it's never sensitive.
    pub public: [u8; DH_LEN],
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl Drop for KeyPair {
    fn drop(&mut self) {
        // `StaticSecret` zeroizes its own bytes on drop; this guards the
        // copy this crate may have staged in the meantime.
        self.public.zeroize();
    }
}

impl KeyPair {
    /// Generate a fresh keypair from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut seed = [0u8; DH_LEN];
        rand::rngs::OsRng.fill_bytes(&mut seed);
        let keypair = Self::from_secret(seed);
        seed.zeroize();
        keypair
    }

    /// Recover a keypair from a 32-byte secret scalar, deriving the public
    /// half via the curve.
    pub fn from_secret(secret_bytes: [u8; DH_LEN]) -> Self {
        let secret = StaticSecret::from(secret_bytes);
        let public = PublicKey::from(&secret);
        Self {
            secret,
            public: public.to_bytes(),
        }
    }

    /// Diffie-Hellman: `DH(self, remote_public)`.
    ///
    /// A result of all zero bytes (the canonical low-order-point output) is
    /// not short-circuited here -- Noise does not require rejecting it, and
    /// the mixed-in transcript hash still binds the exchange.
    pub fn dh(&self, remote_public: &[u8; DH_LEN]) -> Result<[u8; DH_LEN]> {
        let remote = PublicKey::from(*remote_public);
        let shared = self.secret.diffie_hellman(&remote);
        Ok(shared.to_bytes())
    }
}
