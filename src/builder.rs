//! Consuming builder over [`HandshakeState::initialize`], mirroring this
//! codebase's `with_*`-setter / terminal-`build_*` session construction style.

#![forbid(unsafe_code)]

use crate::dh::{KeyPair, DH_LEN};
use crate::error::Result;
use crate::handshakestate::{HandshakeKeys, HandshakeState, Role};
use crate::params::NoiseParams;

const MAX_PSKS: usize = 10;

/// Names a psk slot left unset below the highest index the caller did set,
/// for the `MissingKey` error that gap produces.
fn psk_slot_name(idx: usize) -> &'static str {
    const NAMES: [&str; MAX_PSKS] = [
        "psk0 not supplied", "psk1 not supplied", "psk2 not supplied", "psk3 not supplied",
        "psk4 not supplied", "psk5 not supplied", "psk6 not supplied", "psk7 not supplied",
        "psk8 not supplied", "psk9 not supplied",
    ];
    NAMES[idx]
}

/// Builds a [`HandshakeState`] from a protocol name plus whatever key
/// material the selected pattern requires.
#[derive(Default)]
pub struct HandshakeBuilder {
    params: Option<NoiseParams>,
    prologue: Vec<u8>,
    local_static: Option<KeyPair>,
    local_ephemeral: Option<KeyPair>,
    remote_static: Option<[u8; DH_LEN]>,
    remote_ephemeral: Option<[u8; DH_LEN]>,
    psks: [Option<[u8; 32]>; MAX_PSKS],
}

impl HandshakeBuilder {
    /// Start from an already-parsed protocol name.
    pub fn new(params: NoiseParams) -> Self {
        Self {
            params: Some(params),
            ..Default::default()
        }
    }

    /// Start from the raw `Noise_...` protocol-name string, parsing it
    /// immediately so malformed names surface at `with_protocol_name` call
    /// sites instead of being deferred to `build_*`.
    pub fn with_protocol_name(name: &str) -> Result<Self> {
        Ok(Self::new(NoiseParams::parse(name)?))
    }

    /// Set the local static keypair (required by most non-`N*` patterns).
    pub fn with_local_static(mut self, keypair: KeyPair) -> Self {
        self.local_static = Some(keypair);
        self
    }

    /// Override the ephemeral keypair instead of generating one fresh.
    /// Production callers should not use this; it exists to replay
    /// fixed-ephemeral test vectors.
    pub fn with_fixed_ephemeral(mut self, keypair: KeyPair) -> Self {
        self.local_ephemeral = Some(keypair);
        self
    }

    /// Set the remote party's static public key, required by patterns
    /// with a static premessage (`K*`, `X*`, `I*` responder-known variants).
    pub fn with_remote_static(mut self, public: [u8; DH_LEN]) -> Self {
        self.remote_static = Some(public);
        self
    }

    /// Set the remote party's premessage ephemeral public key.
    pub fn with_remote_ephemeral(mut self, public: [u8; DH_LEN]) -> Self {
        self.remote_ephemeral = Some(public);
        self
    }

    /// Set the application prologue mixed in before any premessage.
    pub fn with_prologue(mut self, prologue: impl Into<Vec<u8>>) -> Self {
        self.prologue = prologue.into();
        self
    }

    /// Set the PSK at index `idx` (0..=9), matching the `pskN` modifier
    /// range the pattern registry accepts.
    pub fn with_psk(mut self, idx: usize, psk: [u8; 32]) -> Self {
        if idx < MAX_PSKS {
            self.psks[idx] = Some(psk);
        }
        self
    }

    fn into_parts(self) -> Result<(NoiseParams, Vec<u8>, HandshakeKeys, Vec<[u8; 32]>)> {
        let params = self
            .params
            .ok_or_else(|| crate::error::NoiseError::UnknownProtocol(String::new()))?;
        let keys = HandshakeKeys {
            local_static: self.local_static,
            local_ephemeral: self.local_ephemeral,
            remote_static: self.remote_static,
            remote_ephemeral: self.remote_ephemeral,
        };
        let highest_used = self.psks.iter().rposition(Option::is_some).map(|i| i + 1).unwrap_or(0);
        let mut psks = Vec::with_capacity(highest_used);
        for (idx, slot) in self.psks.into_iter().enumerate().take(highest_used) {
            psks.push(slot.ok_or(crate::error::NoiseError::MissingKey(psk_slot_name(idx)))?);
        }
        Ok((params, self.prologue, keys, psks))
    }

    /// Finalize as the initiator.
    pub fn build_initiator(self) -> Result<HandshakeState> {
        let (params, prologue, keys, psks) = self.into_parts()?;
        HandshakeState::initialize(&params, Role::Initiator, &prologue, keys, psks)
    }

    /// Finalize as the responder.
    pub fn build_responder(self) -> Result<HandshakeState> {
        let (params, prologue, keys, psks) = self.into_parts()?;
        HandshakeState::initialize(&params, Role::Responder, &prologue, keys, psks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_bad_protocol_name() {
        assert!(HandshakeBuilder::with_protocol_name("garbage").is_err());
    }

    #[test]
    fn builder_completes_nn_handshake() {
        let mut init = HandshakeBuilder::with_protocol_name("Noise_NN_25519_ChaChaPoly_SHA256")
            .unwrap()
            .build_initiator()
            .unwrap();
        let mut resp = HandshakeBuilder::with_protocol_name("Noise_NN_25519_ChaChaPoly_SHA256")
            .unwrap()
            .build_responder()
            .unwrap();
        let (m1, _) = init.write_message(b"hi").unwrap();
        let (pt1, _) = resp.read_message(&m1).unwrap();
        assert_eq!(pt1, b"hi");
    }

    #[test]
    fn builder_rejects_psk_gap() {
        // psk2 set but psk0/psk1 left unset: a real gap, not just "no psks".
        let err = HandshakeBuilder::with_protocol_name("Noise_KKpsk2_25519_ChaChaPoly_SHA256")
            .unwrap()
            .with_psk(2, [1u8; 32])
            .build_initiator()
            .unwrap_err();
        assert!(matches!(err, crate::error::NoiseError::MissingKey(_)));
    }

    #[test]
    fn builder_threads_psk_through() {
        let psk = [9u8; 32];
        let mut init = HandshakeBuilder::with_protocol_name("Noise_NNpsk0_25519_ChaChaPoly_SHA256")
            .unwrap()
            .with_psk(0, psk)
            .build_initiator()
            .unwrap();
        let mut resp = HandshakeBuilder::with_protocol_name("Noise_NNpsk0_25519_ChaChaPoly_SHA256")
            .unwrap()
            .with_psk(0, psk)
            .build_responder()
            .unwrap();
        let (m1, _) = init.write_message(b"").unwrap();
        assert!(resp.read_message(&m1).is_ok());
    }
}
