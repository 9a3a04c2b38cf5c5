//! `HandshakeState`: drives one handshake pattern's token sequence to
//! completion, then hands off to the two transport `CipherState`s.

#![forbid(unsafe_code)]

use crate::cipher::CipherChoice;
use crate::cipherstate::CipherState;
use crate::dh::{KeyPair, DH_LEN};
use crate::error::{NoiseError, Result};
use crate::hash::HashChoice;
use crate::params::NoiseParams;
use crate::pattern::{Pattern, PremessageToken, Token};
use crate::symmetricstate::SymmetricState;

/// Which side of the handshake this state drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Writes message pattern indices 0, 2, 4, ...
    Initiator,
    /// Writes message pattern indices 1, 3, 5, ...
    Responder,
}

/// Keys a caller may supply when starting a handshake. Any field the
/// selected pattern requires but leaves `None` surfaces as
/// [`NoiseError::MissingKey`] at `initialize` or token-dispatch time.
#[derive(Default)]
pub struct HandshakeKeys {
    /// This party's long-term keypair.
    pub local_static: Option<KeyPair>,
    /// Overrides ephemeral generation; test-only.
    pub local_ephemeral: Option<KeyPair>,
    /// The peer's long-term public key, known up front for `K*`/`X*`/`I*` patterns.
    pub remote_static: Option<[u8; DH_LEN]>,
    /// The peer's premessage ephemeral public key.
    pub remote_ephemeral: Option<[u8; DH_LEN]>,
}

/// One completed handshake's output: the two transport directions plus the
/// final transcript hash (usable as a channel-binding value).
pub struct HandshakeOutput {
    /// Initiator-to-responder transport cipher state.
    pub c1: CipherState,
    /// Responder-to-initiator transport cipher state; unused for one-way patterns.
    pub c2: CipherState,
    /// The final transcript hash, usable as a channel-binding value.
    pub handshake_hash: Vec<u8>,
}

impl core::fmt::Debug for HandshakeOutput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandshakeOutput")
            .field("c1", &self.c1)
            .field("c2", &self.c2)
            .field("handshake_hash", &self.handshake_hash)
            .finish()
    }
}

/// Drives a Noise handshake pattern to completion.
pub struct HandshakeState {
    role: Role,
    pattern: Pattern,
    symmetric: SymmetricState,
    s: Option<KeyPair>,
    e: Option<KeyPair>,
    rs: Option<[u8; DH_LEN]>,
    re: Option<[u8; DH_LEN]>,
    psks: Vec<[u8; 32]>,
    message_index: usize,
    finished: bool,
    /// True if any message pattern carries a `psk` token; per the Noise
    /// spec, `e` tokens additionally `mix_key` their own public key in
    /// that case.
    has_psk: bool,
}

impl core::fmt::Debug for HandshakeState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandshakeState")
            .field("role", &self.role)
            .field("pattern", &self.pattern)
            .field("symmetric", &self.symmetric)
            .field("s", &self.s)
            .field("e", &self.e)
            .field("rs", &self.rs)
            .field("re", &self.re)
            .field("message_index", &self.message_index)
            .field("finished", &self.finished)
            .field("has_psk", &self.has_psk)
            .finish_non_exhaustive()
    }
}

impl HandshakeState {
    /// `Initialize(handshake_pattern, initiator, prologue, s, e, rs, re, psks)`.
    ///
    /// `psks` is indexed by the numeric suffix of each `pskN` token present
    /// in the pattern; a pattern with no `psk` tokens accepts an empty slice.
    pub fn initialize(
        params: &NoiseParams,
        role: Role,
        prologue: &[u8],
        keys: HandshakeKeys,
        psks: Vec<[u8; 32]>,
    ) -> Result<Self> {
        let mut symmetric =
            SymmetricState::initialize(&params.name, params.hash, params.cipher);
        symmetric.mix_hash(prologue);

        let pattern = params.pattern.clone();
        let has_psk = pattern
            .message_patterns
            .iter()
            .any(|msg| msg.iter().any(|t| matches!(t, Token::Psk(_))));

        let (local_pre, remote_pre) = match role {
            Role::Initiator => (pattern.pre_message_initiator, pattern.pre_message_responder),
            Role::Responder => (pattern.pre_message_responder, pattern.pre_message_initiator),
        };

        let mut state = HandshakeState {
            role,
            pattern,
            symmetric,
            s: keys.local_static,
            e: keys.local_ephemeral,
            rs: keys.remote_static,
            re: keys.remote_ephemeral,
            psks,
            message_index: 0,
            finished: false,
            has_psk,
        };

        // Mix premessages in sender order: initiator's, then responder's,
        // regardless of which role this instance is.
        let (init_pre, resp_pre) = match role {
            Role::Initiator => (local_pre, remote_pre),
            Role::Responder => (remote_pre, local_pre),
        };
        state.mix_premessage(Role::Initiator, init_pre)?;
        state.mix_premessage(Role::Responder, resp_pre)?;

        Ok(state)
    }

    fn mix_premessage(&mut self, owner: Role, token: Option<PremessageToken>) -> Result<()> {
        let Some(token) = token else { return Ok(()) };
        let is_local = owner == self.role;
        let bytes = match (token, is_local) {
            (PremessageToken::S, true) => self
                .s
                .as_ref()
                .map(|kp| kp.public)
                .ok_or(NoiseError::MissingKey("local static key required by premessage"))?,
            (PremessageToken::E, true) => self
                .e
                .as_ref()
                .map(|kp| kp.public)
                .ok_or(NoiseError::MissingKey("local ephemeral key required by premessage"))?,
            (PremessageToken::S, false) => self
                .rs
                .ok_or(NoiseError::MissingKey("remote static key required by premessage"))?,
            (PremessageToken::E, false) => self
                .re
                .ok_or(NoiseError::MissingKey("remote ephemeral key required by premessage"))?,
        };
        self.symmetric.mix_hash(&bytes);
        Ok(())
    }

    fn is_my_turn_to_write(&self) -> bool {
        let writer = if self.message_index % 2 == 0 {
            Role::Initiator
        } else {
            Role::Responder
        };
        writer == self.role
    }

    fn next_psk(&mut self, idx: u8) -> Result<[u8; 32]> {
        self.psks
            .get(idx as usize)
            .copied()
            .ok_or(NoiseError::MissingKey("psk required by pattern but not supplied"))
    }

    /// Write the next handshake message. `payload` is the (possibly empty)
    /// caller data appended after the pattern tokens.
    ///
    /// Returns `Ok(Some(output))` once this call completes the pattern
    /// (triggering `Split`), `Ok(None)` otherwise.
    pub fn write_message(&mut self, payload: &[u8]) -> Result<(Vec<u8>, Option<HandshakeOutput>)> {
        if self.finished {
            return Err(NoiseError::HandshakeComplete);
        }
        if !self.is_my_turn_to_write() {
            return Err(NoiseError::OutOfTurn);
        }
        let tokens = self
            .pattern
            .message_patterns
            .get(self.message_index)
            .cloned()
            .ok_or(NoiseError::HandshakeComplete)?;
        tracing::trace!(index = self.message_index, tokens = tokens.len(), "write_message");

        let mut out = Vec::new();
        for token in tokens {
            match token {
                Token::E => {
                    let kp = match self.e.take() {
                        Some(kp) => kp,
                        None => KeyPair::generate(),
                    };
                    out.extend_from_slice(&kp.public);
                    self.symmetric.mix_hash(&kp.public);
                    if self.has_psk {
                        self.symmetric.mix_key(&kp.public);
                    }
                    self.e = Some(kp);
                }
                Token::S => {
                    let public = self
                        .s
                        .as_ref()
                        .map(|kp| kp.public)
                        .ok_or(NoiseError::MissingKey("local static key required to write 's'"))?;
                    let enc = self.symmetric.encrypt_and_hash(&public)?;
                    out.extend_from_slice(&enc);
                }
                Token::Ee => self.dh_and_mix(DhSide::EE)?,
                Token::Es => self.dh_and_mix(DhSide::ES)?,
                Token::Se => self.dh_and_mix(DhSide::SE)?,
                Token::Ss => self.dh_and_mix(DhSide::SS)?,
                Token::Psk(idx) => {
                    let psk = self.next_psk(idx)?;
                    self.symmetric.mix_key_and_hash(&psk);
                }
            }
        }
        let ct = self.symmetric.encrypt_and_hash(payload)?;
        out.extend_from_slice(&ct);

        self.message_index += 1;
        let output = self.maybe_split();
        Ok((out, output))
    }

    /// Read and validate the next handshake message, returning the
    /// decrypted payload.
    ///
    /// Returns `Ok((payload, Some(output)))` once this call completes the
    /// pattern (triggering `Split`), `Ok((payload, None))` otherwise.
    pub fn read_message(&mut self, message: &[u8]) -> Result<(Vec<u8>, Option<HandshakeOutput>)> {
        if self.finished {
            return Err(NoiseError::HandshakeComplete);
        }
        if self.is_my_turn_to_write() {
            return Err(NoiseError::OutOfTurn);
        }
        let tokens = self
            .pattern
            .message_patterns
            .get(self.message_index)
            .cloned()
            .ok_or(NoiseError::HandshakeComplete)?;
        tracing::trace!(index = self.message_index, tokens = tokens.len(), "read_message");

        let mut cursor = message;
        for token in tokens {
            match token {
                Token::E => {
                    let dh_len = DH_LEN;
                    if cursor.len() < dh_len {
                        return Err(log_rejection(NoiseError::ShortMessage));
                    }
                    let mut re = [0u8; DH_LEN];
                    re.copy_from_slice(&cursor[..dh_len]);
                    cursor = &cursor[dh_len..];
                    self.symmetric.mix_hash(&re);
                    if self.has_psk {
                        self.symmetric.mix_key(&re);
                    }
                    self.re = Some(re);
                }
                Token::S => {
                    let expected = if self.symmetric_has_key() {
                        DH_LEN + crate::cipher::TAG_LEN
                    } else {
                        DH_LEN
                    };
                    if cursor.len() < expected {
                        return Err(log_rejection(NoiseError::ShortMessage));
                    }
                    let (field, rest) = cursor.split_at(expected);
                    cursor = rest;
                    let decrypted = self.symmetric.decrypt_and_hash(field).map_err(log_rejection)?;
                    if decrypted.len() != DH_LEN {
                        return Err(log_rejection(NoiseError::ShortMessage));
                    }
                    let mut rs = [0u8; DH_LEN];
                    rs.copy_from_slice(&decrypted);
                    self.rs = Some(rs);
                }
                Token::Ee => self.dh_and_mix(DhSide::EE)?,
                Token::Es => self.dh_and_mix(DhSide::ES)?,
                Token::Se => self.dh_and_mix(DhSide::SE)?,
                Token::Ss => self.dh_and_mix(DhSide::SS)?,
                Token::Psk(idx) => {
                    let psk = self.next_psk(idx)?;
                    self.symmetric.mix_key_and_hash(&psk);
                }
            }
        }
        let payload = self.symmetric.decrypt_and_hash(cursor).map_err(log_rejection)?;

        self.message_index += 1;
        let output = self.maybe_split();
        Ok((payload, output))
    }

    /// Whether the underlying cipher state is keyed, used to size the
    /// encrypted-`s` field while reading.
    fn symmetric_has_key(&self) -> bool {
        self.symmetric.cipherstate_has_key()
    }

    fn dh_and_mix(&mut self, side: DhSide) -> Result<()> {
        let (local, remote) = match (side, self.role) {
            (DhSide::EE, _) => (&self.e, self.re),
            (DhSide::SS, _) => (&self.s, self.rs),
            (DhSide::ES, Role::Initiator) => (&self.e, self.rs),
            (DhSide::ES, Role::Responder) => (&self.s, self.re),
            (DhSide::SE, Role::Initiator) => (&self.s, self.re),
            (DhSide::SE, Role::Responder) => (&self.e, self.rs),
        };
        let local = local
            .as_ref()
            .ok_or(NoiseError::MissingKey("local key required for dh token"))?;
        let remote = remote.ok_or(NoiseError::MissingKey("remote key required for dh token"))?;
        let shared = local.dh(&remote).map_err(log_rejection)?;
        self.symmetric.mix_key(&shared);
        Ok(())
    }

    fn maybe_split(&mut self) -> Option<HandshakeOutput> {
        if self.message_index < self.pattern.message_patterns.len() {
            return None;
        }
        self.finished = true;
        let handshake_hash = self.symmetric.h().to_vec();
        // `self.symmetric` is replaced with a dummy to satisfy the borrow
        // checker across the by-value `split`; HandshakeState is finished
        // and never touches it again.
        let dummy = SymmetricState::initialize("", HashChoice::Sha256, CipherChoice::ChaChaPoly);
        let symmetric = std::mem::replace(&mut self.symmetric, dummy);
        let (c1, c2) = symmetric.split();
        tracing::debug!(
            pattern = %self.pattern.full_name,
            role = ?self.role,
            hash_len = handshake_hash.len(),
            "handshake complete"
        );
        Some(HandshakeOutput {
            c1,
            c2,
            handshake_hash,
        })
    }
}

/// Emit a `tracing::warn!` for protocol-level rejections, never including
/// the offending bytes, then return the error unchanged.
fn log_rejection(err: NoiseError) -> NoiseError {
    match &err {
        NoiseError::DecryptFailed | NoiseError::DHFailed(_) | NoiseError::ShortMessage => {
            tracing::warn!(error = %err, "handshake message rejected");
        }
        _ => {}
    }
    err
}

#[derive(Clone, Copy)]
enum DhSide {
    EE,
    ES,
    SE,
    SS,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(name: &str) -> NoiseParams {
        NoiseParams::parse(name).unwrap()
    }

    #[test]
    fn nn_handshake_completes_and_splits() {
        let p = params("Noise_NN_25519_ChaChaPoly_SHA256");
        let mut init = HandshakeState::initialize(
            &p,
            Role::Initiator,
            b"",
            HandshakeKeys::default(),
            vec![],
        )
        .unwrap();
        let mut resp = HandshakeState::initialize(
            &p,
            Role::Responder,
            b"",
            HandshakeKeys::default(),
            vec![],
        )
        .unwrap();

        let (m1, out1) = init.write_message(b"hello").unwrap();
        assert!(out1.is_none());
        let (pt1, rout1) = resp.read_message(&m1).unwrap();
        assert_eq!(pt1, b"hello");
        assert!(rout1.is_none());

        let (m2, out2) = resp.write_message(b"hi").unwrap();
        let out2 = out2.unwrap();
        let (pt2, rout2) = init.read_message(&m2).unwrap();
        assert_eq!(pt2, b"hi");
        let rout2 = rout2.unwrap();
        assert_eq!(out2.handshake_hash, rout2.handshake_hash);
    }

    #[test]
    fn xx_handshake_with_static_keys() {
        let p = params("Noise_XX_25519_ChaChaPoly_SHA256");
        let init_s = KeyPair::generate();
        let resp_s = KeyPair::generate();

        let mut init = HandshakeState::initialize(
            &p,
            Role::Initiator,
            b"",
            HandshakeKeys {
                local_static: Some(init_s),
                ..Default::default()
            },
            vec![],
        )
        .unwrap();
        let mut resp = HandshakeState::initialize(
            &p,
            Role::Responder,
            b"",
            HandshakeKeys {
                local_static: Some(resp_s),
                ..Default::default()
            },
            vec![],
        )
        .unwrap();

        let (m1, _) = init.write_message(b"").unwrap();
        let (_, _) = resp.read_message(&m1).unwrap();

        let (m2, _) = resp.write_message(b"").unwrap();
        let (_, _) = init.read_message(&m2).unwrap();

        let (m3, out3) = init.write_message(b"").unwrap();
        assert!(out3.is_some());
        let (_, rout3) = resp.read_message(&m3).unwrap();
        assert!(rout3.is_some());
    }

    #[test]
    fn out_of_turn_write_rejected() {
        let p = params("Noise_NN_25519_ChaChaPoly_SHA256");
        let mut resp = HandshakeState::initialize(
            &p,
            Role::Responder,
            b"",
            HandshakeKeys::default(),
            vec![],
        )
        .unwrap();
        assert_eq!(resp.write_message(b"").unwrap_err(), NoiseError::OutOfTurn);
    }

    #[test]
    fn missing_premessage_key_rejected() {
        let p = params("Noise_IK_25519_ChaChaPoly_SHA256");
        let err = HandshakeState::initialize(
            &p,
            Role::Initiator,
            b"",
            HandshakeKeys::default(),
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, NoiseError::MissingKey("remote static key required by premessage"));
    }

    #[test]
    fn short_message_rejected() {
        let p = params("Noise_NN_25519_ChaChaPoly_SHA256");
        let mut resp = HandshakeState::initialize(
            &p,
            Role::Responder,
            b"",
            HandshakeKeys::default(),
            vec![],
        )
        .unwrap();
        assert_eq!(resp.read_message(&[1, 2, 3]).unwrap_err(), NoiseError::ShortMessage);
    }

    #[test]
    fn reuse_after_finish_rejected() {
        let p = params("Noise_NN_25519_ChaChaPoly_SHA256");
        let mut init = HandshakeState::initialize(
            &p,
            Role::Initiator,
            b"",
            HandshakeKeys::default(),
            vec![],
        )
        .unwrap();
        let mut resp = HandshakeState::initialize(
            &p,
            Role::Responder,
            b"",
            HandshakeKeys::default(),
            vec![],
        )
        .unwrap();
        let (m1, _) = init.write_message(b"").unwrap();
        resp.read_message(&m1).unwrap();
        let (m2, out2) = resp.write_message(b"").unwrap();
        assert!(out2.is_some());
        init.read_message(&m2).unwrap();
        assert_eq!(init.write_message(b"").unwrap_err(), NoiseError::HandshakeComplete);
    }

    #[test]
    fn nnpsk0_handshake_completes() {
        let p = params("Noise_NNpsk0_25519_ChaChaPoly_SHA256");
        let psk = [42u8; 32];
        let mut init = HandshakeState::initialize(
            &p,
            Role::Initiator,
            b"",
            HandshakeKeys::default(),
            vec![psk],
        )
        .unwrap();
        let mut resp = HandshakeState::initialize(
            &p,
            Role::Responder,
            b"",
            HandshakeKeys::default(),
            vec![psk],
        )
        .unwrap();
        let (m1, _) = init.write_message(b"a").unwrap();
        let (pt1, _) = resp.read_message(&m1).unwrap();
        assert_eq!(pt1, b"a");
        let (m2, out2) = resp.write_message(b"b").unwrap();
        let (pt2, out1) = init.read_message(&m2).unwrap();
        assert_eq!(pt2, b"b");
        assert!(out1.is_some());
        assert!(out2.is_some());
    }
}
