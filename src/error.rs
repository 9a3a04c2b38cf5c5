//! Error type for the handshake core.
//!
//! A single `thiserror`-derived enum covers every failure mode named by the
//! handshake state machine: protocol-name parsing, pattern registry lookups,
//! AEAD/DH failures, and caller misuse (out-of-turn calls, reuse of a
//! finished handshake). Nothing on a path reachable from caller-supplied
//! input panics; failures are always returned as a `NoiseError`.

/// Errors produced by the Noise handshake core.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NoiseError {
    /// The protocol name did not parse into a known `(pattern, dh, cipher, hash)` tuple.
    #[error("unknown or malformed protocol name: {0}")]
    UnknownProtocol(String),

    /// The base handshake pattern name is not one this registry knows.
    #[error("unknown handshake pattern: {0}")]
    UnknownPattern(String),

    /// A `pskN` modifier named an out-of-range message index.
    #[error("bad pattern modifier: {0}")]
    BadPatternModifier(String),

    /// A token required a key (local static/ephemeral or remote static/ephemeral)
    /// that the `HandshakeState` was not given.
    #[error("missing key material required by pattern: {0}")]
    MissingKey(&'static str),

    /// An incoming message was shorter than the active token sequence requires.
    #[error("handshake or transport message shorter than required")]
    ShortMessage,

    /// AEAD tag verification failed. The symmetric/cipher state is left
    /// untouched (the nonce counter is not advanced); the caller must
    /// discard the handshake or transport session.
    #[error("AEAD decryption failed")]
    DecryptFailed,

    /// A `CipherState`'s nonce counter reached `2^64 - 1` and cannot be used again.
    #[error("nonce space exhausted")]
    NonceExhausted,

    /// The DH primitive rejected the operation (e.g. a detected low-order point).
    #[error("Diffie-Hellman operation failed: {0}")]
    DHFailed(&'static str),

    /// `write_message` was called when it was the peer's turn to write, or
    /// vice versa for `read_message`.
    #[error("write/read called out of turn")]
    OutOfTurn,

    /// The handshake's message pattern list is already exhausted.
    #[error("handshake already complete")]
    HandshakeComplete,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, NoiseError>;
