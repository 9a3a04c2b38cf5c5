//! A Noise Protocol Framework handshake core: pattern registry, symmetric
//! and cipher state machines, and the `HandshakeState` driver that turns a
//! `Noise_<Pattern>_<DH>_<Cipher>_<Hash>` protocol name plus a role into an
//! alternating `write_message`/`read_message` exchange terminating in a
//! pair of transport `CipherState`s.
//!
//! ```
//! use noise_core::{HandshakeBuilder, Role};
//!
//! let mut initiator = HandshakeBuilder::with_protocol_name("Noise_NN_25519_ChaChaPoly_SHA256")
//!     .unwrap()
//!     .build_initiator()
//!     .unwrap();
//! let mut responder = HandshakeBuilder::with_protocol_name("Noise_NN_25519_ChaChaPoly_SHA256")
//!     .unwrap()
//!     .build_responder()
//!     .unwrap();
//!
//! let (msg1, _) = initiator.write_message(b"").unwrap();
//! let (_, _) = responder.read_message(&msg1).unwrap();
//! let (msg2, resp_out) = responder.write_message(b"").unwrap();
//! let (_, init_out) = initiator.read_message(&msg2).unwrap();
//!
//! assert_eq!(init_out.unwrap().handshake_hash, resp_out.unwrap().handshake_hash);
//! # let _ = Role::Initiator;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc(test(attr(deny(warnings))))]

mod builder;
mod cipher;
mod cipherstate;
mod dh;
mod error;
mod hash;
mod handshakestate;
mod params;
mod pattern;
mod symmetricstate;

pub use builder::HandshakeBuilder;
pub use cipher::CipherChoice;
pub use cipherstate::CipherState;
pub use dh::{DhChoice, KeyPair, DH_LEN};
pub use error::{NoiseError, Result};
pub use hash::HashChoice;
pub use handshakestate::{HandshakeKeys, HandshakeOutput, HandshakeState, Role};
pub use params::NoiseParams;
pub use pattern::{Pattern, PremessageToken, Token};
