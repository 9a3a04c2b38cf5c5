//! The handshake pattern registry: parses a base pattern name (`N`, `XX`,
//! `IK`, ...) plus zero or more `pskN` modifiers into premessage tokens and
//! an ordered list of message-pattern token lists.

use crate::error::{NoiseError, Result};

/// A single token in a message pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    /// Emit/consume an ephemeral public key.
    E,
    /// Emit/consume a (possibly encrypted) static public key.
    S,
    /// `DH(e, re)`.
    Ee,
    /// `DH(e, rs)` (initiator) / `DH(s, re)` (responder).
    Es,
    /// `DH(s, re)` (initiator) / `DH(e, rs)` (responder).
    Se,
    /// `DH(s, rs)`.
    Ss,
    /// Mix the PSK at the given index into `ck`/`h`.
    Psk(u8),
}

/// A premessage token: only identity tokens are valid before the handshake starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PremessageToken {
    /// A static public key is known in advance.
    S,
    /// An ephemeral public key is known in advance.
    E,
}

/// A fully resolved handshake pattern: premessages plus the message list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pattern {
    /// Base pattern name before modifiers, e.g. `"XX"`.
    pub base_name: String,
    /// The full name including `pskN` modifiers, e.g. `"XXpsk0"`.
    pub full_name: String,
    /// Initiator's premessage token, if the base pattern has one.
    pub pre_message_initiator: Option<PremessageToken>,
    /// Responder's premessage token, if the base pattern has one.
    pub pre_message_responder: Option<PremessageToken>,
    /// The ordered message patterns; index 0 is always written by the initiator.
    pub message_patterns: Vec<Vec<Token>>,
    /// True for the one-way patterns `N`, `K`, `X`: only `c1` carries transport traffic.
    pub one_way: bool,
}

fn base_table(base: &str) -> Option<(Option<PremessageToken>, Option<PremessageToken>, Vec<Vec<Token>>, bool)> {
    use PremessageToken::S as PS;
    use Token::{Ee, Es, S as TS, Se, Ss, E as TE};
    match base {
        // One-way patterns.
        "N" => Some((None, Some(PS), vec![vec![TE, Es]], true)),
        "K" => Some((Some(PS), Some(PS), vec![vec![TE, Es, Ss]], true)),
        "X" => Some((None, Some(PS), vec![vec![TE, Es, TS, Ss]], true)),

        // Interactive patterns.
        "NN" => Some((None, None, vec![vec![TE], vec![TE, Ee]], false)),
        "NK" => Some((None, Some(PS), vec![vec![TE, Es], vec![TE, Ee]], false)),
        "NX" => Some((None, None, vec![vec![TE], vec![TE, Ee, TS, Es]], false)),
        "XN" => Some((
            None,
            None,
            vec![vec![TE], vec![TE, Ee], vec![TS, Se]],
            false,
        )),
        "XK" => Some((
            None,
            Some(PS),
            vec![vec![TE, Es], vec![TE, Ee], vec![TS, Se]],
            false,
        )),
        "XX" => Some((
            None,
            None,
            vec![vec![TE], vec![TE, Ee, TS, Es], vec![TS, Se]],
            false,
        )),
        "KN" => Some((
            Some(PS),
            None,
            vec![vec![TE], vec![TE, Ee, Se]],
            false,
        )),
        "KK" => Some((
            Some(PS),
            Some(PS),
            vec![vec![TE, Es, Ss], vec![TE, Ee, Se]],
            false,
        )),
        "KX" => Some((
            Some(PS),
            None,
            vec![vec![TE], vec![TE, Ee, Se, TS, Es]],
            false,
        )),
        "IN" => Some((
            None,
            None,
            vec![vec![TE, TS], vec![TE, Ee, Se]],
            false,
        )),
        "IK" => Some((
            None,
            Some(PS),
            vec![vec![TE, Es, TS, Ss], vec![TE, Ee, Se]],
            false,
        )),
        "IX" => Some((
            None,
            None,
            vec![vec![TE, TS], vec![TE, Ee, Se, TS, Es]],
            false,
        )),
        _ => None,
    }
}

/// Base pattern names, longest first so `"NN"` is matched before `"N"`.
const BASE_NAMES: &[&str] = &[
    "NN", "NK", "NX", "XN", "XK", "XX", "KN", "KK", "KX", "IN", "IK", "IX", "N", "K", "X",
];

impl Pattern {
    /// Parse a pattern name such as `"XX"`, `"IK"`, or `"NNpsk0psk2"`.
    pub fn parse(name: &str) -> Result<Self> {
        let base = BASE_NAMES
            .iter()
            .find(|b| name.starts_with(*b))
            .copied()
            .ok_or_else(|| NoiseError::UnknownPattern(name.to_string()))?;

        let (pre_i, pre_r, mut message_patterns, one_way) = base_table(base)
            .ok_or_else(|| NoiseError::UnknownPattern(name.to_string()))?;

        let modifiers = parse_modifiers(&name[base.len()..], name)?;
        for idx in modifiers {
            if idx == 0 {
                message_patterns[0].insert(0, Token::Psk(0));
            } else {
                let msg_idx = idx as usize - 1;
                if msg_idx >= message_patterns.len() {
                    return Err(NoiseError::BadPatternModifier(format!(
                        "psk{idx} has no matching message pattern in {name}"
                    )));
                }
                message_patterns[msg_idx].push(Token::Psk(idx));
            }
        }

        Ok(Pattern {
            base_name: base.to_string(),
            full_name: name.to_string(),
            pre_message_initiator: pre_i,
            pre_message_responder: pre_r,
            message_patterns,
            one_way,
        })
    }
}

/// Parse a (possibly empty) run of `psk<digit>` modifiers.
fn parse_modifiers(rest: &str, full_name: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut cursor = rest;
    while !cursor.is_empty() {
        let suffix = cursor
            .strip_prefix("psk")
            .ok_or_else(|| NoiseError::BadPatternModifier(full_name.to_string()))?;
        let digit = suffix
            .as_bytes()
            .first()
            .filter(|b| b.is_ascii_digit())
            .ok_or_else(|| NoiseError::BadPatternModifier(full_name.to_string()))?;
        out.push(digit - b'0');
        cursor = &suffix[1..];
    }
    Ok(out)
}
